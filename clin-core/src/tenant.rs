//! Core multi-tenant types for ClinRS.
//!
//! A tenant is a clinic/organization whose data must never be visible to
//! another tenant. The identifier is an opaque, case-sensitive string
//! (header `x-clinic-id`, claim `clinicId`).

use std::collections::HashMap;

use crate::context::Principal;
use crate::errors::ClinError;

/// Canonical header carrying the tenant identifier on inbound requests.
pub const CLINIC_ID_HEADER: &str = "x-clinic-id";

/// An opaque clinic/organization identifier.
/// Case-sensitive; must be non-empty after trimming.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Context carried with every ClinRS operation.
///
/// Passed into services and stores so that all logic is explicitly
/// tenant-aware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    pub tenant_id: TenantId,
}

impl TenantContext {
    /// Convenience constructor from a string.
    pub fn new<S: Into<String>>(tenant: S) -> Self {
        Self {
            tenant_id: TenantId(tenant.into()),
        }
    }

    pub fn id(&self) -> &TenantId {
        &self.tenant_id
    }
}

/// A stored record that belongs to exactly one tenant.
///
/// Every read path for such a record filters by `clinic_id()` equality and
/// every create path stamps the resolved tenant before persisting.
pub trait TenantScoped {
    fn clinic_id(&self) -> &TenantId;
    fn set_clinic_id(&mut self, id: TenantId);
}

fn header_value<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Resolve the tenant identifier for a request.
///
/// Order: the `x-clinic-id` header (case-insensitive lookup, trimmed),
/// then the authenticated principal's embedded tenant. A whitespace-only
/// header value counts as absent. Returns `None` when neither source
/// carries a usable value; this function never substitutes a default.
pub fn resolve_tenant_id(
    headers: &HashMap<String, String>,
    principal: Option<&Principal>,
) -> Option<TenantId> {
    if let Some(raw) = header_value(headers, CLINIC_ID_HEADER) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return Some(TenantId(trimmed.to_string()));
        }
    }

    principal.and_then(|p| p.clinic_id.clone())
}

/// The client error raised when a tenant-scoped endpoint gets no usable
/// tenant identifier.
pub fn missing_tenant_error() -> anyhow::Error {
    ClinError::bad_request(format!(
        "Missing tenant identifier: provide the `{CLINIC_ID_HEADER}` header"
    ))
    .into_anyhow()
}

/// Resolve the tenant identifier or fail with a client error.
///
/// Tenant-scoped endpoints call this; a missing or empty identifier is a
/// 400-class error naming the header, never a silent fallback.
pub fn require_tenant_id(
    headers: &HashMap<String, String>,
    principal: Option<&Principal>,
) -> anyhow::Result<TenantId> {
    resolve_tenant_id(headers, principal).ok_or_else(missing_tenant_error)
}
