//! Per-request context.
//!
//! One `RequestContext` is created at request entry, populated by the
//! correlation and tenant-guard middleware in sequence, and dropped with
//! the request. It is exclusively owned by its request: never shared,
//! never read cross-request.

use crate::tenant::{TenantContext, TenantId};

/// The authenticated actor behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub subject: String,
    pub roles: Vec<String>,
    /// Tenant the credential was issued for, if any.
    pub clinic_id: Option<TenantId>,
}

impl Principal {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            roles: Vec::new(),
            clinic_id: None,
        }
    }

    pub fn with_clinic(mut self, clinic: TenantId) -> Self {
        self.clinic_id = Some(clinic);
        self
    }

    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }
}

/// Mutable per-request bag attached to the transport request object.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub correlation_id: String,
    pub tenant: Option<TenantContext>,
    pub principal: Option<Principal>,
}

impl RequestContext {
    pub fn new(correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            tenant: None,
            principal: None,
        }
    }

    /// The resolved tenant, once the guard has run.
    pub fn tenant(&self) -> Option<&TenantContext> {
        self.tenant.as_ref()
    }

    pub fn set_tenant(&mut self, tenant: TenantContext) {
        self.tenant = Some(tenant);
    }

    pub fn set_principal(&mut self, principal: Principal) {
        self.principal = Some(principal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_starts_unresolved() {
        let ctx = RequestContext::new("req-1");
        assert_eq!(ctx.correlation_id, "req-1");
        assert!(ctx.tenant().is_none());
        assert!(ctx.principal.is_none());
    }

    #[test]
    fn tenant_attaches_once_resolved() {
        let mut ctx = RequestContext::new("req-2");
        ctx.set_tenant(TenantContext::new("C1"));
        assert_eq!(ctx.tenant().unwrap().id().as_str(), "C1");
    }
}
