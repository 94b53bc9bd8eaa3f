use anyhow::Result;
use async_trait::async_trait;

use crate::errors::ClinError;
use crate::tenant::TenantContext;

/// Standard service methods:
/// find, get, create, update, patch, remove.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ServiceMethodKind {
    Find,
    Get,
    Create,
    Update,
    Patch,
    Remove,
}

/// Capabilities describe which methods a service wants to expose
/// to the outside world.
///
/// Adapters (like clin-axum) use this to reject disallowed methods.
#[derive(Debug, Clone)]
pub struct ServiceCapabilities {
    pub allowed_methods: Vec<ServiceMethodKind>,
}

impl ServiceCapabilities {
    /// Full CRUD.
    pub fn standard_crud() -> Self {
        use ServiceMethodKind::*;
        Self {
            allowed_methods: vec![Find, Get, Create, Update, Patch, Remove],
        }
    }

    /// Read-only: `find` and `get`.
    pub fn read_only() -> Self {
        use ServiceMethodKind::*;
        Self {
            allowed_methods: vec![Find, Get],
        }
    }

    pub fn from_methods(methods: Vec<ServiceMethodKind>) -> Self {
        Self {
            allowed_methods: methods,
        }
    }

    pub fn allows(&self, method: &ServiceMethodKind) -> bool {
        self.allowed_methods.contains(method)
    }
}

/// Core ClinRS service trait.
///
/// Every method takes `&TenantContext` as a required parameter: a
/// tenant-scoped operation cannot be issued without a resolved tenant.
/// That parameter is the access policy, enforced by the signature rather
/// than by convention.
///
/// All methods have default implementations that return
/// "Method not implemented", so a service can override only
/// what it actually supports.
#[async_trait]
pub trait ClinService<R, P = ()>: Send + Sync
where
    R: Send + 'static,
    P: Send + 'static,
{
    /// Describe which methods this service wants to expose.
    fn capabilities(&self) -> ServiceCapabilities {
        ServiceCapabilities::standard_crud()
    }

    /// Find many records within the tenant (optionally filtered by params).
    async fn find(&self, _ctx: &TenantContext, _params: P) -> Result<Vec<R>> {
        Err(ClinError::method_not_allowed("Method not implemented: find").into_anyhow())
    }

    /// Get a single record by id within the tenant.
    async fn get(&self, _ctx: &TenantContext, _id: &str, _params: P) -> Result<R> {
        Err(ClinError::method_not_allowed("Method not implemented: get").into_anyhow())
    }

    /// Create a new record, stamped with the tenant before persisting.
    async fn create(&self, _ctx: &TenantContext, _data: R, _params: P) -> Result<R> {
        Err(ClinError::method_not_allowed("Method not implemented: create").into_anyhow())
    }

    /// Fully replace an existing record within the tenant.
    async fn update(&self, _ctx: &TenantContext, _id: &str, _data: R, _params: P) -> Result<R> {
        Err(ClinError::method_not_allowed("Method not implemented: update").into_anyhow())
    }

    /// Partially update an existing record within the tenant.
    async fn patch(
        &self,
        _ctx: &TenantContext,
        _id: Option<&str>,
        _data: R,
        _params: P,
    ) -> Result<R> {
        Err(ClinError::method_not_allowed("Method not implemented: patch").into_anyhow())
    }

    /// Remove an existing record within the tenant.
    async fn remove(&self, _ctx: &TenantContext, _id: Option<&str>, _params: P) -> Result<R> {
        Err(ClinError::method_not_allowed("Method not implemented: remove").into_anyhow())
    }
}

impl<R, P> std::fmt::Debug for dyn ClinService<R, P>
where
    R: Send + 'static,
    P: Send + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn ClinService")
    }
}
