//! clin-core: framework-agnostic core for ClinRS.
//!
//! Tenant resolution, per-request context, structured errors, and the
//! tenant-scoped service trait. Transports (clin-axum) and stores
//! (clin-store) build on top of this crate.

pub mod app;
pub mod config;
pub mod context;
pub mod errors;
pub mod registry;
pub mod service;
pub mod tenant;

pub use app::ClinApp;
pub use config::{ClinConfig, ClinConfigSnapshot};
pub use context::{Principal, RequestContext};
pub use errors::{ClinError, ErrorKind};
pub use registry::ClinServiceRegistry;
pub use service::{ClinService, ServiceCapabilities, ServiceMethodKind};
pub use tenant::{resolve_tenant_id, require_tenant_id, TenantContext, TenantId, TenantScoped, CLINIC_ID_HEADER};
