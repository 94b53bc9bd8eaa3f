pub mod authenticate;
pub mod correlation;
pub mod tenant_guard;

pub use authenticate::require_auth;
pub use correlation::{propagate_correlation_id, CORRELATION_ID_HEADER, REQUEST_ID_HEADER};
pub use tenant_guard::require_tenant;
