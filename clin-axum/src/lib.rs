//! clin-axum: Axum adapter for ClinRS.
//!
//! Builds routers over ClinRS services with the two request-pipeline
//! layers the core requires: correlation-id propagation and the tenant
//! guard. Tenant-scoped routes are mounted behind the guard, so no
//! handler runs without a resolved clinic.

pub mod app;
pub mod auth_routes;
pub mod middlewares;
pub mod params;
pub mod rest;
pub mod state;
mod error;

pub use error::{ClinAxumError, ErrorDetail};
pub use state::ClinAxumState;

pub use app::{axum_app, ClinAxumApp};
