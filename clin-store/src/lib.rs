//! clin-store: in-memory tenant-partitioned storage for ClinRS.
//!
//! Records live in per-tenant maps, so a lookup literally cannot span
//! tenants: every call takes a `&TenantId` and only ever touches that
//! tenant's partition. Used as the persistence collaborator in tests,
//! demos, and single-node deployments.

pub mod error;
pub mod memory;
pub mod service;

pub use error::{StoreError, StoreResult};
pub use memory::{Filter, MemoryStore, CLINIC_ID_FIELD, ID_FIELD};
pub use service::MemoryService;
