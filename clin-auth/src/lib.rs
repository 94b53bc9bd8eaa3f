//! clin-auth: credential issuing and validation for ClinRS.
//!
//! Signed credentials embed a subject and an optional clinic binding;
//! validation can demand an exact tenant match, which is the
//! tenant-isolation check at the credential layer.

pub mod credential;
pub mod options;
pub mod refresh;

pub use credential::*;
pub use options::*;
pub use refresh::*;
