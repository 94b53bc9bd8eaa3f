use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Infrastructure errors for storage operations
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Record is not a JSON object")]
    NotAnObject,
}
