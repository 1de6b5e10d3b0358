pub mod models;
pub mod patch;
pub mod repository;
pub mod identity;
pub mod advisor;

pub use models::{Session, SessionStatus, TimeRange, WaitingList, DEFAULT_MAX_PARTICIPANTS};
pub use patch::SessionPatch;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFoundError(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Identity verification failed: {0}")]
    IdentityError(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
