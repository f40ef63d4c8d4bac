use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CardflowError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Publish error: {0}")]
    Publish(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CardflowError>;

impl CardflowError {
    /// True for failures the caller should treat as a rejected request rather
    /// than a backend fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CardflowError::Validation(_) | CardflowError::NotFound(_)
        )
    }

    /// True for failures no retry can fix. Consumers drop the offending item
    /// instead of redelivering it.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            CardflowError::Validation(_)
                | CardflowError::NotFound(_)
                | CardflowError::InvalidState(_)
                | CardflowError::Serialization(_)
        )
    }
}
