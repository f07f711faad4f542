use thiserror::Error;

/// Errors surfaced by the bridge service handle.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Bridge service is not running")]
    Closed,

    #[error("Bridge service task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Lock(#[from] lockbridge_core::Error),
}

impl ServiceError {
    /// Returns `true` if the service has stopped accepting requests.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, ServiceError::Closed)
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
