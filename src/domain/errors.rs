//! Domain errors for the job coordination core.

use thiserror::Error;

/// Errors raised while coordinating, persisting or launching jobs.
///
/// The variants map onto how a caller should react: a `Precondition` needs a
/// different request, a `ServiceUnavailable` can be retried later, a `Server`
/// error is fatal for the job.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenieError {
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

pub type GenieResult<T> = Result<T, GenieError>;

impl GenieError {
    /// HTTP-style status code a front end should answer with.
    pub const fn error_code(&self) -> u16 {
        match self {
            Self::Precondition(_) => 412,
            Self::ServiceUnavailable(_) => 503,
            Self::Server(_) => 500,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
        }
    }

    /// Whether resubmitting the same request later may succeed.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ServiceUnavailable(_))
    }

    /// The message without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Precondition(msg)
            | Self::ServiceUnavailable(msg)
            | Self::Server(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg) => msg,
        }
    }
}

impl From<std::io::Error> for GenieError {
    fn from(err: std::io::Error) -> Self {
        GenieError::Server(format!("I/O failure: {err}"))
    }
}

impl From<sqlx::Error> for GenieError {
    fn from(err: sqlx::Error) -> Self {
        GenieError::Server(format!("Database failure: {err}"))
    }
}

impl From<serde_json::Error> for GenieError {
    fn from(err: serde_json::Error) -> Self {
        GenieError::Server(format!("Serialization failure: {err}"))
    }
}
