use thiserror::Error;

pub type Result<T> = std::result::Result<T, WebmentionError>;

#[derive(Error, Debug)]
pub enum WebmentionError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Target is not supported: {0}")]
    NotSupported(String),

    #[error("Verification failed: {0}")]
    Verification(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("{0}")]
    Upstream(String),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// The server has no token configured. A deployment problem, not a client one.
    #[error("Missing token")]
    NotConfigured,

    #[error("unauthorized")]
    Missing,

    #[error("forbidden")]
    Mismatch,
}

impl WebmentionError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage(err.to_string())
    }

    /// HTTP status used when this error reaches a synchronous caller.
    pub fn status_code(&self) -> u16 {
        match self {
            WebmentionError::Validation(_) => 400,
            WebmentionError::Auth(AuthError::NotConfigured) => 500,
            WebmentionError::Auth(AuthError::Missing) => 401,
            WebmentionError::Auth(AuthError::Mismatch) => 403,
            WebmentionError::NotSupported(_) => 400,
            WebmentionError::Verification(_) => 400,
            WebmentionError::Storage(_) => 500,
            WebmentionError::Upstream(_) => 400,
        }
    }
}
