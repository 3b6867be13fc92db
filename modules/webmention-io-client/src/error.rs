use thiserror::Error;

pub type Result<T> = std::result::Result<T, WebmentionIoError>;

#[derive(Debug, Error)]
pub enum WebmentionIoError {
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success response. `message` is the upstream `error_description`
    /// when one was returned.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for WebmentionIoError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            WebmentionIoError::Parse(err.to_string())
        } else {
            WebmentionIoError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for WebmentionIoError {
    fn from(err: serde_json::Error) -> Self {
        WebmentionIoError::Parse(err.to_string())
    }
}
