use thiserror::Error;
use url::Url;

/// Transport-level failures.
#[derive(Debug, Error, Clone)]
pub enum NetError {
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("HTTP {status} for URL: {url}")]
    HttpStatus { status: u16, url: Url },
    #[error("Timeout")]
    Timeout,
    #[error("Invalid client configuration: {0}")]
    Config(String),
}

impl NetError {
    /// Creates an HTTP status error
    pub fn http_status(status: u16, url: Url) -> Self {
        Self::HttpStatus { status, url }
    }

    /// Creates a timeout error
    pub fn timeout() -> Self {
        Self::Timeout
    }

    /// Creates an HTTP error from a generic string
    pub fn http<S: Into<String>>(msg: S) -> Self {
        Self::Http(msg.into())
    }

    /// Checks if this error indicates a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, NetError::Timeout)
    }

    /// Gets the HTTP status code if this is an HTTP status error
    pub fn status_code(&self) -> Option<u16> {
        match self {
            NetError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for NetError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            return Self::Timeout;
        }
        Self::Http(error.to_string())
    }
}

pub type NetResult<T> = Result<T, NetError>;
