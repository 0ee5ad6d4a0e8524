//! Error types for the cloud console

use thiserror::Error;

/// Main error type for the cloud console
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("XML error: {0}")]
    XmlError(#[from] roxmltree::Error),

    #[error("Request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Authentication failed: {0}")]
    AuthFailure(String),

    #[error("Lost connectivity: {0}")]
    ConnectivityLoss(String),

    #[error("Unsupported server: {0}")]
    UnsupportedServer(String),

    #[error("Task failed: {0}")]
    TaskFailure(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Refresh incomplete: received {received} of {total} VMs")]
    IncompleteRefresh { received: usize, total: usize },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CloudError {
    /// Response body of a failed request, if any
    pub fn body(&self) -> Option<&str> {
        match self {
            CloudError::Status { body, .. } => Some(body),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for CloudError {
    fn from(err: anyhow::Error) -> Self {
        CloudError::Internal(err.to_string())
    }
}
