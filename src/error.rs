//! Error types for the Luna portal

use thiserror::Error;

/// Errors that can occur in the portal workflows
#[derive(Debug, Error)]
pub enum PortalError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("Server configuration error - missing: {}", .0.join(", "))]
    MissingConfig(Vec<String>),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Signature provider rejected the request ({status}): {message}")]
    Provider {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Cannot move {record} from {from} to {to}")]
    InvalidTransition {
        record: String,
        from: &'static str,
        to: &'static str,
    },

    #[error("Invalid approval link: {0}")]
    InvalidLink(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<std::io::Error> for PortalError {
    fn from(e: std::io::Error) -> Self {
        PortalError::Store(e.to_string())
    }
}
