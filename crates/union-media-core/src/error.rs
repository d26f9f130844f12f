//! Error types for union-media-core

use thiserror::Error;

use crate::types::ActionError;

/// Errors returned by [`crate::MediaFunctionClient`] and the file helpers.
#[derive(Error, Debug)]
pub enum MediaClientError {
    /// Client construction rejected its configuration
    #[error("Invalid client configuration: {0}")]
    Config(String),

    /// The action failed local validation; no request was sent
    #[error("Invalid request: {0}")]
    InvalidInput(#[from] ActionError),

    /// The request never produced an HTTP response
    #[error("Media request failed: {0}")]
    Transport(String),

    /// The media function answered with a non-success status
    #[error("Media function returned HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The response body did not have the expected shape
    #[error("Failed to parse media function response: {0}")]
    Decode(String),

    /// IO error while reading a local file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaClientError {
    /// HTTP status of a rejected request, if the function answered at all.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}
