//! Error types for event delivery.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised while delivering events.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The access key cannot be sent as a header.
    #[error("access key is not a valid header value")]
    InvalidKey,

    /// The HTTP client could not be built.
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),

    /// The endpoint could not be reached.
    #[error("failed to reach event endpoint: {0}")]
    Transport(#[source] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("event endpoint rejected the request: {status} {body}")]
    Rejected { status: StatusCode, body: String },
}

impl DeliveryError {
    /// HTTP status for rejected deliveries.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            DeliveryError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}
