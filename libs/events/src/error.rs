//! Error types for payload handling.

use thiserror::Error;

/// Errors that can occur while normalizing an event payload.
#[derive(Debug, Error)]
pub enum EventError {
    /// The payload was given as text that is not valid JSON.
    #[error("payload is not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),

    /// The payload decoded to something other than a JSON object.
    #[error("expected a JSON object or JSON text, received {found}")]
    NotAnObject { found: &'static str },
}

impl EventError {
    /// Returns true if the payload text could not be decoded.
    pub fn is_decode(&self) -> bool {
        matches!(self, EventError::Decode(_))
    }

    /// Returns true if the payload decoded to a non-object value.
    pub fn is_type(&self) -> bool {
        matches!(self, EventError::NotAnObject { .. })
    }
}
