//! Payload normalization.
//!
//! Callers hand the publisher either JSON text or an already structured
//! value. Both are folded into a single [`EventPayload`] before anything is
//! sent.

use serde_json::{Map, Value};

use crate::EventError;

/// A normalized event payload: a JSON object.
pub type EventPayload = Map<String, Value>;

/// A caller-supplied event body, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum EventMessage {
    /// Serialized JSON text that must decode to an object.
    Text(String),
    /// An already structured value.
    Value(Value),
}

impl EventMessage {
    /// Short description of the input form, for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            EventMessage::Text(_) => "text",
            EventMessage::Value(value) => json_type_name(value),
        }
    }

    /// Normalizes this message into a JSON object.
    ///
    /// Text (including a JSON string value) is decoded first. Objects pass
    /// through unchanged. Anything else is rejected with
    /// [`EventError::NotAnObject`].
    pub fn normalize(self) -> Result<EventPayload, EventError> {
        let value = match self {
            EventMessage::Text(text) | EventMessage::Value(Value::String(text)) => {
                serde_json::from_str(&text).map_err(EventError::Decode)?
            }
            EventMessage::Value(value) => value,
        };

        match value {
            Value::Object(map) => Ok(map),
            other => Err(EventError::NotAnObject {
                found: json_type_name(&other),
            }),
        }
    }
}

impl From<String> for EventMessage {
    fn from(text: String) -> Self {
        EventMessage::Text(text)
    }
}

impl From<&str> for EventMessage {
    fn from(text: &str) -> Self {
        EventMessage::Text(text.to_string())
    }
}

impl From<Value> for EventMessage {
    fn from(value: Value) -> Self {
        EventMessage::Value(value)
    }
}

impl From<EventPayload> for EventMessage {
    fn from(map: EventPayload) -> Self {
        EventMessage::Value(Value::Object(map))
    }
}

/// Normalizes any supported message form into an [`EventPayload`].
pub fn normalize(message: impl Into<EventMessage>) -> Result<EventPayload, EventError> {
    message.into().normalize()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
