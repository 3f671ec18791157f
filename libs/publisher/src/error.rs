//! Error types for the publish operation.

use gridpost_eventgrid::DeliveryError;
use gridpost_events::EventError;
use gridpost_keyvault::SecretStoreError;
use thiserror::Error;

/// Publish errors with standardized reason codes.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Payload text is not valid JSON.
    #[error("payload_decode_failed: {0}")]
    PayloadDecode(#[source] serde_json::Error),

    /// Payload is not a JSON object.
    #[error("payload_type_invalid: expected a JSON object or JSON text, received {found}")]
    PayloadType { found: &'static str },

    /// No secret name can be taken from the endpoint.
    #[error("endpoint_format_invalid: '{endpoint}': {reason}")]
    EndpointFormat {
        endpoint: String,
        reason: &'static str,
    },

    /// The vault location setting is absent.
    #[error("configuration_missing: required setting '{key}' is not set")]
    ConfigurationMissing { key: &'static str },

    /// The secret store could not be opened.
    #[error("secret_store_unreachable: {vault_url}: {source}")]
    SecretStoreUnreachable {
        vault_url: String,
        #[source]
        source: SecretStoreError,
    },

    /// The access key could not be fetched.
    #[error("secret_not_found: '{name}': {source}")]
    SecretNotFound {
        name: String,
        #[source]
        source: SecretStoreError,
    },

    /// The event endpoint did not accept the event.
    #[error("delivery_failed: {0}")]
    Delivery(#[from] DeliveryError),
}

impl PublishError {
    /// Get the standardized reason code for this error.
    pub fn reason_code(&self) -> &'static str {
        match self {
            PublishError::PayloadDecode(_) => "payload_decode_failed",
            PublishError::PayloadType { .. } => "payload_type_invalid",
            PublishError::EndpointFormat { .. } => "endpoint_format_invalid",
            PublishError::ConfigurationMissing { .. } => "configuration_missing",
            PublishError::SecretStoreUnreachable { .. } => "secret_store_unreachable",
            PublishError::SecretNotFound { .. } => "secret_not_found",
            PublishError::Delivery(_) => "delivery_failed",
        }
    }
}

impl From<EventError> for PublishError {
    fn from(err: EventError) -> Self {
        match err {
            EventError::Decode(e) => PublishError::PayloadDecode(e),
            EventError::NotAnObject { found } => PublishError::PayloadType { found },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_code_prefixes_message() {
        let errors = [
            PublishError::PayloadType { found: "array" },
            PublishError::EndpointFormat {
                endpoint: "https://nodot".to_string(),
                reason: "no '.' after the scheme prefix",
            },
            PublishError::ConfigurationMissing { key: "key-vault" },
            PublishError::SecretNotFound {
                name: "demo".to_string(),
                source: SecretStoreError::NotFound {
                    name: "demo".to_string(),
                },
            },
        ];

        for err in errors {
            assert!(err.to_string().starts_with(err.reason_code()));
        }
    }

    #[test]
    fn test_event_error_conversion() {
        let decode = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(
            PublishError::from(EventError::Decode(decode)).reason_code(),
            "payload_decode_failed"
        );
        assert_eq!(
            PublishError::from(EventError::NotAnObject { found: "number" }).reason_code(),
            "payload_type_invalid"
        );
    }
}
