//! The publish operation.
//!
//! Steps, in order, each failing fast:
//! 1. Normalize the payload into a JSON object
//! 2. Take the secret name from the endpoint
//! 3. Read the vault location from configuration
//! 4. Open the secret store with ambient credentials
//! 5. Fetch the topic access key
//! 6. Build the event envelope
//! 7. Deliver through a client that is closed whatever the outcome
//!
//! Nothing is retried and nothing is cached between calls.

use std::sync::Arc;

use gridpost_eventgrid::{AzureKeyCredential, EventGridConnector, SinkConnector};
use gridpost_events::{EventGridEvent, EventMessage};
use gridpost_keyvault::{KeyVaultConnector, SecretStoreConnector};
use tracing::{debug, error, info, info_span, Instrument, Span};

use crate::{Config, EnvSource, PublishError, TopicEndpoint};

/// Publishes events to Event Grid topics.
pub struct Publisher {
    secrets: Arc<dyn SecretStoreConnector>,
    sinks: Arc<dyn SinkConnector>,
    env: EnvSource,
    span: Span,
}

impl Publisher {
    pub fn new(secrets: Arc<dyn SecretStoreConnector>, sinks: Arc<dyn SinkConnector>) -> Self {
        Self {
            secrets,
            sinks,
            env: EnvSource::Process,
            span: info_span!("gridpost"),
        }
    }

    /// Key Vault over the ambient credential chain, delivering over HTTP.
    pub fn from_environment() -> Self {
        Self::new(
            Arc::new(KeyVaultConnector::from_env()),
            Arc::new(EventGridConnector),
        )
    }

    /// Read settings from `env` instead of the process environment.
    pub fn with_env(mut self, env: EnvSource) -> Self {
        self.env = env;
        self
    }

    /// Emit this publisher's log events under `span`.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Publish one event to `endpoint`.
    ///
    /// `message` is JSON text or an already structured JSON object.
    pub async fn publish(
        &self,
        endpoint: &str,
        message: impl Into<EventMessage>,
    ) -> Result<(), PublishError> {
        let span = info_span!(parent: &self.span, "publish", endpoint = %endpoint);

        let result = self
            .run(endpoint, message.into())
            .instrument(span.clone())
            .await;

        if let Err(e) = &result {
            span.in_scope(|| error!(reason = e.reason_code(), error = %e, "event publish failed"));
        }

        result
    }

    async fn run(&self, endpoint: &str, message: EventMessage) -> Result<(), PublishError> {
        if let EventMessage::Text(_) = &message {
            info!("message received as text, decoding to an object");
        } else {
            debug!(kind = message.kind(), "message received");
        }
        let payload = message.normalize()?;

        let endpoint = TopicEndpoint::parse(endpoint)?;
        let secret_name = endpoint.secret_name();
        info!(secret_name, "event generation initiated, fetching access key");

        let config = Config::from_source(&self.env)?;

        let store = self
            .secrets
            .connect(&config.vault_url)
            .await
            .map_err(|source| PublishError::SecretStoreUnreachable {
                vault_url: config.vault_url.clone(),
                source,
            })?;

        let access_key = store.get_secret(secret_name).await.map_err(|source| {
            PublishError::SecretNotFound {
                name: secret_name.to_string(),
                source,
            }
        })?;
        drop(store);
        info!(secret_name, "access key obtained");

        let event = EventGridEvent::new(payload);
        info!(event_id = %event.id, "event generated");

        let sink = self
            .sinks
            .connect(endpoint.as_str(), AzureKeyCredential::new(access_key.into_inner()))
            .await?;
        let sent = sink.send(&event).await;
        sink.close().await;
        sent?;

        info!(event_id = %event.id, "event published");
        Ok(())
    }
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("env", &self.env)
            .finish_non_exhaustive()
    }
}

/// Publish one event using ambient credentials and the process environment.
pub async fn publish(endpoint: &str, message: impl Into<EventMessage>) -> Result<(), PublishError> {
    Publisher::from_environment().publish(endpoint, message).await
}
