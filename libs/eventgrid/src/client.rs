//! Event Grid publisher client.

use std::fmt;

use async_trait::async_trait;
use gridpost_events::EventGridEvent;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use tracing::debug;

use crate::DeliveryError;

/// Data-plane API version for publishing Event Grid schema events.
pub const EVENT_GRID_API_VERSION: &str = "2018-01-01";

/// Header carrying the topic access key.
pub const SAS_KEY_HEADER: &str = "aeg-sas-key";

/// Topic access key. `Debug` never prints the key.
#[derive(Clone, PartialEq, Eq)]
pub struct AzureKeyCredential(String);

impl AzureKeyCredential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn key(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AzureKeyCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AzureKeyCredential(<redacted>)")
    }
}

/// An open delivery channel to a single endpoint.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Delivers one event.
    async fn send(&self, event: &EventGridEvent) -> Result<(), DeliveryError>;

    /// Releases the channel's resources.
    async fn close(self: Box<Self>);
}

/// Opens an [`EventSink`] for an endpoint and access key.
#[async_trait]
pub trait SinkConnector: Send + Sync {
    async fn connect(
        &self,
        endpoint: &str,
        key: AzureKeyCredential,
    ) -> Result<Box<dyn EventSink>, DeliveryError>;
}

/// HTTP client for one Event Grid topic.
pub struct EventGridPublisherClient {
    http: reqwest::Client,
    endpoint: String,
}

impl EventGridPublisherClient {
    /// Create a client for `endpoint`, authenticating every request with `key`.
    pub fn new(endpoint: &str, key: &AzureKeyCredential) -> Result<Self, DeliveryError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut sas = HeaderValue::from_str(key.key()).map_err(|_| DeliveryError::InvalidKey)?;
        sas.set_sensitive(true);
        headers.insert(SAS_KEY_HEADER, sas);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(DeliveryError::Client)?;

        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Post a single event. Event Grid takes an array body even for one event.
    pub async fn send(&self, event: &EventGridEvent) -> Result<(), DeliveryError> {
        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("api-version", EVENT_GRID_API_VERSION)])
            .json(std::slice::from_ref(event))
            .send()
            .await
            .map_err(DeliveryError::Transport)?;

        let status = response.status();
        if status.is_success() {
            debug!(endpoint = %self.endpoint, event_id = %event.id, %status, "event accepted");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(DeliveryError::Rejected { status, body })
        }
    }

    /// Close the client, dropping its connection pool.
    pub fn close(self) {
        debug!(endpoint = %self.endpoint, "closing event grid client");
        drop(self.http);
    }
}

impl fmt::Debug for EventGridPublisherClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventGridPublisherClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EventSink for EventGridPublisherClient {
    async fn send(&self, event: &EventGridEvent) -> Result<(), DeliveryError> {
        EventGridPublisherClient::send(self, event).await
    }

    async fn close(self: Box<Self>) {
        EventGridPublisherClient::close(*self)
    }
}

/// Connects [`EventGridPublisherClient`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventGridConnector;

#[async_trait]
impl SinkConnector for EventGridConnector {
    async fn connect(
        &self,
        endpoint: &str,
        key: AzureKeyCredential,
    ) -> Result<Box<dyn EventSink>, DeliveryError> {
        let client = EventGridPublisherClient::new(endpoint, &key)?;
        Ok(Box::new(client))
    }
}
