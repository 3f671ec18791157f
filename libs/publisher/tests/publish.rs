//! Integration tests for the publish operation.
//!
//! The secret store and event sink are recording doubles, so each test can
//! check exactly which external calls were made.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use gridpost_eventgrid::{AzureKeyCredential, DeliveryError, EventSink, SinkConnector};
use gridpost_events::EventGridEvent;
use gridpost_keyvault::{
    KeyVaultConnector, SecretStore, SecretStoreConnector, SecretStoreError, SecretValue,
    StaticTokenCredential,
};
use gridpost_publisher::{EnvSource, PublishError, Publisher};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENDPOINT: &str = "https://demo.eastus-1.eventgrid.azure.net/api/events";
const VAULT_URL: &str = "https://gridpost-test.vault.azure.net";

// =============================================================================
// Test doubles
// =============================================================================

#[derive(Default)]
struct StoreLog {
    connects: Vec<String>,
    lookups: Vec<String>,
}

#[derive(Clone, Default)]
struct FakeSecrets {
    secrets: HashMap<String, String>,
    unreachable: bool,
    log: Arc<Mutex<StoreLog>>,
}

impl FakeSecrets {
    fn with_secret(name: &str, value: &str) -> Self {
        let mut fake = Self::default();
        fake.secrets.insert(name.to_string(), value.to_string());
        fake
    }

    fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    fn connects(&self) -> usize {
        self.log.lock().unwrap().connects.len()
    }

    fn lookups(&self) -> Vec<String> {
        self.log.lock().unwrap().lookups.clone()
    }
}

struct FakeStore {
    secrets: HashMap<String, String>,
    log: Arc<Mutex<StoreLog>>,
}

#[async_trait]
impl SecretStoreConnector for FakeSecrets {
    async fn connect(&self, vault_url: &str) -> Result<Box<dyn SecretStore>, SecretStoreError> {
        self.log.lock().unwrap().connects.push(vault_url.to_string());
        if self.unreachable {
            return Err(SecretStoreError::InvalidVaultUrl {
                url: vault_url.to_string(),
                reason: "unreachable".to_string(),
            });
        }
        Ok(Box::new(FakeStore {
            secrets: self.secrets.clone(),
            log: self.log.clone(),
        }))
    }
}

#[async_trait]
impl SecretStore for FakeStore {
    async fn get_secret(&self, name: &str) -> Result<SecretValue, SecretStoreError> {
        self.log.lock().unwrap().lookups.push(name.to_string());
        self.secrets
            .get(name)
            .map(SecretValue::new)
            .ok_or_else(|| SecretStoreError::NotFound {
                name: name.to_string(),
            })
    }
}

#[derive(Default)]
struct SinkLog {
    connects: Vec<(String, String)>,
    sent: Vec<EventGridEvent>,
    closed: usize,
}

#[derive(Clone, Default)]
struct FakeSinks {
    reject: bool,
    log: Arc<Mutex<SinkLog>>,
}

impl FakeSinks {
    fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }
}

struct FakeSink {
    reject: bool,
    log: Arc<Mutex<SinkLog>>,
}

#[async_trait]
impl SinkConnector for FakeSinks {
    async fn connect(
        &self,
        endpoint: &str,
        key: AzureKeyCredential,
    ) -> Result<Box<dyn EventSink>, DeliveryError> {
        self.log
            .lock()
            .unwrap()
            .connects
            .push((endpoint.to_string(), key.key().to_string()));
        Ok(Box::new(FakeSink {
            reject: self.reject,
            log: self.log.clone(),
        }))
    }
}

#[async_trait]
impl EventSink for FakeSink {
    async fn send(&self, event: &EventGridEvent) -> Result<(), DeliveryError> {
        if self.reject {
            return Err(DeliveryError::InvalidKey);
        }
        self.log.lock().unwrap().sent.push(event.clone());
        Ok(())
    }

    async fn close(self: Box<Self>) {
        self.log.lock().unwrap().closed += 1;
    }
}

fn configured() -> EnvSource {
    EnvSource::fixed([("key-vault", VAULT_URL)])
}

fn publisher(secrets: &FakeSecrets, sinks: &FakeSinks) -> Publisher {
    Publisher::new(Arc::new(secrets.clone()), Arc::new(sinks.clone())).with_env(configured())
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_publish_end_to_end() {
    let secrets = FakeSecrets::with_secret("demo", "K");
    let sinks = FakeSinks::default();

    let start = Utc::now();
    publisher(&secrets, &sinks)
        .publish(ENDPOINT, r#"{"a":1}"#)
        .await
        .unwrap();
    let end = Utc::now();

    assert_eq!(secrets.log.lock().unwrap().connects, vec![VAULT_URL]);
    assert_eq!(secrets.lookups(), vec!["demo"]);

    let log = sinks.log.lock().unwrap();
    assert_eq!(
        log.connects,
        vec![(ENDPOINT.to_string(), "K".to_string())]
    );
    assert_eq!(log.sent.len(), 1);
    assert_eq!(log.closed, 1);

    let event = &log.sent[0];
    assert_eq!(serde_json::Value::Object(event.data.clone()), json!({"a": 1}));
    assert_eq!(event.subject, "event");
    assert_eq!(event.event_type, "Azure.Sdk.Demo");
    assert_eq!(event.data_version, "1.0");
    assert!(start <= event.event_time && event.event_time <= end);
}

#[tokio::test]
async fn test_structured_message_is_sent_unchanged() {
    let secrets = FakeSecrets::with_secret("demo", "K");
    let sinks = FakeSinks::default();
    let message = json!({"order": {"id": 42, "lines": [1, 2]}});

    publisher(&secrets, &sinks)
        .publish(ENDPOINT, message.clone())
        .await
        .unwrap();

    let log = sinks.log.lock().unwrap();
    assert_eq!(serde_json::Value::Object(log.sent[0].data.clone()), message);
}

#[tokio::test]
async fn test_missing_configuration_stops_before_any_call() {
    let secrets = FakeSecrets::with_secret("demo", "K");
    let sinks = FakeSinks::default();

    let err = Publisher::new(Arc::new(secrets.clone()), Arc::new(sinks.clone()))
        .with_env(EnvSource::fixed(Vec::<(String, String)>::new()))
        .publish(ENDPOINT, r#"{"a":1}"#)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PublishError::ConfigurationMissing { key: "key-vault" }
    ));
    assert_eq!(secrets.connects(), 0);
    assert!(sinks.log.lock().unwrap().connects.is_empty());
}

#[tokio::test]
async fn test_missing_secret_stops_before_delivery() {
    let secrets = FakeSecrets::with_secret("other-topic", "K");
    let sinks = FakeSinks::default();

    let err = publisher(&secrets, &sinks)
        .publish(ENDPOINT, r#"{"a":1}"#)
        .await
        .unwrap_err();

    match err {
        PublishError::SecretNotFound { name, source } => {
            assert_eq!(name, "demo");
            assert!(source.is_not_found());
        }
        other => panic!("expected secret_not_found, got {:?}", other),
    }
    assert!(sinks.log.lock().unwrap().connects.is_empty());
}

#[tokio::test]
async fn test_unusual_topic_name_is_looked_up_as_is() {
    let secrets = FakeSecrets::with_secret("demo", "K");
    let sinks = FakeSinks::default();

    let err = publisher(&secrets, &sinks)
        .publish(
            "https://my_topic.eastus-1.eventgrid.azure.net/api/events",
            r#"{"a":1}"#,
        )
        .await
        .unwrap_err();

    assert_eq!(err.reason_code(), "secret_not_found");
    assert_eq!(secrets.lookups(), vec!["my_topic"]);
    assert!(sinks.log.lock().unwrap().connects.is_empty());
}

#[tokio::test]
async fn test_unreachable_store_is_reported() {
    let secrets = FakeSecrets::unreachable();
    let sinks = FakeSinks::default();

    let err = publisher(&secrets, &sinks)
        .publish(ENDPOINT, r#"{"a":1}"#)
        .await
        .unwrap_err();

    assert_eq!(err.reason_code(), "secret_store_unreachable");
    assert!(secrets.lookups().is_empty());
    assert!(sinks.log.lock().unwrap().connects.is_empty());
}

#[tokio::test]
async fn test_failed_delivery_still_closes_client() {
    let secrets = FakeSecrets::with_secret("demo", "K");
    let sinks = FakeSinks::rejecting();

    let err = publisher(&secrets, &sinks)
        .publish(ENDPOINT, r#"{"a":1}"#)
        .await
        .unwrap_err();

    assert!(matches!(err, PublishError::Delivery(DeliveryError::InvalidKey)));
    let log = sinks.log.lock().unwrap();
    assert_eq!(log.connects.len(), 1);
    assert_eq!(log.closed, 1);
}

#[tokio::test]
async fn test_invalid_payloads_fail_before_any_call() {
    let secrets = FakeSecrets::with_secret("demo", "K");
    let sinks = FakeSinks::default();
    let publisher = publisher(&secrets, &sinks);

    let err = publisher.publish(ENDPOINT, "{not json").await.unwrap_err();
    assert_eq!(err.reason_code(), "payload_decode_failed");

    let err = publisher.publish(ENDPOINT, json!([1, 2])).await.unwrap_err();
    assert!(matches!(err, PublishError::PayloadType { found: "array" }));

    let err = publisher.publish(ENDPOINT, "42").await.unwrap_err();
    assert!(matches!(err, PublishError::PayloadType { found: "number" }));

    assert_eq!(secrets.connects(), 0);
}

#[tokio::test]
async fn test_endpoint_without_separator_is_format_error() {
    let secrets = FakeSecrets::with_secret("demo", "K");
    let sinks = FakeSinks::default();

    let err = publisher(&secrets, &sinks)
        .publish("https://localhost/api/events", r#"{"a":1}"#)
        .await
        .unwrap_err();

    assert_eq!(err.reason_code(), "endpoint_format_invalid");
    assert_eq!(secrets.connects(), 0);
}

#[tokio::test]
async fn test_publish_with_key_vault_over_http() {
    let vault = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/secrets/demo"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": "K"})))
        .expect(1)
        .mount(&vault)
        .await;

    let sinks = FakeSinks::default();
    let connector = KeyVaultConnector::new(Arc::new(StaticTokenCredential::new("test-token")));

    Publisher::new(Arc::new(connector), Arc::new(sinks.clone()))
        .with_env(EnvSource::fixed([("key-vault", vault.uri())]))
        .with_span(tracing::info_span!("test"))
        .publish(ENDPOINT, r#"{"a":1}"#)
        .await
        .unwrap();

    let log = sinks.log.lock().unwrap();
    assert_eq!(log.connects[0].1, "K");
    assert_eq!(log.sent.len(), 1);
}

#[tokio::test]
async fn test_vault_not_found_over_http() {
    let vault = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/secrets/demo"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&vault)
        .await;

    let sinks = FakeSinks::default();
    let connector = KeyVaultConnector::new(Arc::new(StaticTokenCredential::new("test-token")));

    let err = Publisher::new(Arc::new(connector), Arc::new(sinks.clone()))
        .with_env(EnvSource::fixed([("key-vault", vault.uri())]))
        .publish(ENDPOINT, r#"{"a":1}"#)
        .await
        .unwrap_err();

    assert_eq!(err.reason_code(), "secret_not_found");
    assert!(sinks.log.lock().unwrap().connects.is_empty());
}
