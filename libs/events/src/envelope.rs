//! Event envelope - the record actually posted to an Event Grid topic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EventPayload;

/// Subject stamped on every published event.
pub const DEFAULT_SUBJECT: &str = "event";

/// Event type stamped on every published event.
pub const DEFAULT_EVENT_TYPE: &str = "Azure.Sdk.Demo";

/// Schema version of the `data` section.
pub const DEFAULT_DATA_VERSION: &str = "1.0";

/// An event in the Event Grid event schema.
///
/// Field names follow Rust conventions; the serialized form uses the
/// camelCase names Event Grid expects (`eventType`, `eventTime`,
/// `dataVersion`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventGridEvent {
    /// Unique identifier for the event.
    pub id: String,

    /// Full resource path of the topic. Filled in by Event Grid when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,

    /// Publisher-defined path to the event subject.
    pub subject: String,

    /// Event payload.
    pub data: EventPayload,

    /// Publisher-defined event type.
    pub event_type: String,

    /// When the event was generated, in UTC.
    pub event_time: DateTime<Utc>,

    /// Schema version of `data`.
    pub data_version: String,
}

impl EventGridEvent {
    /// Creates an event with the default subject, type and data version,
    /// a fresh id, and the current time.
    pub fn new(data: EventPayload) -> Self {
        Self::builder(data).build()
    }

    /// Creates a new event builder around the given payload.
    pub fn builder(data: EventPayload) -> EventGridEventBuilder {
        EventGridEventBuilder::new(data)
    }
}

/// Builder for constructing Event Grid events.
#[derive(Debug)]
pub struct EventGridEventBuilder {
    id: Option<String>,
    topic: Option<String>,
    subject: String,
    data: EventPayload,
    event_type: String,
    event_time: Option<DateTime<Utc>>,
    data_version: String,
}

impl EventGridEventBuilder {
    pub fn new(data: EventPayload) -> Self {
        Self {
            id: None,
            topic: None,
            subject: DEFAULT_SUBJECT.to_string(),
            data,
            event_type: DEFAULT_EVENT_TYPE.to_string(),
            event_time: None,
            data_version: DEFAULT_DATA_VERSION.to_string(),
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    pub fn event_time(mut self, ts: DateTime<Utc>) -> Self {
        self.event_time = Some(ts);
        self
    }

    pub fn data_version(mut self, version: impl Into<String>) -> Self {
        self.data_version = version.into();
        self
    }

    /// Builds the event. Unset id and time are generated here.
    pub fn build(self) -> EventGridEvent {
        EventGridEvent {
            id: self.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            topic: self.topic,
            subject: self.subject,
            data: self.data,
            event_type: self.event_type,
            event_time: self.event_time.unwrap_or_else(Utc::now),
            data_version: self.data_version,
        }
    }
}
