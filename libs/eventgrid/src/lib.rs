//! # gridpost-eventgrid
//!
//! Delivers events to an Event Grid topic endpoint, authenticated with the
//! topic access key.
//!
//! Delivery clients are short-lived: connect, send, close. The
//! [`EventSink`] and [`SinkConnector`] traits let callers swap the HTTP
//! client for a test double.

mod client;
mod error;

pub use client::{
    AzureKeyCredential, EventGridConnector, EventGridPublisherClient, EventSink, SinkConnector,
    EVENT_GRID_API_VERSION, SAS_KEY_HEADER,
};
pub use error::DeliveryError;
