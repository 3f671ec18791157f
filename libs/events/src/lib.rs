//! # gridpost-events
//!
//! Event payload normalization and the Event Grid event envelope.
//!
//! ## Design Principles
//!
//! - A payload is always a JSON object once normalized
//! - Callers may hand over either JSON text or an already structured value
//! - Envelopes are built fresh for every publish and never reused
//!
//! ## Event Envelope
//!
//! Every event carries:
//! - The normalized payload (`data`)
//! - Routing metadata (`subject`, `event_type`)
//! - Schema metadata (`data_version`)
//! - Identity and timing (`id`, `event_time`)
//!
//! The wire form follows the Event Grid event schema, which uses camelCase
//! field names and expects events posted as a JSON array.

mod envelope;
mod error;
mod payload;

pub use envelope::*;
pub use error::EventError;
pub use payload::*;
