//! gridpost publisher.
//!
//! Publishes one event to an Event Grid topic. The topic's access key is
//! looked up in Key Vault on every call, under a secret named after the
//! topic (the first label of the endpoint host).
//!
//! ```no_run
//! # async fn run() -> Result<(), gridpost_publisher::PublishError> {
//! gridpost_publisher::publish(
//!     "https://orders.eastus-1.eventgrid.azure.net/api/events",
//!     r#"{"order_id": 42}"#,
//! )
//! .await
//! # }
//! ```

pub mod config;
pub mod endpoint;
pub mod error;
pub mod logging;
mod publisher;

pub use config::{Config, EnvSource};
pub use endpoint::{derive_secret_name, TopicEndpoint};
pub use error::PublishError;
pub use publisher::{publish, Publisher};
