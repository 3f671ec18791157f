//! Topic endpoint parsing.
//!
//! A topic endpoint looks like
//! `https://<topic>.<region>.eventgrid.azure.net/api/events`. The access key
//! for the topic is stored in Key Vault under the name `<topic>`: the text
//! between the 8-character `https://` prefix and the first `.`.

use std::fmt;
use std::str::FromStr;

use crate::PublishError;

/// Length of the `scheme://` prefix the topic name follows.
const SCHEME_PREFIX_LEN: usize = 8;

/// A validated topic endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicEndpoint {
    url: String,
    name_end: usize,
}

impl TopicEndpoint {
    pub fn parse(raw: &str) -> Result<Self, PublishError> {
        let invalid = |reason: &'static str| PublishError::EndpointFormat {
            endpoint: raw.to_string(),
            reason,
        };

        let prefix = raw
            .get(..SCHEME_PREFIX_LEN)
            .ok_or_else(|| invalid("shorter than the scheme prefix"))?;
        if !prefix.ends_with("://") {
            return Err(invalid("expected an 8-character scheme prefix such as https://"));
        }

        let rest = &raw[SCHEME_PREFIX_LEN..];
        let dot = rest
            .find('.')
            .ok_or_else(|| invalid("no '.' after the scheme prefix"))?;
        let name = &rest[..dot];

        if name.is_empty() {
            return Err(invalid("empty topic name"));
        }

        Ok(Self {
            url: raw.to_string(),
            name_end: SCHEME_PREFIX_LEN + dot,
        })
    }

    /// The full endpoint URL, used as the delivery address.
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// Name of the secret holding this topic's access key.
    pub fn secret_name(&self) -> &str {
        &self.url[SCHEME_PREFIX_LEN..self.name_end]
    }
}

impl FromStr for TopicEndpoint {
    type Err = PublishError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TopicEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// Derive the access-key secret name for an endpoint.
pub fn derive_secret_name(endpoint: &str) -> Result<String, PublishError> {
    TopicEndpoint::parse(endpoint).map(|e| e.secret_name().to_string())
}
