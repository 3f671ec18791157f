//! Error types for credential resolution and secret lookups.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised while acquiring a bearer token.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The credential source is not configured in this environment.
    #[error("{credential} is not configured: {detail}")]
    NotConfigured {
        credential: &'static str,
        detail: String,
    },

    /// The token endpoint answered with a non-success status.
    #[error("token endpoint rejected the request: {status} {body}")]
    Rejected { status: StatusCode, body: String },

    /// The token endpoint could not be reached.
    #[error("failed to request token: {0}")]
    Request(#[source] reqwest::Error),

    /// The token endpoint answered with an unexpected body.
    #[error("failed to parse token response: {0}")]
    Parse(String),

    /// Every source in a credential chain failed.
    #[error("no credential source produced a token: [{}]", attempts.join("; "))]
    Unavailable { attempts: Vec<String> },
}

/// Errors raised by a secret store.
#[derive(Debug, Error)]
pub enum SecretStoreError {
    /// The vault location is not a usable URL.
    #[error("invalid vault url '{url}': {reason}")]
    InvalidVaultUrl { url: String, reason: String },

    /// The HTTP client could not be built.
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),

    /// No token could be acquired for the vault.
    #[error("failed to authenticate to vault: {0}")]
    Credential(#[from] CredentialError),

    /// The vault has no secret with this name.
    #[error("secret '{name}' not found")]
    NotFound { name: String },

    /// The vault answered with a non-success status.
    #[error("get secret '{name}' failed: {status} {body}")]
    Status {
        name: String,
        status: StatusCode,
        body: String,
    },

    /// The vault could not be reached.
    #[error("get secret '{name}' failed: {source}")]
    Request {
        name: String,
        #[source]
        source: reqwest::Error,
    },

    /// The vault answered with a body that carries no secret value.
    #[error("secret '{name}' response malformed: {reason}")]
    Malformed { name: String, reason: String },
}

impl SecretStoreError {
    /// Returns true if the named secret does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SecretStoreError::NotFound { .. })
    }
}
