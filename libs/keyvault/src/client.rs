//! Key Vault secret client.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use crate::credential::{DefaultCredential, TokenCredential, KEY_VAULT_SCOPE};
use crate::{CredentialError, SecretStoreError};

const SECRETS_API_VERSION: &str = "7.4";

/// A secret value. `Debug` never prints the contents.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretValue(String);

impl SecretValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrows the secret contents.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretValue(<redacted>)")
    }
}

/// A store of named secrets.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetches the current value of the named secret.
    async fn get_secret(&self, name: &str) -> Result<SecretValue, SecretStoreError>;
}

/// Opens an authenticated [`SecretStore`] for a vault location.
#[async_trait]
pub trait SecretStoreConnector: Send + Sync {
    async fn connect(&self, vault_url: &str) -> Result<Box<dyn SecretStore>, SecretStoreError>;
}

/// Client for the Key Vault secrets REST API.
///
/// The bearer token is acquired once when the client is constructed and
/// lives as long as the client does.
pub struct KeyVaultClient {
    http: reqwest::Client,
    vault_url: Url,
}

impl KeyVaultClient {
    /// Validates the vault URL, authenticates with `credential`, and builds
    /// the HTTP client.
    pub async fn connect(
        vault_url: &str,
        credential: &dyn TokenCredential,
    ) -> Result<Self, SecretStoreError> {
        let vault_url = parse_vault_url(vault_url)?;

        debug!(vault = %vault_url, credential = credential.name(), "acquiring vault token");
        let token = credential.get_token(KEY_VAULT_SCOPE).await?;

        let mut headers = HeaderMap::new();
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", token.token)).map_err(|_| {
            SecretStoreError::Credential(CredentialError::Parse(
                "token is not a valid header value".to_string(),
            ))
        })?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(SecretStoreError::Client)?;

        Ok(Self { http, vault_url })
    }

    /// The vault this client talks to.
    pub fn vault_url(&self) -> &Url {
        &self.vault_url
    }

    fn secret_url(&self, name: &str) -> Result<Url, SecretStoreError> {
        let mut url = self.vault_url.clone();
        url.path_segments_mut()
            .map_err(|_| SecretStoreError::InvalidVaultUrl {
                url: self.vault_url.to_string(),
                reason: "url cannot have a path".to_string(),
            })?
            .pop_if_empty()
            .push("secrets")
            .push(name);
        url.query_pairs_mut()
            .append_pair("api-version", SECRETS_API_VERSION);
        Ok(url)
    }

    /// Fetches the latest version of a secret.
    pub async fn get_secret(&self, name: &str) -> Result<SecretValue, SecretStoreError> {
        let url = self.secret_url(name)?;

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| SecretStoreError::Request {
                name: name.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(SecretStoreError::NotFound {
                name: name.to_string(),
            }),
            status if status.is_success() => {
                let bundle: SecretBundle =
                    response
                        .json()
                        .await
                        .map_err(|err| SecretStoreError::Malformed {
                            name: name.to_string(),
                            reason: err.to_string(),
                        })?;
                bundle
                    .value
                    .map(SecretValue)
                    .ok_or_else(|| SecretStoreError::Malformed {
                        name: name.to_string(),
                        reason: "response has no value".to_string(),
                    })
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(SecretStoreError::Status {
                    name: name.to_string(),
                    status,
                    body,
                })
            }
        }
    }
}

impl fmt::Debug for KeyVaultClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyVaultClient")
            .field("vault_url", &self.vault_url.as_str())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SecretStore for KeyVaultClient {
    async fn get_secret(&self, name: &str) -> Result<SecretValue, SecretStoreError> {
        KeyVaultClient::get_secret(self, name).await
    }
}

/// Secret bundle returned by `GET /secrets/{name}`.
#[derive(Deserialize)]
struct SecretBundle {
    #[serde(default)]
    value: Option<String>,
}

fn parse_vault_url(raw: &str) -> Result<Url, SecretStoreError> {
    let invalid = |reason: &str| SecretStoreError::InvalidVaultUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(raw.trim()).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "https" | "http") {
        return Err(invalid("scheme must be https or http"));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host"));
    }
    Ok(url)
}

/// Connects [`KeyVaultClient`]s using a shared token credential.
#[derive(Clone)]
pub struct KeyVaultConnector {
    credential: Arc<dyn TokenCredential>,
}

impl KeyVaultConnector {
    pub fn new(credential: Arc<dyn TokenCredential>) -> Self {
        Self { credential }
    }

    /// Connector over the ambient [`DefaultCredential`] chain.
    pub fn from_env() -> Self {
        Self::new(Arc::new(DefaultCredential::from_env()))
    }
}

impl fmt::Debug for KeyVaultConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyVaultConnector")
            .field("credential", &self.credential.name())
            .finish()
    }
}

#[async_trait]
impl SecretStoreConnector for KeyVaultConnector {
    async fn connect(&self, vault_url: &str) -> Result<Box<dyn SecretStore>, SecretStoreError> {
        let client = KeyVaultClient::connect(vault_url, self.credential.as_ref()).await?;
        Ok(Box::new(client))
    }
}
