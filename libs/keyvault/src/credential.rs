//! Ambient credential resolution.
//!
//! Tokens are resolved from the execution environment in the same order the
//! Azure SDKs use for their default credential:
//! 1. Service principal variables (`AZURE_TENANT_ID`, `AZURE_CLIENT_ID`,
//!    `AZURE_CLIENT_SECRET`)
//! 2. Managed identity (App Service / Functions identity endpoint, or the VM
//!    instance metadata service)
//!
//! Nothing is cached: every call asks the source for a fresh token.

use std::env;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::CredentialError;

/// OAuth2 scope for the Key Vault data plane.
pub const KEY_VAULT_SCOPE: &str = "https://vault.azure.net/.default";

const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";
const IMDS_API_VERSION: &str = "2018-02-01";
const APP_SERVICE_API_VERSION: &str = "2019-08-01";

/// Connect timeout for the instance metadata service. Off-Azure hosts have
/// nothing listening on the link-local address.
const IMDS_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// A bearer token.
#[derive(Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_on: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_on: None,
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

/// A source of bearer tokens.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Acquires a token for the given OAuth2 scope.
    async fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError>;

    /// Name used in logs and chained error reports.
    fn name(&self) -> &'static str;
}

fn http_client() -> Result<reqwest::Client, CredentialError> {
    reqwest::Client::builder()
        .build()
        .map_err(CredentialError::Request)
}

/// Managed identity endpoints take a resource, not a scope.
fn scope_to_resource(scope: &str) -> &str {
    scope.strip_suffix("/.default").unwrap_or(scope)
}

fn process_var(name: &str) -> Option<String> {
    env::var(name).ok()
}

/// Looks up `name`, treating blank values as unset.
fn non_empty(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

// =============================================================================
// Service principal
// =============================================================================

/// Client-credentials grant for a service principal.
#[derive(Clone)]
pub struct EnvironmentCredential {
    tenant_id: String,
    client_id: String,
    client_secret: String,
    authority_host: String,
}

impl EnvironmentCredential {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
        }
    }

    /// Overrides the authority host (sovereign clouds, tests).
    pub fn with_authority_host(mut self, host: impl Into<String>) -> Self {
        self.authority_host = host.into().trim_end_matches('/').to_string();
        self
    }

    /// Reads `AZURE_TENANT_ID`, `AZURE_CLIENT_ID`, `AZURE_CLIENT_SECRET` and
    /// the optional `AZURE_AUTHORITY_HOST`.
    pub fn from_env() -> Result<Self, CredentialError> {
        Self::from_lookup(process_var)
    }

    /// Same as [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, CredentialError> {
        let missing = |var: &str| CredentialError::NotConfigured {
            credential: "EnvironmentCredential",
            detail: format!("missing {var}"),
        };

        let tenant_id =
            non_empty(&lookup, "AZURE_TENANT_ID").ok_or_else(|| missing("AZURE_TENANT_ID"))?;
        let client_id =
            non_empty(&lookup, "AZURE_CLIENT_ID").ok_or_else(|| missing("AZURE_CLIENT_ID"))?;
        let client_secret = non_empty(&lookup, "AZURE_CLIENT_SECRET")
            .ok_or_else(|| missing("AZURE_CLIENT_SECRET"))?;

        let mut credential = Self::new(tenant_id, client_id, client_secret);
        if let Some(host) = non_empty(&lookup, "AZURE_AUTHORITY_HOST") {
            credential = credential.with_authority_host(host);
        }
        Ok(credential)
    }

    fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host, self.tenant_id
        )
    }
}

impl fmt::Debug for EnvironmentCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentCredential")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("authority_host", &self.authority_host)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct ClientCredentialsResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[async_trait]
impl TokenCredential for EnvironmentCredential {
    async fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", scope),
            ("grant_type", "client_credentials"),
        ];

        let response = http_client()?
            .post(self.token_url())
            .form(&params)
            .send()
            .await
            .map_err(CredentialError::Request)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CredentialError::Rejected { status, body });
        }

        let payload: ClientCredentialsResponse = response
            .json()
            .await
            .map_err(|err| CredentialError::Parse(err.to_string()))?;

        Ok(AccessToken {
            token: payload.access_token,
            expires_on: payload
                .expires_in
                .map(|secs| Utc::now() + chrono::Duration::seconds(secs)),
        })
    }

    fn name(&self) -> &'static str {
        "EnvironmentCredential"
    }
}

// =============================================================================
// Managed identity
// =============================================================================

#[derive(Clone)]
enum ManagedIdentitySource {
    /// App Service and Functions expose a local identity endpoint.
    AppService { endpoint: String, header: String },
    /// Virtual machines use the instance metadata service.
    Imds { endpoint: String },
}

/// Token from the managed identity assigned to the current host.
#[derive(Clone)]
pub struct ManagedIdentityCredential {
    source: ManagedIdentitySource,
    client_id: Option<String>,
}

impl ManagedIdentityCredential {
    /// Picks the App Service endpoint when `IDENTITY_ENDPOINT` and
    /// `IDENTITY_HEADER` are set, the instance metadata service otherwise.
    /// `AZURE_CLIENT_ID` selects a user-assigned identity.
    pub fn from_env() -> Self {
        Self::from_lookup(process_var)
    }

    /// Same as [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let endpoint = non_empty(&lookup, "IDENTITY_ENDPOINT");
        let header = non_empty(&lookup, "IDENTITY_HEADER");
        let source = match (endpoint, header) {
            (Some(endpoint), Some(header)) => {
                ManagedIdentitySource::AppService { endpoint, header }
            }
            _ => ManagedIdentitySource::Imds {
                endpoint: IMDS_ENDPOINT.to_string(),
            },
        };

        Self {
            source,
            client_id: non_empty(&lookup, "AZURE_CLIENT_ID"),
        }
    }

    pub fn app_service(endpoint: impl Into<String>, header: impl Into<String>) -> Self {
        Self {
            source: ManagedIdentitySource::AppService {
                endpoint: endpoint.into(),
                header: header.into(),
            },
            client_id: None,
        }
    }

    pub fn imds(endpoint: impl Into<String>) -> Self {
        Self {
            source: ManagedIdentitySource::Imds {
                endpoint: endpoint.into(),
            },
            client_id: None,
        }
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }
}

impl fmt::Debug for ManagedIdentityCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match &self.source {
            ManagedIdentitySource::AppService { endpoint, .. } => endpoint,
            ManagedIdentitySource::Imds { endpoint } => endpoint,
        };
        f.debug_struct("ManagedIdentityCredential")
            .field("endpoint", source)
            .field("client_id", &self.client_id)
            .finish()
    }
}

#[derive(Deserialize)]
struct ManagedIdentityResponse {
    access_token: String,
    /// Epoch seconds; sent as a string by both endpoints.
    #[serde(default)]
    expires_on: Option<Value>,
}

fn parse_expires_on(value: Option<Value>) -> Option<DateTime<Utc>> {
    let secs = match value? {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    Utc.timestamp_opt(secs, 0).single()
}

#[async_trait]
impl TokenCredential for ManagedIdentityCredential {
    async fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        let resource = scope_to_resource(scope);
        let mut query = vec![("resource", resource)];
        if let Some(client_id) = &self.client_id {
            query.push(("client_id", client_id.as_str()));
        }

        let request = match &self.source {
            ManagedIdentitySource::AppService { endpoint, header } => {
                query.push(("api-version", APP_SERVICE_API_VERSION));
                http_client()?
                    .get(endpoint)
                    .query(&query)
                    .header("X-IDENTITY-HEADER", header)
            }
            ManagedIdentitySource::Imds { endpoint } => {
                query.push(("api-version", IMDS_API_VERSION));
                reqwest::Client::builder()
                    .connect_timeout(IMDS_CONNECT_TIMEOUT)
                    .build()
                    .map_err(CredentialError::Request)?
                    .get(endpoint)
                    .query(&query)
                    .header("Metadata", "true")
            }
        };

        let response = request.send().await.map_err(CredentialError::Request)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CredentialError::Rejected { status, body });
        }

        let payload: ManagedIdentityResponse = response
            .json()
            .await
            .map_err(|err| CredentialError::Parse(err.to_string()))?;

        Ok(AccessToken {
            token: payload.access_token,
            expires_on: parse_expires_on(payload.expires_on),
        })
    }

    fn name(&self) -> &'static str {
        "ManagedIdentityCredential"
    }
}

// =============================================================================
// Static token
// =============================================================================

/// A fixed bearer token, for emulators and tests.
#[derive(Clone)]
pub struct StaticTokenCredential {
    token: String,
}

impl StaticTokenCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl fmt::Debug for StaticTokenCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticTokenCredential(<redacted>)")
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    async fn get_token(&self, _scope: &str) -> Result<AccessToken, CredentialError> {
        Ok(AccessToken::new(self.token.clone()))
    }

    fn name(&self) -> &'static str {
        "StaticTokenCredential"
    }
}

// =============================================================================
// Default chain
// =============================================================================

/// Tries each configured source in order and returns the first token.
pub struct DefaultCredential {
    sources: Vec<Box<dyn TokenCredential>>,
    skipped: Vec<String>,
}

impl DefaultCredential {
    /// Builds the chain from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(process_var)
    }

    /// Builds the chain reading variables through `lookup`. An unconfigured
    /// service principal is recorded as a skipped attempt.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut sources: Vec<Box<dyn TokenCredential>> = Vec::new();
        let mut skipped = Vec::new();

        match EnvironmentCredential::from_lookup(&lookup) {
            Ok(credential) => sources.push(Box::new(credential)),
            Err(err) => skipped.push(err.to_string()),
        }
        sources.push(Box::new(ManagedIdentityCredential::from_lookup(&lookup)));

        Self { sources, skipped }
    }

    /// Builds a chain over explicit sources.
    pub fn with_sources(sources: Vec<Box<dyn TokenCredential>>) -> Self {
        Self {
            sources,
            skipped: Vec::new(),
        }
    }
}

impl fmt::Debug for DefaultCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.sources.iter().map(|s| s.name()).collect();
        f.debug_struct("DefaultCredential")
            .field("sources", &names)
            .field("skipped", &self.skipped)
            .finish()
    }
}

#[async_trait]
impl TokenCredential for DefaultCredential {
    async fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        let mut attempts = self.skipped.clone();

        for source in &self.sources {
            match source.get_token(scope).await {
                Ok(token) => {
                    debug!(credential = source.name(), "token acquired");
                    return Ok(token);
                }
                Err(e) => {
                    debug!(credential = source.name(), error = %e, "credential source failed");
                    attempts.push(format!("{}: {}", source.name(), e));
                }
            }
        }

        Err(CredentialError::Unavailable { attempts })
    }

    fn name(&self) -> &'static str {
        "DefaultCredential"
    }
}
