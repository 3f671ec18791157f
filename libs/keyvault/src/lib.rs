//! # gridpost-keyvault
//!
//! Reads named secrets from Azure Key Vault over its REST API.
//!
//! Authentication is ambient: [`DefaultCredential`] resolves a bearer token
//! from the execution environment (service principal variables or a managed
//! identity) without the caller passing any keys. Both the credential and
//! the secret store sit behind traits so callers can substitute test doubles.

mod client;
mod credential;
mod error;

pub use client::{KeyVaultClient, KeyVaultConnector, SecretStore, SecretStoreConnector, SecretValue};
pub use credential::{
    AccessToken, DefaultCredential, EnvironmentCredential, ManagedIdentityCredential,
    StaticTokenCredential, TokenCredential, KEY_VAULT_SCOPE,
};
pub use error::{CredentialError, SecretStoreError};
