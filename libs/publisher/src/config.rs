//! Publisher configuration.
//!
//! The only required setting is the Key Vault location, read from the
//! `key-vault` environment variable at publish time.

use std::collections::HashMap;

use crate::PublishError;

/// Environment variable naming the Key Vault URL.
pub const VAULT_URL_VAR: &str = "key-vault";

/// Where settings are read from.
#[derive(Debug, Clone, Default)]
pub enum EnvSource {
    /// The process environment.
    #[default]
    Process,
    /// A fixed set of values.
    Fixed(HashMap<String, String>),
}

impl EnvSource {
    pub fn fixed<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        EnvSource::Fixed(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Look up a setting. Blank values count as unset.
    pub fn get(&self, key: &str) -> Option<String> {
        let value = match self {
            EnvSource::Process => std::env::var(key).ok(),
            EnvSource::Fixed(vars) => vars.get(key).cloned(),
        };
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub vault_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, PublishError> {
        Self::from_source(&EnvSource::Process)
    }

    pub fn from_source(env: &EnvSource) -> Result<Self, PublishError> {
        let vault_url = env
            .get(VAULT_URL_VAR)
            .ok_or(PublishError::ConfigurationMissing { key: VAULT_URL_VAR })?;

        Ok(Self { vault_url })
    }
}
