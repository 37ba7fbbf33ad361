use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use url::Url;
use zeroize::Zeroize;

use crate::capabilities::ValidatedUrl;
use crate::{API_KEY_ENV, DEFAULT_GEOCODE_ENDPOINT, ENDPOINT_ENV};

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing configuration: {var} is not set")]
    MissingCredential { var: String },

    #[error("invalid API key: {reason}")]
    InvalidCredential { reason: String },

    #[error("invalid geocoding endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("address lookup is not configured")]
    NotConfigured,
}

// --- Credential: redacts Debug, zeroizes on Drop ---

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Result<Self, ConfigError> {
        let key = key.into();
        if key.is_empty() {
            return Err(ConfigError::InvalidCredential {
                reason: "key is empty".into(),
            });
        }
        if key.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(ConfigError::InvalidCredential {
                reason: "key contains whitespace or control characters".into(),
            });
        }
        Ok(Self(key))
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

impl Drop for ApiKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl TryFrom<String> for ApiKey {
    type Error = ConfigError;

    fn try_from(key: String) -> Result<Self, Self::Error> {
        Self::new(key)
    }
}

impl From<ApiKey> for String {
    fn from(key: ApiKey) -> Self {
        key.expose().to_owned()
    }
}

/// Unvalidated configuration as handed over by a shell.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Geocoder configuration shared by the lookup request and the map view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Settings", into = "Settings")]
pub struct Config {
    api_key: ApiKey,
    endpoint: Url,
}

impl Config {
    pub fn new(api_key: ApiKey, endpoint: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_key,
            endpoint: validate_endpoint(endpoint)?,
        })
    }

    /// Loads from `GOOGLE_MAPS_API_KEY` and the optional `GEOCODER_ENDPOINT`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_ENV)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingCredential {
                var: API_KEY_ENV.into(),
            })?;

        Self::try_from(Settings {
            api_key,
            endpoint: lookup(ENDPOINT_ENV).filter(|url| !url.trim().is_empty()),
        })
    }

    #[must_use]
    pub fn api_key(&self) -> &ApiKey {
        &self.api_key
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl TryFrom<Settings> for Config {
    type Error = ConfigError;

    fn try_from(settings: Settings) -> Result<Self, Self::Error> {
        let api_key = ApiKey::new(settings.api_key)?;
        let endpoint = settings
            .endpoint
            .as_deref()
            .unwrap_or(DEFAULT_GEOCODE_ENDPOINT);
        Self::new(api_key, endpoint)
    }
}

impl From<Config> for Settings {
    fn from(config: Config) -> Self {
        Self {
            api_key: config.api_key.expose().to_owned(),
            endpoint: Some(config.endpoint.to_string()),
        }
    }
}

fn validate_endpoint(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEndpoint {
        url: raw.to_owned(),
        reason,
    };

    let url = ValidatedUrl::new(raw)
        .map_err(|e| invalid(e.to_string()))?
        .into_url();

    if url
        .query_pairs()
        .any(|(name, _)| name == "address" || name == "key")
    {
        return Err(invalid(
            "endpoint must not carry 'address' or 'key' query parameters".into(),
        ));
    }

    Ok(url)
}
