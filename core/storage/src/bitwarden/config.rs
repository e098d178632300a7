//! Bitwarden connection settings.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;
use zeroize::Zeroizing;

use vaultbridge_common::{Error, Result};

/// Public Bitwarden cloud endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://api.bitwarden.com";
/// Default request budget per minute.
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 60;
/// Default number of retries for failed requests.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

pub const ENV_API_BASE_URL: &str = "BITWARDEN_API_BASE_URL";
pub const ENV_CLIENT_ID: &str = "BITWARDEN_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "BITWARDEN_CLIENT_SECRET";
pub const ENV_ORGANIZATION_ID: &str = "BITWARDEN_ORGANIZATION_ID";
pub const ENV_REQUESTS_PER_MINUTE: &str = "BITWARDEN_REQUESTS_PER_MINUTE";
pub const ENV_MAX_RETRIES: &str = "BITWARDEN_MAX_RETRIES";

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_requests_per_minute() -> u32 {
    DEFAULT_REQUESTS_PER_MINUTE
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

/// Client-credentials configuration for the Bitwarden API.
#[derive(Clone, Serialize, Deserialize)]
pub struct BitwardenConfig {
    /// Base URL; the token endpoint and `/api` live under it.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    pub client_id: String,
    /// Never serialized.
    #[serde(skip_serializing)]
    pub client_secret: Zeroizing<String>,
    /// Attached to created items when set.
    #[serde(default)]
    pub organization_id: Option<String>,
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl BitwardenConfig {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            api_base_url: default_api_base_url(),
            client_id: client_id.into(),
            client_secret: Zeroizing::new(client_secret.into()),
            organization_id: None,
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Build a configuration from a variable lookup such as `std::env::var`.
    ///
    /// # Errors
    /// - `InvalidInput` if the client id or secret is missing, or a numeric
    ///   setting does not parse
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| {
                Error::InvalidInput(format!("{} environment variable is required", key))
            })
        };
        let number = |key: &str, default: u32| -> Result<u32> {
            match get(key) {
                Some(v) => v.trim().parse().map_err(|_| {
                    Error::InvalidInput(format!(
                        "{} must be a non-negative integer, got '{}'",
                        key, v
                    ))
                }),
                None => Ok(default),
            }
        };

        let config = Self {
            api_base_url: get(ENV_API_BASE_URL).unwrap_or_else(default_api_base_url),
            client_id: required(ENV_CLIENT_ID)?,
            client_secret: Zeroizing::new(required(ENV_CLIENT_SECRET)?),
            organization_id: get(ENV_ORGANIZATION_ID),
            requests_per_minute: number(ENV_REQUESTS_PER_MINUTE, DEFAULT_REQUESTS_PER_MINUTE)?,
            max_retries: number(ENV_MAX_RETRIES, DEFAULT_MAX_RETRIES)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_organization_id(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }

    pub fn with_requests_per_minute(mut self, requests_per_minute: u32) -> Self {
        self.requests_per_minute = requests_per_minute;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Parsed base URL.
    pub fn base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.api_base_url).map_err(|e| {
            Error::InvalidInput(format!("Invalid API base URL '{}': {}", self.api_base_url, e))
        })?;
        if url.cannot_be_a_base() {
            return Err(Error::InvalidInput(format!(
                "API base URL '{}' cannot be a base",
                self.api_base_url
            )));
        }
        Ok(url)
    }

    /// Check the configuration before any request is made.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(Error::InvalidInput("client id is required".to_string()));
        }
        if self.client_secret.trim().is_empty() {
            return Err(Error::InvalidInput("client secret is required".to_string()));
        }
        self.base_url().map(|_| ())
    }
}

impl fmt::Debug for BitwardenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitwardenConfig")
            .field("api_base_url", &self.api_base_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("organization_id", &self.organization_id)
            .field("requests_per_minute", &self.requests_per_minute)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = BitwardenConfig::from_lookup(lookup(&[
            (ENV_CLIENT_ID, "organization.abc"),
            (ENV_CLIENT_SECRET, "s3cret"),
        ]))
        .unwrap();

        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.client_id, "organization.abc");
        assert_eq!(config.client_secret.as_str(), "s3cret");
        assert_eq!(config.organization_id, None);
        assert_eq!(config.requests_per_minute, DEFAULT_REQUESTS_PER_MINUTE);
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = BitwardenConfig::from_lookup(lookup(&[
            (ENV_API_BASE_URL, "https://vault.example.com"),
            (ENV_CLIENT_ID, "id"),
            (ENV_CLIENT_SECRET, "secret"),
            (ENV_ORGANIZATION_ID, "org-1"),
            (ENV_REQUESTS_PER_MINUTE, "120"),
            (ENV_MAX_RETRIES, "0"),
        ]))
        .unwrap();

        assert_eq!(config.api_base_url, "https://vault.example.com");
        assert_eq!(config.organization_id.as_deref(), Some("org-1"));
        assert_eq!(config.requests_per_minute, 120);
        assert_eq!(config.max_retries, 0);
    }

    #[test]
    fn test_missing_credentials() {
        let err = BitwardenConfig::from_lookup(lookup(&[(ENV_CLIENT_ID, "id")])).unwrap_err();
        assert!(err.to_string().contains(ENV_CLIENT_SECRET));

        let err = BitwardenConfig::from_lookup(lookup(&[(ENV_CLIENT_SECRET, "s")])).unwrap_err();
        assert!(err.to_string().contains(ENV_CLIENT_ID));
    }

    #[test]
    fn test_invalid_values() {
        let result = BitwardenConfig::from_lookup(lookup(&[
            (ENV_CLIENT_ID, "id"),
            (ENV_CLIENT_SECRET, "secret"),
            (ENV_MAX_RETRIES, "many"),
        ]));
        assert!(matches!(result, Err(Error::InvalidInput(_))));

        let config = BitwardenConfig::new("id", "secret").with_api_base_url("not a url");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_secret_redacted() {
        let config = BitwardenConfig::new("id", "hunter2");
        assert!(!format!("{:?}", config).contains("hunter2"));

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(json.contains("\"client_id\":\"id\""));
    }
}
