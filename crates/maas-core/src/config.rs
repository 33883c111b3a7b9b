//! Configuration for MAAS controller clients.
//!
//! [`MaasClientConfig`] is the serializable, validated description of how to
//! reach a MAAS region controller. It converts into the lower level
//! [`ClientConfig`] used to build the HTTP client.

use crate::client::{ClientConfig, RetryPolicy, MAAS_DEFAULT_TIMEOUT};
use crate::version::ApiVersion;
use crate::Error;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;
use validator::Validate;

/// Configuration for a MAAS controller client.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MaasClientConfig {
    /// Base URL of the MAAS server, e.g. `http://maas.example.com:5240/MAAS/`
    #[validate(url)]
    pub base_url: String,

    /// API version to speak, e.g. "2.0"
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Request timeout in seconds
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Maximum number of retry attempts
    #[validate(range(min = 0, max = 10))]
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Whether to request compressed responses
    #[serde(default = "default_enable_compression")]
    pub enable_compression: bool,
}

fn default_api_version() -> String {
    "2.0".to_string()
}

const fn default_request_timeout_secs() -> u64 {
    MAAS_DEFAULT_TIMEOUT
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_enable_compression() -> bool {
    true
}

impl MaasClientConfig {
    /// Create a new configuration for the given base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn new(base_url: impl Into<String>) -> Result<Self, Error> {
        let config = Self {
            base_url: base_url.into(),
            api_version: default_api_version(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            enable_compression: default_enable_compression(),
        };

        config.validate().map_err(|e| {
            Error::ConfigError(format!("Invalid configuration: {e}"))
        })?;

        Ok(config)
    }

    /// Set the API version to speak.
    #[must_use]
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Set request timeout in seconds.
    #[must_use]
    pub const fn with_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// Set maximum retry attempts.
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Enable or disable compression.
    #[must_use]
    pub const fn with_compression(mut self, enabled: bool) -> Self {
        self.enable_compression = enabled;
        self
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Parse the configured API version.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the version string is malformed.
    pub fn parse_api_version(&self) -> Result<ApiVersion, Error> {
        ApiVersion::parse(&self.api_version)
            .map_err(|e| Error::ConfigError(format!("Invalid API version: {e}")))
    }

    /// Parse the base URL, normalised to end with `/` so relative API paths
    /// join beneath it.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn parse_base_url(&self) -> Result<Url, Error> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| Error::ConfigError(format!("Invalid MAAS URL: {e}")))?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    /// Validate and convert into HTTP client settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if validation fails.
    pub fn client_config(&self) -> Result<ClientConfig, Error> {
        self.validate()?;
        Ok(ClientConfig::new()
            .with_timeout(self.timeout())
            .with_retry_policy(RetryPolicy::new().with_max_retries(self.max_retries))
            .with_compression(self.enable_compression))
    }
}

impl Default for MaasClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5240/MAAS/".to_string(),
            api_version: default_api_version(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            enable_compression: default_enable_compression(),
        }
    }
}
