//! Provider-level configuration shared by every tool.
//!
//! A [`ProviderConfig`] is built once (from a TOML file, the environment, or the builder)
//! and handed to each tool; nothing is read from globals at call time.

use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::client::AwsClient;
use crate::credentials::{resolve, AwsCredentialParams};
use crate::error::ToolError;

pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_POLL_INTERVAL_MILLIS: u64 = 5_000;
pub const DEFAULT_SESSION_TTL_SECS: u64 = 3_600;
pub const DEFAULT_SESSION_PREFIX: &str = "/browser-session";

/// Errors that can occur when loading a [`ProviderConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    credentials: AwsCredentialParams,
    #[serde(default)]
    http: HttpSection,
    #[serde(default)]
    polling: PollingSection,
    #[serde(default)]
    browser_session: BrowserSessionSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct HttpSection {
    timeout_seconds: Option<u64>,
    endpoint_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PollingSection {
    interval_millis: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct BrowserSessionSection {
    parameter_prefix: Option<String>,
    ttl_seconds: Option<u64>,
}

/// Configuration shared by all tools.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Provider-level credential defaults; per-call fields override them.
    pub credentials: AwsCredentialParams,

    /// Per-request HTTP timeout.
    pub timeout: Duration,

    /// Send all AWS traffic here instead of the regional endpoints.
    pub endpoint_url: Option<String>,

    /// Delay between status checks of long-running jobs.
    pub poll_interval: Duration,

    /// Key prefix for persisted browser session records.
    pub session_prefix: String,

    /// Time-to-live of persisted browser session records.
    pub session_ttl: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            credentials: AwsCredentialParams::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            endpoint_url: None,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MILLIS),
            session_prefix: DEFAULT_SESSION_PREFIX.to_string(),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
        }
    }
}

impl ProviderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> ProviderConfigBuilder {
        ProviderConfigBuilder::default()
    }

    /// Parse a TOML document; missing sections fall back to defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(text)?;
        let mut builder = Self::builder().credentials(file.credentials);

        if let Some(secs) = file.http.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(url) = file.http.endpoint_url {
            builder = builder.endpoint_url(url);
        }
        if let Some(millis) = file.polling.interval_millis {
            builder = builder.poll_interval(Duration::from_millis(millis));
        }
        if let Some(prefix) = file.browser_session.parameter_prefix {
            builder = builder.session_prefix(prefix);
        }
        if let Some(secs) = file.browser_session.ttl_seconds {
            builder = builder.session_ttl(Duration::from_secs(secs));
        }

        builder.build()
    }

    /// Read and parse a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Apply `AWSKIT_REGION` and `AWSKIT_ENDPOINT_URL` from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable source.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(region) = lookup("AWSKIT_REGION").filter(|v| !v.is_empty()) {
            self.credentials.aws_region = Some(region);
        }
        if let Some(url) = lookup("AWSKIT_ENDPOINT_URL").filter(|v| !v.is_empty()) {
            self.endpoint_url = Some(url);
        }
        self
    }

    /// Build an [`AwsClient`] for one invocation from the per-call credential fields.
    pub async fn client(&self, per_call: &AwsCredentialParams) -> Result<AwsClient, ToolError> {
        let resolved = resolve(per_call, &self.credentials);
        let credentials = resolved.provider().await?;

        let http = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ToolError::from(format!("Failed to create HTTP client: {}", e)))?;

        Ok(AwsClient::new(http, credentials, resolved.region).with_endpoint_url(self.endpoint_url.clone()))
    }
}

/// Builder for [`ProviderConfig`].
#[derive(Debug, Clone, Default)]
pub struct ProviderConfigBuilder {
    config: Option<ProviderConfig>,
}

impl ProviderConfigBuilder {
    fn config(&mut self) -> &mut ProviderConfig {
        self.config.get_or_insert_with(ProviderConfig::default)
    }

    pub fn credentials(mut self, credentials: AwsCredentialParams) -> Self {
        self.config().credentials = credentials;
        self
    }

    /// Provider-level static key pair
    pub fn static_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        let creds = &mut self.config().credentials;
        creds.aws_access_key_id = Some(access_key_id.into());
        creds.aws_secret_access_key = Some(secret_access_key.into());
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.config().credentials.aws_region = Some(region.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config().timeout = timeout;
        self
    }

    pub fn endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.config().endpoint_url = Some(url.into());
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config().poll_interval = interval;
        self
    }

    pub fn session_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config().session_prefix = prefix.into();
        self
    }

    pub fn session_ttl(mut self, ttl: Duration) -> Self {
        self.config().session_ttl = ttl;
        self
    }

    pub fn build(self) -> Result<ProviderConfig, ConfigError> {
        let config = self.config.unwrap_or_default();

        if config.timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "http.timeout_seconds",
                message: "must be greater than zero".into(),
            });
        }
        if !config.session_prefix.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "browser_session.parameter_prefix",
                message: format!("'{}' must start with '/'", config.session_prefix),
            });
        }
        if let Some(url) = &config.endpoint_url {
            url::Url::parse(url).map_err(|e| ConfigError::InvalidValue {
                field: "http.endpoint_url",
                message: e.to_string(),
            })?;
        }

        Ok(config)
    }
}
