//! Upload client configuration.
//!
//! The config can be built programmatically ([`UploaderConfig::new`]) or
//! parsed from TOML ([`UploaderConfig::from_toml_str`]). Either way it is
//! validated eagerly, before any transport is constructed: a missing
//! credential or target bucket is the one failure that interrupts
//! synchronous control flow.

use serde::{Deserialize, Serialize};

/// Storage region used when none is configured.
pub const DEFAULT_REGION: &str = "us-west-2";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required config field: {0}")]
    MissingField(&'static str),
    #[error("config field {0} must be greater than zero")]
    InvalidValue(&'static str),
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Credentials, target bucket and retry tuning for one uploader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploaderConfig {
    /// Access key for the storage account.
    pub key: String,
    /// Secret for the storage account.
    pub secret: String,
    /// Destination bucket.
    pub bucket: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Retry ceiling: total attempts issued before an upload fails terminally.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base unit multiplied into every backoff delay, in milliseconds.
    #[serde(default = "default_backoff_interval_ms")]
    pub backoff_interval_ms: u64,
}

impl UploaderConfig {
    /// Config with the given credentials/bucket and default tuning.
    pub fn new(
        key: impl Into<String>,
        secret: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
            bucket: bucket.into(),
            region: default_region(),
            max_retries: default_max_retries(),
            backoff_interval_ms: default_backoff_interval_ms(),
        }
    }

    /// Parse and validate a TOML config document.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configs that cannot produce a working uploader.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.key.trim().is_empty() {
            return Err(ConfigError::MissingField("key"));
        }
        if self.secret.trim().is_empty() {
            return Err(ConfigError::MissingField("secret"));
        }
        if self.bucket.trim().is_empty() {
            return Err(ConfigError::MissingField("bucket"));
        }
        if self.max_retries == 0 {
            return Err(ConfigError::InvalidValue("max_retries"));
        }
        if self.backoff_interval_ms == 0 {
            return Err(ConfigError::InvalidValue("backoff_interval_ms"));
        }
        Ok(())
    }
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_interval_ms() -> u64 {
    51
}
