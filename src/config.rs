//! Codec configuration.
//!
//! All values have working defaults; a TOML file can override them for
//! deployments that tune frame geometry or decode parallelism.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for encoding runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Attempt gzip compression before splitting.
    pub compression: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self { compression: true }
    }
}

/// Configuration for batch decoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFileConfig {
    /// Concurrency window size.
    pub max_concurrency: usize,
    /// Per-frame decode deadline in milliseconds.
    pub timeout_ms: u64,
    /// Drop failed frames from the output.
    pub skip_invalid: bool,
}

impl Default for BatchFileConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            timeout_ms: 5000,
            skip_invalid: true,
        }
    }
}

impl BatchFileConfig {
    /// Converts to runtime batch options.
    pub fn to_options(&self) -> crate::decode::BatchOptions {
        crate::decode::BatchOptions {
            max_concurrency: self.max_concurrency,
            timeout_ms: self.timeout_ms,
            skip_invalid: self.skip_invalid,
        }
    }
}

/// Configuration file errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// `max_concurrency` was zero.
    #[error("invalid concurrency (must be at least 1)")]
    InvalidConcurrency,
    /// `timeout_ms` was zero.
    #[error("invalid timeout (must be nonzero)")]
    InvalidTimeout,
    /// The configuration file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// The configuration file was not valid TOML.
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Encoding settings.
    #[serde(default)]
    pub codec: CodecConfig,
    /// Batch decoding settings.
    #[serde(default)]
    pub batch: BatchFileConfig,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        let config: FileConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch.max_concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency);
        }
        if self.batch.timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(FileConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_concurrency_invalid() {
        let mut config = FileConfig::default();
        config.batch.max_concurrency = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidConcurrency)
        ));
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: FileConfig = toml::from_str("[batch]\nmax_concurrency = 8\ntimeout_ms = 1000\nskip_invalid = false\n").unwrap();
        assert_eq!(config.batch.max_concurrency, 8);
        assert!(config.codec.compression); // default section
    }
}
