use std::path::Path;
use std::time::Duration;

use ::config::{Config, Environment, File, FileFormat};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::cart::PricingConfig;
use crate::utils::RetryConfig;

// ============================================================================
// Configuration
// ============================================================================
//
// Sources, lowest precedence first:
// 1. Built-in defaults (every field has one)
// 2. Optional TOML file (`commerce.toml` unless a path is given)
// 3. Environment: COMMERCE__SECTION__KEY, e.g.
//    COMMERCE__PRICING__FREE_DELIVERY_THRESHOLD=800
//
// ============================================================================

const ENV_PREFIX: &str = "COMMERCE";
const DEFAULT_FILE: &str = "commerce";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommerceConfig {
    pub pricing: PricingConfig,
    pub submission_retry: SubmissionRetrySettings,
    pub status_sync: StatusSyncSettings,
}

/// Backoff for transient order-submission failures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionRetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for SubmissionRetrySettings {
    fn default() -> Self {
        let retry = RetryConfig::default();
        Self {
            max_attempts: retry.max_attempts,
            initial_delay_ms: retry.initial_delay.as_millis() as u64,
            max_delay_ms: retry.max_delay.as_millis() as u64,
            multiplier: retry.multiplier,
        }
    }
}

impl SubmissionRetrySettings {
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            multiplier: self.multiplier,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusSyncSettings {
    pub enabled: bool,
}

impl Default for StatusSyncSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl CommerceConfig {
    /// Load from an optional file plus environment overrides, then validate
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).format(FileFormat::Toml).required(true),
            None => File::with_name(DEFAULT_FILE).format(FileFormat::Toml).required(false),
        };

        let config: CommerceConfig = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        tracing::debug!(config = ?config, "Configuration loaded");
        Ok(config)
    }

    /// Parse a TOML document on top of the defaults
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: CommerceConfig = Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pricing.base_delivery_fee < Decimal::ZERO {
            return Err(ConfigError::Invalid("pricing.base_delivery_fee must not be negative".into()));
        }
        if self.pricing.free_delivery_threshold < Decimal::ZERO {
            return Err(ConfigError::Invalid(
                "pricing.free_delivery_threshold must not be negative".into(),
            ));
        }
        if self.submission_retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("submission_retry.max_attempts must be at least 1".into()));
        }
        let multiplier = self.submission_retry.multiplier;
        if multiplier.is_nan() || multiplier < 1.0 {
            return Err(ConfigError::Invalid("submission_retry.multiplier must be >= 1.0".into()));
        }
        Ok(())
    }

    pub fn retry_config(&self) -> RetryConfig {
        self.submission_retry.to_retry_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = CommerceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pricing.base_delivery_fee, Decimal::from(50));
        assert_eq!(config.pricing.free_delivery_threshold, Decimal::from(1000));
        assert!(config.status_sync.enabled);
        assert_eq!(config.retry_config(), RetryConfig::default());
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = CommerceConfig::from_toml(
            r#"
            [pricing]
            free_delivery_threshold = 600

            [status_sync]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.pricing.free_delivery_threshold, Decimal::from(600));
        assert_eq!(config.pricing.base_delivery_fee, Decimal::from(50));
        assert!(!config.status_sync.enabled);
        assert_eq!(config.submission_retry.max_attempts, 3);
    }

    #[test]
    fn test_retry_settings_convert_to_durations() {
        let config = CommerceConfig::from_toml(
            r#"
            [submission_retry]
            max_attempts = 5
            initial_delay_ms = 10
            max_delay_ms = 100
            "#,
        )
        .unwrap();

        let retry = config.retry_config();
        assert_eq!(retry.max_attempts, 5);
        assert_eq!(retry.initial_delay, Duration::from_millis(10));
        assert_eq!(retry.max_delay, Duration::from_millis(100));
    }

    #[test]
    fn test_negative_fee_rejected() {
        let result = CommerceConfig::from_toml(
            r#"
            [pricing]
            base_delivery_fee = -5
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut config = CommerceConfig::default();
        config.submission_retry.max_attempts = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
