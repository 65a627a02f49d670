//! Configuration loader implementation

use crate::schema::Config;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use std::path::Path;
use types::ConfigError;

/// Prefix of environment variables overriding the configuration file
pub const ENV_PREFIX: &str = "STAKE_DRAFTER_";

/// Configuration loader that handles YAML files and environment variables
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Config> {
        let config_path = config_path.as_ref();

        if !config_path.exists() {
            return Err(ConfigError::FileNotFound {
                path: config_path.display().to_string(),
            }
            .into());
        }

        let config: Config = Self::figment(Figment::new().merge(Yaml::file(config_path)))
            .extract()
            .context("Failed to parse configuration")?;

        Self::validate(&config)?;

        Ok(config)
    }

    /// Load configuration from defaults and environment variables only
    pub fn load_from_env() -> Result<Config> {
        let config: Config = Self::figment(Figment::new())
            .extract()
            .context("Failed to parse configuration from environment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from string (for testing)
    pub fn load_from_str(yaml_content: &str) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Yaml::string(yaml_content))
            .extract()
            .context("Failed to parse configuration from string")?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn figment(base: Figment) -> Figment {
        base
            // Override with environment variables, e.g. STAKE_DRAFTER_NETWORK__NODE_URL
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Env::raw().only(&["RUST_LOG"]).map(|_| "logging.level".into()))
    }

    /// Reject configurations nothing downstream can work with
    fn validate(config: &Config) -> Result<()> {
        if config.network.currency_id.is_empty() {
            return Err(ConfigError::MissingField {
                field: "network.currency_id".to_string(),
            }
            .into());
        }

        if config.network.denom.is_empty() {
            return Err(ConfigError::MissingField {
                field: "network.denom".to_string(),
            }
            .into());
        }

        if config.network.account_prefix.is_empty() || config.network.validator_prefix.is_empty() {
            return Err(ConfigError::ValidationError {
                field: "network".to_string(),
                message: "Address prefixes cannot be empty".to_string(),
            }
            .into());
        }

        if let Some(ref node_url) = config.network.node_url {
            if !node_url.starts_with("http://") && !node_url.starts_with("https://") {
                return Err(ConfigError::InvalidValue {
                    field: "network.node_url".to_string(),
                    value: node_url.clone(),
                }
                .into());
            }
        }

        if config.network.request_timeout_seconds == 0 {
            return Err(ConfigError::ValidationError {
                field: "network.request_timeout_seconds".to_string(),
                message: "Timeout must be greater than 0".to_string(),
            }
            .into());
        }

        config
            .protocol_params()
            .map_err(|e| ConfigError::ValidationError {
                field: "protocol".to_string(),
                message: e,
            })?;

        config
            .fees
            .schedule
            .parse_prices()
            .map_err(|e| ConfigError::ValidationError {
                field: "fees.schedule".to_string(),
                message: e,
            })?;

        if config.fees.cache_size == 0 {
            return Err(ConfigError::ValidationError {
                field: "fees.cache_size".to_string(),
                message: "Cache size cannot be 0".to_string(),
            }
            .into());
        }

        if config.drafting.batch_size == 0 {
            return Err(ConfigError::ValidationError {
                field: "drafting.batch_size".to_string(),
                message: "Batch size cannot be 0".to_string(),
            }
            .into());
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::ValidationError {
                field: "logging.format".to_string(),
                message: format!(
                    "Invalid log format: {}. Valid formats: {:?}",
                    config.logging.format, valid_log_formats
                ),
            }
            .into());
        }

        Ok(())
    }

    /// Get default configuration
    pub fn default() -> Config {
        Config::default()
    }

    /// Create example configuration file
    pub fn create_example<P: AsRef<Path>>(path: P) -> Result<()> {
        let config = Self::default();
        let yaml_content = serde_yaml::to_string(&config)
            .context("Failed to serialize default configuration")?;

        std::fs::write(path.as_ref(), yaml_content)
            .context("Failed to write example configuration file")?;

        Ok(())
    }
}
