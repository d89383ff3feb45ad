//! Configuration management for memberdesk
//!
//! Environment- and file-based configuration with defaults and validation.
//! Environment variables follow the pattern `MEMBERDESK_<SECTION>_<KEY>`.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

mod error;
mod feature_flags;

pub use error::ConfigError;
pub use feature_flags::FeatureFlags;

use crate::logging::LogLevel;

/// Default console address used in password reset mails
pub const DEFAULT_CONSOLE_WEB_URL: &str = "https://dify.ai";

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote member service connection
    pub service: ServiceConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Feature flags
    pub features: FeatureFlags,

    /// Mail settings
    pub mail: MailConfig,
}

/// Remote member service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL of the console API, without trailing slash
    pub base_url: String,

    /// Bearer token sent with every request
    pub api_token: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include timestamps
    pub with_timestamp: bool,

    /// Include target module
    pub with_target: bool,
}

/// Mail configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// Console link placed in password reset mails
    pub console_web_url: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5001/console/api".to_string(),
            api_token: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_timestamp: true,
            with_target: true,
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            console_web_url: DEFAULT_CONSOLE_WEB_URL.to_string(),
        }
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool, ConfigError> {
    value
        .parse()
        .map_err(|e| ConfigError::InvalidValue(format!("Invalid {} flag: {}", name, e)))
}

impl Config {
    /// Load configuration from environment variables on top of the defaults
    ///
    /// Example: `MEMBERDESK_SERVICE_BASE_URL=https://cloud.example.com/console/api`
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay environment variables onto this configuration
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(|key| env::var(key).ok())
    }

    fn apply_vars<F>(&mut self, var: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Service config
        if let Some(url) = var("MEMBERDESK_SERVICE_BASE_URL") {
            self.service.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(token) = var("MEMBERDESK_SERVICE_API_TOKEN") {
            self.service.api_token = Some(token);
        }

        // Logging config
        if let Some(level) = var("MEMBERDESK_LOGGING_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = var("MEMBERDESK_LOGGING_JSON_FORMAT") {
            self.logging.json_format = parse_flag("JSON", &json)?;
        }
        if let Some(timestamp) = var("MEMBERDESK_LOGGING_WITH_TIMESTAMP") {
            self.logging.with_timestamp = parse_flag("timestamp", &timestamp)?;
        }
        if let Some(target) = var("MEMBERDESK_LOGGING_WITH_TARGET") {
            self.logging.with_target = parse_flag("target", &target)?;
        }

        // Feature flags
        if let Some(enabled) = var("MEMBERDESK_FEATURES_DATASET_OPERATOR_ENABLED") {
            self.features.dataset_operator_enabled = parse_flag("dataset operator", &enabled)?;
        }

        // Mail config
        if let Some(url) = var("MEMBERDESK_MAIL_CONSOLE_WEB_URL") {
            self.mail.console_web_url = url;
        }

        Ok(())
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::FileReadError(e.to_string()))?;

        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.service.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "service.base_url must not be empty".to_string(),
            ));
        }
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::ValidationFailed(format!(
                "service.base_url must be an http(s) URL: {}",
                base_url
            )));
        }

        if LogLevel::from_str(&self.logging.level).is_none() {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, contents).map_err(|e| ConfigError::FileWriteError(e.to_string()))?;

        Ok(())
    }
}
