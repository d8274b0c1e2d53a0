//! Settings for bootstrapping a commander.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable overriding [`CommanderSettings::initialize_singletons`].
pub const ENV_INITIALIZE_SINGLETONS: &str = "COMMANDER_INITIALIZE_SINGLETONS";

/// Environment variable overriding [`CommanderSettings::log_level`].
pub const ENV_LOG_LEVEL: &str = "COMMANDER_LOG_LEVEL";

/// Error raised when settings cannot be read.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings document is not valid JSON for these settings.
    #[error("Invalid settings document: {0}")]
    Parse(#[from] serde_json::Error),

    /// An environment variable holds a value that cannot be parsed.
    #[error("Invalid value '{value}' for {key}")]
    InvalidValue {
        /// The variable name.
        key: String,
        /// The rejected value.
        value: String,
    },
}

/// Bootstrap settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommanderSettings {
    /// Construct every singleton once at bootstrap.
    #[serde(default = "default_initialize_singletons")]
    pub initialize_singletons: bool,
    /// Default log filter, used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit logs as JSON lines.
    #[serde(default)]
    pub json_logs: bool,
}

fn default_initialize_singletons() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for CommanderSettings {
    fn default() -> Self {
        Self {
            initialize_singletons: default_initialize_singletons(),
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

impl CommanderSettings {
    /// Creates settings with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses settings from a JSON document. Missing fields take their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` if the document is malformed.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads settings from the environment, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a boolean variable is not
    /// `true`/`false`/`1`/`0`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut settings = Self::default();

        if let Some(value) = lookup(ENV_INITIALIZE_SINGLETONS) {
            settings.initialize_singletons = parse_bool(ENV_INITIALIZE_SINGLETONS, &value)?;
        }
        if let Some(value) = lookup(ENV_LOG_LEVEL) {
            settings.log_level = value;
        }

        Ok(settings)
    }

    /// Sets whether singletons are constructed at bootstrap.
    #[must_use]
    pub fn with_initialize_singletons(mut self, initialize: bool) -> Self {
        self.initialize_singletons = initialize;
        self
    }

    /// Sets the default log filter.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Sets JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
