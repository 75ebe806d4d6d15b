//! Configuration module for pamgate.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::gate::SERVICE_NAME;
use crate::oracle::PolicyOutcome;
use crate::{GateError, Result};

/// Policy oracle backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// System PAM stack (requires the `pam` feature).
    Pam,
    /// In-memory account table from `[policy.accounts]`.
    Table,
}

impl Default for Backend {
    /// `pam` when libpam is linked in, `table` otherwise.
    fn default() -> Self {
        if cfg!(feature = "pam") {
            Backend::Pam
        } else {
            Backend::Table
        }
    }
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Pam => "pam",
            Backend::Table => "table",
        }
    }
}

/// Policy oracle configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    /// Which oracle answers account checks.
    #[serde(default)]
    pub backend: Backend,
    /// Service identity every session is opened under.
    #[serde(default = "default_service")]
    pub service: String,
    /// Table backend: username -> outcome name or code.
    #[serde(default)]
    pub accounts: HashMap<String, String>,
    /// Table backend: outcome for accounts not listed.
    #[serde(default = "default_outcome")]
    pub default_outcome: String,
    /// Table backend: simulate an oracle that cannot start.
    #[serde(default)]
    pub fail_init: bool,
}

fn default_service() -> String {
    SERVICE_NAME.to_string()
}

fn default_outcome() -> String {
    "unknown".to_string()
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            service: default_service(),
            accounts: HashMap::new(),
            default_outcome: default_outcome(),
            fail_init: false,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file. Empty logs to the console only.
    #[serde(default)]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: String::new(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Policy oracle configuration.
    #[serde(default)]
    pub policy: PolicyConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(GateError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| GateError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `PAMGATE_SERVICE`: Override the service identity
    /// - `PAMGATE_LOG_LEVEL`: Override the log level
    pub fn apply_env_overrides(&mut self) {
        if let Ok(service) = std::env::var("PAMGATE_SERVICE") {
            if !service.is_empty() {
                self.policy.service = service;
            }
        }
        if let Ok(level) = std::env::var("PAMGATE_LOG_LEVEL") {
            if !level.is_empty() {
                self.logging.level = level;
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - The service identity is empty or contains a NUL byte
    /// - A table outcome does not parse
    /// - The pam backend is selected but the `pam` feature is not built
    pub fn validate(&self) -> Result<()> {
        let service = &self.policy.service;
        if service.trim().is_empty() {
            return Err(GateError::Validation(
                "policy.service must not be empty".to_string(),
            ));
        }
        if service.contains('\0') {
            return Err(GateError::Validation(
                "policy.service must not contain NUL bytes".to_string(),
            ));
        }

        if PolicyOutcome::parse(&self.policy.default_outcome).is_none() {
            return Err(GateError::Validation(format!(
                "policy.default_outcome is not a known outcome: {}",
                self.policy.default_outcome
            )));
        }
        for (username, value) in &self.policy.accounts {
            if PolicyOutcome::parse(value).is_none() {
                return Err(GateError::Validation(format!(
                    "policy.accounts.{username} is not a known outcome: {value}"
                )));
            }
        }

        if self.policy.backend == Backend::Pam && !cfg!(feature = "pam") {
            return Err(GateError::Validation(
                "policy.backend = \"pam\" requires building with the `pam` feature".to_string(),
            ));
        }

        Ok(())
    }
}
