//! Configuration loading and validation.
//!
//! Values come from an optional TOML file, then environment variables, with
//! the environment winning. A missing or blank `APP_HASH` / `DATABASE_HASH`
//! stops startup; there is no fallback secret.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use common::SecurityError;
use serde::Deserialize;

/// Validated security configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// Application secret, root of every derived token. **Required.**
    #[serde(default)]
    pub app_hash: String,

    /// Database-scope context hash keying field encryption. **Required.**
    #[serde(default)]
    pub database_hash: String,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format: `"json"` or `"pretty"`.
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Encrypt-field declarations for dynamic records, keyed by model name.
    #[serde(default)]
    pub models: HashMap<String, ModelConfig>,
}

/// Per-model settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelConfig {
    /// Columns stored encrypted at rest.
    #[serde(default)]
    pub encrypt_fields: Vec<String>,
}

fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "json".into()
}

impl SecurityConfig {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Load `file` (if given), overlay environment variables, and validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if a
    /// required value is absent. Missing secrets surface as
    /// [`SecurityError::ConfigurationMissing`] in the error chain.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let cfg = builder
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration")?;

        let c: SecurityConfig = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    pub fn validate(&self) -> Result<(), SecurityError> {
        ensure_non_empty(&self.app_hash, "APP_HASH")?;
        ensure_non_empty(&self.database_hash, "DATABASE_HASH")?;

        if !matches!(self.log_format.as_str(), "json" | "pretty") {
            return Err(SecurityError::ConfigurationMissing(format!(
                "LOG_FORMAT must be `json` or `pretty`, got `{}`",
                self.log_format
            )));
        }
        for (model, settings) in &self.models {
            if settings.encrypt_fields.iter().any(|f| f.trim().is_empty()) {
                return Err(SecurityError::ConfigurationMissing(format!(
                    "model `{model}` declares a blank encrypt field"
                )));
            }
        }
        Ok(())
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<(), SecurityError> {
    if value.trim().is_empty() {
        return Err(SecurityError::ConfigurationMissing(format!(
            "{name} is required and must not be empty"
        )));
    }
    Ok(())
}
