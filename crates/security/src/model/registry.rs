//! Encrypt-field declarations for dynamic records, keyed by model name.
//!
//! Typed models declare their fields in code via
//! [`Model::encrypt_fields`](super::Model::encrypt_fields). Rows that only
//! exist as JSON (exports, batch jobs) look their fields up here instead.

use std::{collections::HashMap, sync::Arc};

use thiserror::Error;

use crate::config::SecurityConfig;

/// Errors from the model registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The requested model has no entry in the registry.
    #[error("unknown model: {0}")]
    UnknownModel(String),
}

/// Shared, read-only map of model name to encrypt fields.
#[derive(Clone, Debug, Default)]
pub struct ModelRegistry {
    inner: Arc<HashMap<String, Arc<[String]>>>,
}

impl ModelRegistry {
    /// Create a new, empty [`ModelRegistry`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from `(model, fields)` pairs.
    pub fn from_entries<I, N, F>(entries: I) -> Self
    where
        I: IntoIterator<Item = (N, F)>,
        N: Into<String>,
        F: IntoIterator,
        F::Item: Into<String>,
    {
        let map = entries
            .into_iter()
            .map(|(name, fields)| {
                let fields: Arc<[String]> = fields.into_iter().map(Into::into).collect();
                (name.into(), fields)
            })
            .collect();
        Self {
            inner: Arc::new(map),
        }
    }

    /// Build a registry from the `models` section of the configuration.
    pub fn from_config(cfg: &SecurityConfig) -> Self {
        Self::from_entries(
            cfg.models
                .iter()
                .map(|(name, m)| (name.clone(), m.encrypt_fields.clone())),
        )
    }

    /// Return the number of registered models.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Return `true` if no models are registered.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Look up the encrypt fields of `model`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownModel`] if `model` is not registered.
    pub fn get(&self, model: &str) -> Result<Arc<[String]>, RegistryError> {
        self.inner
            .get(model)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownModel(model.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;

    #[test]
    fn initially_empty() {
        let registry = ModelRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn unknown_model_returns_error() {
        let registry = ModelRegistry::from_entries([("users", vec!["ssn"])]);
        assert!(matches!(
            registry.get("orders"),
            Err(RegistryError::UnknownModel(m)) if m == "orders"
        ));
    }

    #[test]
    fn built_from_config() {
        let mut models = HashMap::new();
        models.insert(
            "users".to_owned(),
            ModelConfig {
                encrypt_fields: vec!["ssn".into(), "email".into()],
            },
        );
        models.insert("pages".to_owned(), ModelConfig::default());
        let cfg = SecurityConfig {
            app_hash: "app-secret".into(),
            database_hash: "db-scope-1".into(),
            log_level: "info".into(),
            log_format: "json".into(),
            models,
        };

        let registry = ModelRegistry::from_config(&cfg);
        assert_eq!(registry.len(), 2);
        assert_eq!(&*registry.get("users").unwrap(), ["ssn", "email"]);
        assert!(registry.get("pages").unwrap().is_empty());
    }
}
