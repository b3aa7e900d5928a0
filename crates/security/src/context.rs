//! [`SecurityContext`]: the explicitly constructed services shared by callers.
//!
//! Built once at startup from a validated [`SecurityConfig`] and passed by
//! value (it is cheap to clone) to whatever needs tokens or field encryption.

use std::sync::Arc;

use common::SecurityError;
use tracing::info;

use crate::config::SecurityConfig;
use crate::model::{FieldCipher, ModelRegistry};
use crate::token::{ApplicationSecret, Clock, SystemClock, TokenDeriver};

/// Token deriver, field cipher and model registry for one process.
#[derive(Clone, Debug)]
pub struct SecurityContext {
    /// Token derivation from the application secret.
    pub deriver: Arc<TokenDeriver>,
    /// Field cipher keyed by the database-scope static token.
    pub cipher: Arc<FieldCipher>,
    /// Encrypt-field declarations for dynamic records.
    pub registry: ModelRegistry,
}

impl SecurityContext {
    /// Build the context on the host clock.
    ///
    /// # Errors
    ///
    /// Returns [`SecurityError::ConfigurationMissing`] if the application
    /// secret or database hash is blank.
    pub fn from_config(cfg: &SecurityConfig) -> Result<Self, SecurityError> {
        Self::with_clock(cfg, Arc::new(SystemClock))
    }

    /// Build the context reading time from `clock`.
    pub fn with_clock(cfg: &SecurityConfig, clock: Arc<dyn Clock>) -> Result<Self, SecurityError> {
        let deriver = TokenDeriver::new(ApplicationSecret::new(cfg.app_hash.clone())?, clock);
        let cipher = FieldCipher::new(&deriver, &cfg.database_hash)?;
        let registry = ModelRegistry::from_config(cfg);
        info!(models = registry.len(), "security context initialised");
        Ok(Self {
            deriver: Arc::new(deriver),
            cipher: Arc::new(cipher),
            registry,
        })
    }
}
