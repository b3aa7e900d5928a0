//! [`ApplicationSecret`]: the process-wide root of every derived token.

use common::SecurityError;
use zeroize::Zeroize;

/// The application hash loaded from configuration at startup.
///
/// Construction fails on a blank value, so a deriver can never be built on
/// top of an empty secret.
pub struct ApplicationSecret(Vec<u8>);

impl ApplicationSecret {
    /// Wrap a configured secret.
    ///
    /// # Errors
    ///
    /// Returns [`SecurityError::ConfigurationMissing`] if `value` is empty or
    /// whitespace only.
    pub fn new(value: impl Into<String>) -> Result<Self, SecurityError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(SecurityError::ConfigurationMissing(
                "application secret (APP_HASH) is unset".into(),
            ));
        }
        Ok(Self(value.into_bytes()))
    }

    pub(crate) fn expose(&self) -> &[u8] {
        &self.0
    }
}

impl Zeroize for ApplicationSecret {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

impl Drop for ApplicationSecret {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl std::fmt::Debug for ApplicationSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApplicationSecret([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_secret_rejected() {
        for blank in ["", "   ", "\n\t"] {
            let err = ApplicationSecret::new(blank).unwrap_err();
            assert!(matches!(err, SecurityError::ConfigurationMissing(_)));
        }
    }

    #[test]
    fn secret_redacted_in_debug() {
        let secret = ApplicationSecret::new("app-secret").unwrap();
        let shown = format!("{secret:?}");
        assert!(!shown.contains("app-secret"));
        assert!(shown.contains("REDACTED"));
    }

    #[test]
    fn zeroize_wipes_secret() {
        let mut secret = ApplicationSecret::new("app-secret").unwrap();
        secret.zeroize();
        assert!(secret.expose().iter().all(|b| *b == 0));
    }
}
