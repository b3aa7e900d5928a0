//! Common error types shared across crates.

use thiserror::Error;

/// Errors raised by token derivation and field encryption.
///
/// Token *mismatch* is deliberately not represented here: a failed check is
/// an expected outcome and is reported as `false`, never as an error.
///
/// Variants map to process exit codes used by `sealctl`:
/// - [`SecurityError::ConfigurationMissing`] → 78 (`EX_CONFIG`)
/// - [`SecurityError::TransformFailure`] → 65 (`EX_DATAERR`)
/// - [`SecurityError::InvalidKey`] → 70 (`EX_SOFTWARE`)
#[derive(Debug, Error)]
pub enum SecurityError {
    /// The application secret, or a required context hash, is unset or blank.
    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),

    /// A single field of a single record could not be encrypted or decrypted.
    #[error("failed to transform field `{field}` of record `{record}`: {reason}")]
    TransformFailure {
        /// Identity of the record that owns the field.
        record: String,
        /// Name of the field that failed.
        field: String,
        /// Short, non-sensitive failure description.
        reason: String,
    },

    /// Derived key material has an unexpected shape.
    #[error("invalid key material: {0}")]
    InvalidKey(String),
}

impl SecurityError {
    /// Build a [`SecurityError::TransformFailure`] from anything displayable.
    pub fn transform(
        record: impl Into<String>,
        field: impl Into<String>,
        reason: impl std::fmt::Display,
    ) -> Self {
        SecurityError::TransformFailure {
            record: record.into(),
            field: field.into(),
            reason: reason.to_string(),
        }
    }

    /// Short machine-readable error code, safe to log.
    pub fn code(&self) -> &'static str {
        match self {
            SecurityError::ConfigurationMissing(_) => "configuration_missing",
            SecurityError::TransformFailure { .. } => "transform_failure",
            SecurityError::InvalidKey(_) => "invalid_key",
        }
    }

    /// Returns the process exit code that should be used for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            SecurityError::ConfigurationMissing(_) => 78,
            SecurityError::TransformFailure { .. } => 65,
            SecurityError::InvalidKey(_) => 70,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(SecurityError::ConfigurationMissing("x".into()).exit_code(), 78);
        assert_eq!(SecurityError::transform("users:1", "ssn", "bad tag").exit_code(), 65);
        assert_eq!(SecurityError::InvalidKey("x".into()).exit_code(), 70);
    }

    #[test]
    fn transform_failure_names_record_and_field() {
        let e = SecurityError::transform("users:42", "ssn", "aead operation failed");
        let msg = e.to_string();
        assert!(msg.contains("users:42"));
        assert!(msg.contains("`ssn`"));
        assert_eq!(e.code(), "transform_failure");
    }

    #[test]
    fn display_includes_message() {
        let e = SecurityError::ConfigurationMissing("APP_HASH".into());
        assert!(e.to_string().contains("APP_HASH"));
    }
}
