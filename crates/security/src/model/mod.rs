//! Transparent per-field encryption for persisted records.
//!
//! A [`Model`] declares which of its fields are stored encrypted. The
//! [`FieldCipher`] seals those fields right before a write and opens them right
//! after a load, so outside the storage boundary every field is plaintext.
//!
//! # Module invariants
//!
//! - A model with no declared encrypt fields never touches the cipher.
//! - Absent and null fields are skipped, never reported.
//! - A record is transformed all-or-nothing: new values are computed for every
//!   field first and only written back once all of them succeed.
//! - A failed open is a [`SecurityError::TransformFailure`] naming the record
//!   and field; ciphertext is never handed back as plaintext.

pub mod hooks;
pub mod query;
pub mod record_line;
pub mod registry;
pub mod repository;

use std::borrow::Cow;

use common::SecurityError;
use tracing::debug;

use crate::crypto::{cipher, CipherError, KeyBytes};
use crate::token::TokenDeriver;

pub use hooks::{after_load, after_load_all, before_persist, AfterLoad};
pub use query::{inject_active, FindParameters};
pub use registry::{ModelRegistry, RegistryError};
pub use repository::{Persistence, Repository, RepositoryError};

/// Named scalar field access on a stored entity.
pub trait Record {
    /// Identity used in error reports, e.g. `"users:42"`.
    fn identity(&self) -> String;

    /// Current value of `name`, or `None` if the field is absent or null.
    fn field(&self, name: &str) -> Option<Cow<'_, str>>;

    /// Overwrite `name` with `value`. Unknown names are ignored.
    fn set_field(&mut self, name: &str, value: String);

    /// Text sealed when `name` is encrypted. Defaults to [`field`](Self::field).
    fn plaintext(&self, name: &str) -> Option<Cow<'_, str>> {
        self.field(name)
    }

    /// Store the opened text of `name`. Defaults to
    /// [`set_field`](Self::set_field).
    fn set_plaintext(&mut self, name: &str, value: String) {
        self.set_field(name, value);
    }
}

/// A record type managed by the persistence layer.
pub trait Model: Record + Clone {
    /// Model (table) name.
    fn source() -> &'static str;

    /// Fields stored encrypted at rest. Empty by default.
    fn encrypt_fields() -> &'static [&'static str] {
        &[]
    }

    /// Column holding the soft-delete flag, if the model has one.
    fn active_column() -> Option<&'static str> {
        None
    }

    /// Value of [`active_column`](Self::active_column) for live rows.
    fn enabled_value() -> i64 {
        1
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Encrypt,
    Decrypt,
}

/// Seals and opens declared fields under the database-scope static key.
#[derive(Debug)]
pub struct FieldCipher {
    key: KeyBytes,
}

impl FieldCipher {
    /// Derive the field key for `database_hash` once and keep it.
    ///
    /// # Errors
    ///
    /// Returns [`SecurityError::ConfigurationMissing`] if `database_hash` is
    /// blank.
    pub fn new(deriver: &TokenDeriver, database_hash: &str) -> Result<Self, SecurityError> {
        Ok(Self {
            key: deriver.static_key(database_hash, "")?,
        })
    }

    /// Build a cipher from an already derived key.
    pub fn from_key(key: KeyBytes) -> Self {
        Self { key }
    }

    /// Encrypt one value of `field`.
    pub fn encrypt(&self, field: &str, plaintext: &str) -> Result<String, CipherError> {
        cipher::seal_str(plaintext, field, &self.key)
    }

    /// Decrypt one stored value of `field`.
    pub fn decrypt(&self, field: &str, stored: &str) -> Result<String, CipherError> {
        cipher::open_str(stored, field, &self.key)
    }

    /// Encrypt every present, non-null field of `record` named in `fields`.
    ///
    /// # Errors
    ///
    /// Returns [`SecurityError::TransformFailure`] for the first field that
    /// fails; `record` is left unchanged in that case.
    pub fn encrypt_fields<'r, R, S>(
        &self,
        record: &'r mut R,
        fields: &[S],
    ) -> Result<&'r mut R, SecurityError>
    where
        R: Record + ?Sized,
        S: AsRef<str>,
    {
        self.transform(record, fields, Direction::Encrypt)
    }

    /// Decrypt every present, non-null field of `record` named in `fields`.
    ///
    /// # Errors
    ///
    /// Returns [`SecurityError::TransformFailure`] for the first field that
    /// fails; `record` is left unchanged in that case.
    pub fn decrypt_fields<'r, R, S>(
        &self,
        record: &'r mut R,
        fields: &[S],
    ) -> Result<&'r mut R, SecurityError>
    where
        R: Record + ?Sized,
        S: AsRef<str>,
    {
        self.transform(record, fields, Direction::Decrypt)
    }

    fn transform<'r, R, S>(
        &self,
        record: &'r mut R,
        fields: &[S],
        direction: Direction,
    ) -> Result<&'r mut R, SecurityError>
    where
        R: Record + ?Sized,
        S: AsRef<str>,
    {
        if fields.is_empty() {
            return Ok(record);
        }

        let mut updates = Vec::with_capacity(fields.len());
        for name in fields {
            let name = name.as_ref();
            let out = match direction {
                Direction::Encrypt => match record.plaintext(name) {
                    Some(value) => self.encrypt(name, &value),
                    None => continue,
                },
                Direction::Decrypt => match record.field(name) {
                    Some(value) => self.decrypt(name, &value),
                    None => continue,
                },
            };
            match out {
                Ok(v) => updates.push((name, v)),
                Err(e) => return Err(SecurityError::transform(record.identity(), name, e)),
            }
        }

        let count = updates.len();
        for (name, value) in updates {
            match direction {
                Direction::Encrypt => record.set_field(name, value),
                Direction::Decrypt => record.set_plaintext(name, value),
            }
        }
        match direction {
            Direction::Encrypt => debug!(fields = count, "encrypted record fields"),
            Direction::Decrypt => debug!(fields = count, "decrypted record fields"),
        }
        Ok(record)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{alice, cipher, cipher_for, User};
    use super::*;

    #[test]
    fn scenario_ssn_round_trip() {
        let c = cipher();
        let mut user = alice();
        c.encrypt_fields(&mut user, &["ssn"]).unwrap();
        let stored = user.ssn.clone().unwrap();
        assert_ne!(stored, "123-45-6789");
        assert!(stored.starts_with("v1."));
        assert_eq!(user.email.as_deref(), Some("alice@example.com"));

        c.decrypt_fields(&mut user, &["ssn"]).unwrap();
        assert_eq!(user.ssn.as_deref(), Some("123-45-6789"));
    }

    #[test]
    fn round_trip_leaves_other_fields_untouched() {
        let c = cipher();
        let original = alice();
        let mut user = original.clone();
        c.encrypt_fields(&mut user, User::encrypt_fields()).unwrap();
        assert_eq!(user.name, "Alice");
        c.decrypt_fields(&mut user, User::encrypt_fields()).unwrap();
        assert_eq!(user, original);
    }

    #[test]
    fn empty_field_list_is_noop() {
        let c = cipher();
        let mut user = alice();
        let fields: [&str; 0] = [];
        let returned = c.encrypt_fields(&mut user, &fields).unwrap() as *const User;
        assert_eq!(returned, &user as *const User);
        assert_eq!(user, alice());
        c.decrypt_fields(&mut user, &fields).unwrap();
        assert_eq!(user, alice());
    }

    #[test]
    fn missing_and_null_fields_are_skipped() {
        let c = cipher();
        let mut user = User {
            ssn: None,
            ..alice()
        };
        c.encrypt_fields(&mut user, &["ssn", "nickname"]).unwrap();
        assert!(user.ssn.is_none());
        c.decrypt_fields(&mut user, &["ssn", "nickname"]).unwrap();
        assert!(user.ssn.is_none());
    }

    #[test]
    fn tampered_field_is_transform_failure() {
        let c = cipher();
        let mut user = alice();
        c.encrypt_fields(&mut user, &["ssn"]).unwrap();

        let mut stored = user.ssn.take().unwrap().into_bytes();
        let last = stored.len() - 1;
        stored[last] = if stored[last] == b'A' { b'B' } else { b'A' };
        user.ssn = Some(String::from_utf8(stored).unwrap());

        let err = c.decrypt_fields(&mut user, &["ssn"]).unwrap_err();
        match err {
            SecurityError::TransformFailure { record, field, .. } => {
                assert_eq!(record, "users:42");
                assert_eq!(field, "ssn");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rotated_secret_cannot_decrypt() {
        let mut user = alice();
        cipher().encrypt_fields(&mut user, &["ssn"]).unwrap();
        let rotated = cipher_for("rotated-secret", "db-scope-1");
        assert!(rotated.decrypt_fields(&mut user, &["ssn"]).is_err());
    }

    #[test]
    fn failure_leaves_record_unchanged() {
        let c = cipher();
        let mut user = alice();
        c.encrypt_fields(&mut user, &["ssn"]).unwrap();
        // email is still plaintext, so decrypting both must fail as a whole.
        let before = user.clone();
        assert!(c.decrypt_fields(&mut user, &["ssn", "email"]).is_err());
        assert_eq!(user, before);
    }

    #[test]
    fn plaintext_is_never_returned_as_decrypted() {
        let c = cipher();
        let mut user = alice();
        assert!(c.decrypt_fields(&mut user, &["ssn"]).is_err());
    }

    #[test]
    fn single_value_api() {
        let c = cipher();
        let stored = c.encrypt("ssn", "123-45-6789").unwrap();
        assert_eq!(c.decrypt("ssn", &stored).unwrap(), "123-45-6789");
        assert!(c.decrypt("email", &stored).is_err());
    }

    #[test]
    fn blank_database_hash_fails_fast() {
        let deriver = crate::token::TokenDeriver::with_system_clock(
            crate::token::ApplicationSecret::new("app-secret").unwrap(),
        );
        assert!(matches!(
            FieldCipher::new(&deriver, ""),
            Err(SecurityError::ConfigurationMissing(_))
        ));
    }
}
