//! Lifecycle hooks wired into the persistence layer.
//!
//! - [`before_persist`] runs immediately before a record is written.
//! - [`after_load`] runs immediately after a record is materialised.
//! - [`after_load_all`] wraps a bulk result so every record passes through
//!   [`after_load`] before the caller sees it.

use common::SecurityError;

use super::{FieldCipher, Model};

/// Encrypt the declared fields of `record` before it is persisted.
pub fn before_persist<M: Model>(cipher: &FieldCipher, record: &mut M) -> Result<(), SecurityError> {
    let fields = M::encrypt_fields();
    if fields.is_empty() {
        return Ok(());
    }
    cipher.encrypt_fields(record, fields).map(|_| ())
}

/// Decrypt the declared fields of `record` after it is loaded.
pub fn after_load<M: Model>(cipher: &FieldCipher, record: &mut M) -> Result<(), SecurityError> {
    let fields = M::encrypt_fields();
    if fields.is_empty() {
        return Ok(());
    }
    cipher.decrypt_fields(record, fields).map(|_| ())
}

/// Route every record of a bulk result through [`after_load`].
///
/// Each item is reported on its own. Collect into `Result<Vec<_>, _>` to fail
/// the whole fetch on the first bad record, or filter the errors out to skip
/// them.
pub fn after_load_all<M, I>(cipher: &FieldCipher, records: I) -> AfterLoad<'_, I::IntoIter>
where
    M: Model,
    I: IntoIterator<Item = M>,
{
    AfterLoad {
        cipher,
        inner: records.into_iter(),
    }
}

/// Iterator returned by [`after_load_all`].
#[derive(Debug)]
pub struct AfterLoad<'c, I> {
    cipher: &'c FieldCipher,
    inner: I,
}

impl<M, I> Iterator for AfterLoad<'_, I>
where
    M: Model,
    I: Iterator<Item = M>,
{
    type Item = Result<M, SecurityError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut record = self.inner.next()?;
        Some(after_load(self.cipher, &mut record).map(|()| record))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testing::{alice, cipher, Page, User};

    #[test]
    fn persist_then_load_round_trips() {
        let c = cipher();
        let mut user = alice();
        before_persist(&c, &mut user).unwrap();
        assert_ne!(user.ssn.as_deref(), Some("123-45-6789"));
        assert_ne!(user.email.as_deref(), Some("alice@example.com"));

        after_load(&c, &mut user).unwrap();
        assert_eq!(user, alice());
    }

    #[test]
    fn model_without_encrypt_fields_bypasses_cipher() {
        let c = cipher();
        let mut page = Page {
            id: 1,
            title: "v1.not.ciphertext".into(),
        };
        before_persist(&c, &mut page).unwrap();
        after_load(&c, &mut page).unwrap();
        assert_eq!(page.title, "v1.not.ciphertext");
    }

    #[test]
    fn bulk_load_decrypts_every_record() {
        let c = cipher();
        let rows: Vec<User> = (1..=3)
            .map(|id| {
                let mut u = User { id, ..alice() };
                before_persist(&c, &mut u).unwrap();
                u
            })
            .collect();

        let loaded: Vec<User> = after_load_all(&c, rows)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(loaded.len(), 3);
        assert!(loaded.iter().all(|u| u.ssn.as_deref() == Some("123-45-6789")));
    }

    #[test]
    fn bulk_load_reports_bad_record_and_allows_skipping() {
        let c = cipher();
        let mut good = alice();
        before_persist(&c, &mut good).unwrap();
        let bad = User {
            id: 7,
            ssn: Some("v1.AAAAAAAAAAAAAAAA.AAAA".into()),
            ..alice()
        };

        let all: Result<Vec<User>, _> = after_load_all(&c, vec![good.clone(), bad.clone()]).collect();
        assert!(all.unwrap_err().to_string().contains("users:7"));

        let kept: Vec<User> = after_load_all(&c, vec![good, bad]).filter_map(Result::ok).collect();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, 42);
    }
}
