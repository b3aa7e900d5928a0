//! [`Repository`]: a persistence collaborator with the encryption hooks applied.
//!
//! The storage engine itself lives outside this crate behind [`Persistence`].
//! The repository makes sure that:
//!
//! - every find is restricted to active rows (see [`inject_active`]),
//! - every loaded record goes through [`after_load`],
//! - every save writes an encrypted *copy*, so the caller keeps plaintext.

use std::{marker::PhantomData, sync::Arc};

use common::SecurityError;
use thiserror::Error;
use tracing::debug;

use super::hooks::{after_load, after_load_all, before_persist, AfterLoad};
use super::query::{inject_active, FindParameters};
use super::{FieldCipher, Model};

/// Storage operations supplied by the host ORM.
#[cfg_attr(test, mockall::automock)]
pub trait Persistence<M: Model + 'static> {
    /// Load every row matching `params`, as stored.
    fn find(&self, params: &FindParameters) -> anyhow::Result<Vec<M>>;

    /// Load the first row matching `params`, as stored.
    fn find_first(&self, params: &FindParameters) -> anyhow::Result<Option<M>>;

    /// Write `record` exactly as given.
    fn save(&mut self, record: M) -> anyhow::Result<()>;
}

/// Errors surfaced by [`Repository`].
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Encryption or decryption of a record failed.
    #[error(transparent)]
    Security(#[from] SecurityError),

    /// The storage collaborator failed.
    #[error(transparent)]
    Storage(anyhow::Error),
}

/// Model access with transparent field encryption.
pub struct Repository<M, P> {
    store: P,
    cipher: Arc<FieldCipher>,
    _model: PhantomData<fn() -> M>,
}

impl<M, P> Repository<M, P>
where
    M: Model + 'static,
    P: Persistence<M>,
{
    /// Wrap `store`, encrypting with `cipher`.
    pub fn new(store: P, cipher: Arc<FieldCipher>) -> Self {
        Self {
            store,
            cipher,
            _model: PhantomData,
        }
    }

    /// Borrow the underlying store.
    pub fn store(&self) -> &P {
        &self.store
    }

    /// Find all matching active rows, decrypted.
    ///
    /// # Errors
    ///
    /// Fails as a whole if storage fails or any record cannot be decrypted.
    pub fn find(&self, params: Option<FindParameters>) -> Result<Vec<M>, RepositoryError> {
        let records = self.find_each(params)?.collect::<Result<Vec<_>, _>>()?;
        debug!(model = M::source(), count = records.len(), "found records");
        Ok(records)
    }

    /// Find all matching active rows, yielding a per-record decrypt result.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Storage`] if the storage call fails.
    pub fn find_each(
        &self,
        params: Option<FindParameters>,
    ) -> Result<AfterLoad<'_, std::vec::IntoIter<M>>, RepositoryError> {
        let params = inject_active::<M>(params);
        let rows = self.store.find(&params).map_err(RepositoryError::Storage)?;
        Ok(after_load_all(&self.cipher, rows))
    }

    /// Find the first matching active row, decrypted.
    pub fn find_first(&self, params: Option<FindParameters>) -> Result<Option<M>, RepositoryError> {
        let params = inject_active::<M>(params);
        let Some(mut record) = self
            .store
            .find_first(&params)
            .map_err(RepositoryError::Storage)?
        else {
            return Ok(None);
        };
        after_load(&self.cipher, &mut record)?;
        Ok(Some(record))
    }

    /// Persist `record` with its declared fields encrypted.
    ///
    /// `record` itself is not modified.
    pub fn save(&mut self, record: &M) -> Result<(), RepositoryError> {
        let mut stored = record.clone();
        before_persist(&self.cipher, &mut stored)?;
        self.store.save(stored).map_err(RepositoryError::Storage)?;
        debug!(model = M::source(), "saved record");
        Ok(())
    }
}
