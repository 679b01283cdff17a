//! Thread-safe handle to a [`Group`].
//!
//! Queries take a read lock and may run concurrently; mutations take the
//! write lock, so readers only ever see committed state.

use std::sync::{Arc, RwLock};

use splitledger_ledger::{ExternalBalances, ValueSink};
use splitledger_types::{LedgerError, Result};

use crate::group::Group;

/// Cloneable, shareable group handle.
#[derive(Debug)]
pub struct SharedGroup<S = ExternalBalances> {
    inner: Arc<RwLock<Group<S>>>,
}

impl<S> Clone for SharedGroup<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: ValueSink + Clone> SharedGroup<S> {
    #[must_use]
    pub fn new(group: Group<S>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(group)),
        }
    }

    /// Run a query under the read lock.
    ///
    /// # Errors
    /// `Internal` if the lock is poisoned.
    pub fn read<R>(&self, f: impl FnOnce(&Group<S>) -> R) -> Result<R> {
        let guard = self
            .inner
            .read()
            .map_err(|_| LedgerError::Internal("group lock poisoned".to_string()))?;
        Ok(f(&guard))
    }

    /// Run a mutation under the write lock.
    ///
    /// # Errors
    /// `Internal` if the lock is poisoned, otherwise whatever `f` returns.
    pub fn write<R>(&self, f: impl FnOnce(&mut Group<S>) -> Result<R>) -> Result<R> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| LedgerError::Internal("group lock poisoned".to_string()))?;
        f(&mut guard)
    }
}
