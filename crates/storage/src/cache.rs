//! Write-buffered branch over a parent store.

use crate::{BatchOp, KvStore, StoreError};
use std::collections::BTreeMap;

/// Buffers writes and deletions on top of `parent`.
///
/// Reads observe buffered changes first. [`CacheStore::write`] hands the
/// buffer to the parent as a single batch in key order; dropping the branch
/// discards it.
/// Branches nest: a `CacheStore` is itself a [`KvStore`].
pub struct CacheStore<'a> {
    parent: &'a mut dyn KvStore,
    pending: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a> CacheStore<'a> {
    pub fn new(parent: &'a mut dyn KvStore) -> Self {
        Self {
            parent,
            pending: BTreeMap::new(),
        }
    }

    /// Number of buffered writes and deletions.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Flush every buffered change into the parent as one batch.
    pub fn write(self) -> Result<(), StoreError> {
        let CacheStore { parent, pending } = self;
        let count = pending.len();
        let ops = pending
            .into_iter()
            .map(|(key, value)| match value {
                Some(value) => BatchOp::Set(key, value),
                None => BatchOp::Delete(key),
            })
            .collect();
        parent.apply_batch(ops)?;
        tracing::trace!(target: "storage", entries = count, "cache branch flushed");
        Ok(())
    }
}

impl KvStore for CacheStore<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        match self.pending.get(key) {
            Some(buffered) => Ok(buffered.clone()),
            None => self.parent.get(key),
        }
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<(), StoreError> {
        self.pending.insert(key.to_vec(), Some(value));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.pending.insert(key.to_vec(), None);
        Ok(())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.parent.prefix_scan(prefix)?.into_iter().collect();
        for (key, value) in self
            .pending
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
        {
            match value {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }
}
