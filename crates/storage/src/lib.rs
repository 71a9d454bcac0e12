//! Storage layer for the distribution engine.
//!
//! The engine only ever talks to a [`KvStore`]: an ordered byte-keyed map
//! with prefix iteration. [`MemStore`] and [`SledStore`] are the two
//! backends; [`CacheStore`] layers a write buffer over any of them so a
//! state transition can be committed or discarded as a unit.

pub mod cache;
pub mod codec;
pub mod memory;
pub mod sled_store;

pub use cache::CacheStore;
pub use codec::{decode, encode, get_value, set_value};
pub use memory::MemStore;
pub use sled_store::SledStore;

/// Storage errors
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
    #[error("Corrupted value under key {key}: {reason}")]
    Corrupted { key: String, reason: String },
}

/// One change inside a write batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Set(Vec<u8>, Vec<u8>),
    Delete(Vec<u8>),
}

/// Ordered key-value store.
///
/// `prefix_scan` must yield entries in ascending key order; the engine
/// relies on it for deterministic iteration.
pub trait KvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    fn has(&self, key: &[u8]) -> Result<bool, StoreError> {
        Ok(self.get(key)?.is_some())
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<(), StoreError>;

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError>;

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError>;

    /// Apply every change in `ops` as one unit.
    ///
    /// The default applies them one by one and is only suitable for
    /// backends whose writes cannot fail; persistent backends override it
    /// so that either all changes land or none do.
    fn apply_batch(&mut self, ops: Vec<BatchOp>) -> Result<(), StoreError> {
        for op in ops {
            match op {
                BatchOp::Set(key, value) => self.set(&key, value)?,
                BatchOp::Delete(key) => self.delete(&key)?,
            }
        }
        Ok(())
    }
}
