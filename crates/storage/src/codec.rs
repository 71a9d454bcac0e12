//! bincode value codec.

use crate::{KvStore, StoreError};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    Ok(bincode::serialize(value)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    Ok(bincode::deserialize(bytes)?)
}

/// Read and decode the value stored under `key`.
pub fn get_value<T: DeserializeOwned>(
    store: &dyn KvStore,
    key: &[u8],
) -> Result<Option<T>, StoreError> {
    match store.get(key)? {
        Some(bytes) => decode(&bytes).map(Some).map_err(|err| StoreError::Corrupted {
            key: hex::encode(key),
            reason: err.to_string(),
        }),
        None => Ok(None),
    }
}

pub fn set_value<T: Serialize>(
    store: &mut dyn KvStore,
    key: &[u8],
    value: &T,
) -> Result<(), StoreError> {
    store.set(key, encode(value)?)
}
