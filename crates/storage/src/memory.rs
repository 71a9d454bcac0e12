use crate::{KvStore, StoreError};
use std::collections::BTreeMap;

/// In-memory backend for tests and embedded hosts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MemStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<(), StoreError> {
        self.entries.insert(key.to_vec(), value);
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        Ok(self
            .entries
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_scan_is_ordered_and_bounded() {
        let mut store = MemStore::new();
        store.set(&[2, 9], vec![3]).unwrap();
        store.set(&[1, 2], vec![2]).unwrap();
        store.set(&[1, 1], vec![1]).unwrap();
        store.set(&[0, 5], vec![0]).unwrap();

        let scanned = store.prefix_scan(&[1]).unwrap();
        assert_eq!(
            scanned,
            vec![(vec![1, 1], vec![1]), (vec![1, 2], vec![2])]
        );
        assert_eq!(store.prefix_scan(&[]).unwrap().len(), 4);
    }

    #[test]
    fn delete_removes_entry() {
        let mut store = MemStore::new();
        store.set(b"k", b"v".to_vec()).unwrap();
        assert!(store.has(b"k").unwrap());
        store.delete(b"k").unwrap();
        assert!(!store.has(b"k").unwrap());
        assert!(store.is_empty());
    }
}
