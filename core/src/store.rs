//! Key-value record store consumed by the escrow state machine.
//!
//! Stores carry no validation and no locking of their own. Every mutating
//! method takes `&mut self`, so an invocation that holds the store has
//! exclusive access to every key until it returns.

use std::collections::BTreeMap;

/// Durable mapping from escrow id to serialized record bytes.
pub trait RecordStore {
    /// Returns the bytes stored under `id`, if any.
    fn get(&self, id: &[u8]) -> Option<Vec<u8>>;

    /// Stores `bytes` under `id`, replacing any previous value.
    fn put(&mut self, id: &[u8], bytes: Vec<u8>);

    /// Removes the value stored under `id`, if any.
    fn delete(&mut self, id: &[u8]);

    fn contains(&self, id: &[u8]) -> bool {
        self.get(id).is_some()
    }
}

/// Ordered in-memory store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(id, bytes)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
    }
}

impl From<BTreeMap<Vec<u8>, Vec<u8>>> for MemoryStore {
    fn from(entries: BTreeMap<Vec<u8>, Vec<u8>>) -> Self {
        Self { entries }
    }
}

impl From<MemoryStore> for BTreeMap<Vec<u8>, Vec<u8>> {
    fn from(store: MemoryStore) -> Self {
        store.entries
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, id: &[u8]) -> Option<Vec<u8>> {
        self.entries.get(id).cloned()
    }

    fn put(&mut self, id: &[u8], bytes: Vec<u8>) {
        self.entries.insert(id.to_vec(), bytes);
    }

    fn delete(&mut self, id: &[u8]) {
        self.entries.remove(id);
    }

    fn contains(&self, id: &[u8]) -> bool {
        self.entries.contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_put_delete() {
        let mut store = MemoryStore::new();
        assert!(store.is_empty());
        assert_eq!(store.get(b"a"), None);

        store.put(b"a", vec![1, 2]);
        store.put(b"b", vec![3]);
        assert_eq!(store.get(b"a"), Some(vec![1, 2]));
        assert!(store.contains(b"b"));
        assert_eq!(store.len(), 2);

        store.put(b"a", vec![9]);
        assert_eq!(store.get(b"a"), Some(vec![9]));

        store.delete(b"a");
        assert_eq!(store.get(b"a"), None);
        // deleting a missing key is a no-op
        store.delete(b"a");
        assert_eq!(store.iter().collect::<Vec<_>>(), vec![(&b"b"[..], &[3u8][..])]);
    }
}
