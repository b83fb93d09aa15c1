//! Net mutations applied to the table as one unit.

use std::collections::{BTreeMap, BTreeSet};

/// A set of writes and deletes applied to the table atomically.
///
/// A key is never both written and deleted in the same batch: `put` clears
/// a pending delete of the key and `delete` clears a pending write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    writes: BTreeMap<String, Vec<u8>>,
    deletes: BTreeSet<String>,
}

impl WriteBatch {
    /// Creates an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a batch holding one write.
    #[must_use]
    pub fn single_put(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        let mut batch = Self::new();
        batch.put(key, value);
        batch
    }

    /// Creates a batch holding one delete.
    #[must_use]
    pub fn single_delete(key: impl Into<String>) -> Self {
        let mut batch = Self::new();
        batch.delete(key);
        batch
    }

    /// Builds a batch from already disjoint parts.
    pub(crate) fn from_parts(writes: BTreeMap<String, Vec<u8>>, deletes: BTreeSet<String>) -> Self {
        debug_assert!(writes.keys().all(|k| !deletes.contains(k)));
        Self { writes, deletes }
    }

    /// Records a write of `value` under `key`.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        let key = key.into();
        self.deletes.remove(&key);
        self.writes.insert(key, value.into());
    }

    /// Records a delete of `key`.
    pub fn delete(&mut self, key: impl Into<String>) {
        let key = key.into();
        self.writes.remove(&key);
        self.deletes.insert(key);
    }

    /// Returns the pending writes, ordered by key.
    #[must_use]
    pub fn writes(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.writes
    }

    /// Returns the pending deletes, ordered by key.
    #[must_use]
    pub fn deletes(&self) -> &BTreeSet<String> {
        &self.deletes
    }

    /// Returns the number of mutations in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.writes.len() + self.deletes.len()
    }

    /// Returns true if the batch holds no mutation.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty() && self.deletes.is_empty()
    }

    /// Splits the batch into its writes and deletes.
    #[must_use]
    pub fn into_parts(self) -> (BTreeMap<String, Vec<u8>>, BTreeSet<String>) {
        (self.writes, self.deletes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_clears_delete_and_delete_clears_put() {
        let mut batch = WriteBatch::new();
        batch.delete("k");
        batch.put("k", b"v".to_vec());
        assert!(batch.deletes().is_empty());
        assert_eq!(batch.writes().get("k"), Some(&b"v".to_vec()));

        batch.delete("k");
        assert!(batch.writes().is_empty());
        assert!(batch.deletes().contains("k"));
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn single_constructors() {
        assert_eq!(WriteBatch::single_put("a", vec![1]).len(), 1);
        assert!(WriteBatch::single_delete("a").writes().is_empty());
        assert!(WriteBatch::new().is_empty());
    }
}
