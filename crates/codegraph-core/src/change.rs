//! Decides whether a file needs reindexing, by content hash rather than
//! mtime — survives `touch`, copies, and filesystem-clock anomalies.

use crate::hash::ContentHasher;
use crate::store::IndexStore;

/// Result of a change check, carrying the freshly-computed hash forward so
/// `Indexer` doesn't hash the file twice.
#[derive(Debug, Clone)]
pub enum ChangeStatus {
    Unchanged,
    Changed { new_hash: String },
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ChangeDetector {
    hasher: ContentHasher,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self {
            hasher: ContentHasher::new(),
        }
    }

    /// Compares the stored hash for `file_path` to the hash of `contents`.
    /// Any IO error upstream (the caller couldn't read the file) should be
    /// treated as `Changed` by the caller — this function only compares
    /// hashes it's already been handed.
    pub fn check(&self, store: &IndexStore, file_path: &str, contents: &[u8]) -> crate::Result<ChangeStatus> {
        let new_hash = self.hasher.hash(contents);
        match store.file_hash(file_path)? {
            Some(stored) if stored == new_hash => Ok(ChangeStatus::Unchanged),
            _ => Ok(ChangeStatus::Changed { new_hash }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FileRecord, IndexStore};

    fn persisted(store: &mut IndexStore, file_path: &str, hash: &str) {
        let mut rec = FileRecord {
            file_path: file_path.to_string(),
            mtime_ms: 0,
            file_hash: hash.to_string(),
            language: "rust".to_string(),
            size_bytes: 1,
            symbols: vec![],
            imports: vec![],
            searchable_text: String::new(),
            embedding_text: String::new(),
            partition_id: "project".to_string(),
            authority_score: 0.5,
            index_fulltext: false,
        };
        rec.file_path = file_path.to_string();
        store.persist_file(&rec).unwrap();
    }

    #[test]
    fn unindexed_file_is_changed() {
        let store = IndexStore::open_in_memory().unwrap();
        let detector = ChangeDetector::new();
        let status = detector.check(&store, "new.rs", b"hello").unwrap();
        assert!(matches!(status, ChangeStatus::Changed { .. }));
    }

    #[test]
    fn identical_bytes_are_unchanged() {
        let mut store = IndexStore::open_in_memory().unwrap();
        let detector = ChangeDetector::new();
        let hash = detector.hasher.hash(b"hello");
        persisted(&mut store, "a.rs", &hash);

        let status = detector.check(&store, "a.rs", b"hello").unwrap();
        assert!(matches!(status, ChangeStatus::Unchanged));
    }

    #[test]
    fn different_bytes_are_changed() {
        let mut store = IndexStore::open_in_memory().unwrap();
        let detector = ChangeDetector::new();
        let hash = detector.hasher.hash(b"hello");
        persisted(&mut store, "a.rs", &hash);

        let status = detector.check(&store, "a.rs", b"goodbye").unwrap();
        assert!(matches!(status, ChangeStatus::Changed { .. }));
    }
}
