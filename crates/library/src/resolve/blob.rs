use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const SCHEME: &str = "blob:tankobon/";

/// In-memory bytes published under a `blob:` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub mime: &'static str,
    pub bytes: Arc<[u8]>,
}

/// Registry of in-memory page images addressable by URL.
///
/// A URL stays valid until it is [revoked](Self::revoke); the resolver
/// revokes a URL as soon as it drops the memo entry that handed it out.
/// Cloning shares the registry.
#[derive(Debug, Clone, Default)]
pub struct BlobStore {
    blobs: Arc<Mutex<HashMap<String, Blob>>>,
    next: Arc<AtomicU64>,
}

impl BlobStore {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Blob>> {
        // Every critical section is a single map operation; nothing can be
        // left half-done by a panic.
        self.blobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish `bytes`, returning a fresh URL for them.
    pub fn insert(&self, bytes: Vec<u8>, mime: &'static str) -> String {
        let url = format!("{SCHEME}{}", self.next.fetch_add(1, Ordering::Relaxed));
        self.lock().insert(url.clone(), Blob { mime, bytes: bytes.into() });
        url
    }

    pub fn get(&self, url: &str) -> Option<Blob> {
        self.lock().get(url).cloned()
    }

    /// Forget a URL. Returns `false` if it wasn't registered.
    pub fn revoke(&self, url: &str) -> bool {
        self.lock().remove(url).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get_revoke() {
        let store = BlobStore::default();
        let first = store.insert(vec![1, 2, 3], "image/png");
        let second = store.insert(vec![1, 2, 3], "image/png");
        assert_ne!(first, second);
        assert!(first.starts_with("blob:"));
        assert_eq!(store.len(), 2);

        let blob = store.get(&first).unwrap();
        assert_eq!(&*blob.bytes, &[1, 2, 3]);
        assert_eq!(blob.mime, "image/png");

        assert!(store.revoke(&first));
        assert!(!store.revoke(&first));
        assert!(store.get(&first).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_clones_share_state() {
        let store = BlobStore::default();
        let url = store.clone().insert(vec![0], "image/jpeg");
        assert!(store.get(&url).is_some());
    }
}
