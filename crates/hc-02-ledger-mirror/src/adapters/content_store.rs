//! In-memory content-addressed store keyed by SHA-256.

use crate::domain::LedgerResult;
use crate::ports::outbound::ContentAddressStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Hex-encoded SHA-256 of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[derive(Default)]
pub struct InMemoryContentStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

#[async_trait]
impl ContentAddressStore for InMemoryContentStore {
    async fn put(&self, bytes: Vec<u8>) -> LedgerResult<String> {
        let hash = content_hash(&bytes);
        self.objects.write().entry(hash.clone()).or_insert(bytes);
        Ok(hash)
    }

    async fn get(&self, hash: &str) -> LedgerResult<Option<Vec<u8>>> {
        Ok(self.objects.read().get(hash).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_is_content_addressed() {
        let store = InMemoryContentStore::new();
        let a = store.put(b"ashwagandha".to_vec()).await.unwrap();
        let b = store.put(b"ashwagandha".to_vec()).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&a).await.unwrap(), Some(b"ashwagandha".to_vec()));
        assert_eq!(store.get("missing").await.unwrap(), None);
    }
}
