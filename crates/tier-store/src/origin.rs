use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use tier_types::Cid;

use crate::error::{OriginError, OriginResult, StoreError};
use crate::traits::BlockStore;

/// A secondary, read-only source of blocks consulted on local miss.
#[async_trait]
pub trait RemoteOrigin: Send + Sync {
    /// Fetch the bytes addressed by `cid`.
    async fn fetch(&self, cid: &Cid) -> OriginResult<Bytes>;
}

/// Origin that never has anything. Turns the read-through store into a plain
/// identity-aware store.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOrigin;

#[async_trait]
impl RemoteOrigin for NoOrigin {
    async fn fetch(&self, cid: &Cid) -> OriginResult<Bytes> {
        Err(OriginError::NotFound(*cid))
    }
}

/// Map-backed origin for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemoryOrigin {
    blocks: RwLock<HashMap<Cid, Bytes>>,
}

impl InMemoryOrigin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `data` available under `cid`. The pair is not checked.
    pub fn insert(&self, cid: Cid, data: impl Into<Bytes>) {
        self.blocks
            .write()
            .expect("lock poisoned")
            .insert(cid, data.into());
    }

    pub fn remove(&self, cid: &Cid) {
        self.blocks.write().expect("lock poisoned").remove(cid);
    }

    pub fn len(&self) -> usize {
        self.blocks.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.read().expect("lock poisoned").is_empty()
    }
}

#[async_trait]
impl RemoteOrigin for InMemoryOrigin {
    async fn fetch(&self, cid: &Cid) -> OriginResult<Bytes> {
        self.blocks
            .read()
            .expect("lock poisoned")
            .get(cid)
            .cloned()
            .ok_or(OriginError::NotFound(*cid))
    }
}

/// Serves any [`BlockStore`] as a read-only origin, e.g. a shared mirror
/// directory opened as an [`FsBlockStore`](crate::FsBlockStore).
pub struct StoreOrigin<S: ?Sized> {
    store: Arc<S>,
}

impl<S: BlockStore + ?Sized> StoreOrigin<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: BlockStore + ?Sized> RemoteOrigin for StoreOrigin<S> {
    async fn fetch(&self, cid: &Cid) -> OriginResult<Bytes> {
        match self.store.get(cid).await {
            Ok(block) => Ok(block.into_data()),
            Err(StoreError::NotFound(cid)) => Err(OriginError::NotFound(cid)),
            Err(StoreError::Io(e)) => Err(OriginError::Io(e)),
            Err(e) => Err(OriginError::Unavailable(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBlockStore;
    use tier_types::{blake3_cid, Block, RAW};

    #[tokio::test]
    async fn no_origin_is_always_not_found() {
        let cid = blake3_cid(RAW, b"anything");
        assert!(matches!(NoOrigin.fetch(&cid).await, Err(OriginError::NotFound(c)) if c == cid));
    }

    #[tokio::test]
    async fn in_memory_origin_serves_inserted_bytes() {
        let origin = InMemoryOrigin::new();
        let cid = blake3_cid(RAW, b"remote");
        assert!(origin.fetch(&cid).await.is_err());

        origin.insert(cid, &b"remote"[..]);
        assert_eq!(origin.len(), 1);
        assert_eq!(origin.fetch(&cid).await.unwrap().as_ref(), b"remote");

        origin.remove(&cid);
        assert!(origin.is_empty());
    }

    #[tokio::test]
    async fn store_origin_maps_store_results() {
        let store = Arc::new(InMemoryBlockStore::new());
        let block = Block::new(RAW, &b"mirrored"[..]).unwrap();
        store.put(block.clone()).await.unwrap();

        let origin = StoreOrigin::new(Arc::clone(&store));
        assert_eq!(origin.fetch(block.cid()).await.unwrap(), *block.data());

        let missing = blake3_cid(RAW, b"missing");
        assert!(matches!(origin.fetch(&missing).await, Err(OriginError::NotFound(_))));

        store.insert_raw(missing, &b"corrupt"[..]);
        store.hash_on_read(true);
        assert!(matches!(origin.fetch(&missing).await, Err(OriginError::Unavailable(_))));
    }
}
