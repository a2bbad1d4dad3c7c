use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use tier_types::{verify_block, Block, Cid};
use tokio::sync::mpsc;

use crate::error::{StoreError, StoreResult};
use crate::traits::{BlockStore, BlockViewer, ViewFn};

/// In-memory, HashMap-based block store.
///
/// Intended for tests and embedding. Blocks are held behind a `RwLock`;
/// `Bytes` makes reads a reference-count bump rather than a copy. Supports
/// zero-copy [`BlockViewer`] reads.
pub struct InMemoryBlockStore {
    blocks: RwLock<HashMap<Cid, Bytes>>,
    hash_on_read: AtomicBool,
}

impl InMemoryBlockStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            blocks: RwLock::new(HashMap::new()),
            hash_on_read: AtomicBool::new(false),
        }
    }

    /// Number of blocks currently stored.
    pub fn len(&self) -> usize {
        self.blocks.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.blocks.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes across all stored blocks.
    pub fn total_bytes(&self) -> u64 {
        self.blocks
            .read()
            .expect("lock poisoned")
            .values()
            .map(|data| data.len() as u64)
            .sum()
    }

    /// Remove all blocks from the store.
    pub fn clear(&self) {
        self.blocks.write().expect("lock poisoned").clear();
    }

    /// Return a sorted list of all CIDs in the store.
    pub fn all_cids(&self) -> Vec<Cid> {
        let map = self.blocks.read().expect("lock poisoned");
        let mut cids: Vec<Cid> = map.keys().copied().collect();
        cids.sort();
        cids
    }

    /// Insert raw bytes under `cid` without any checks. Lets tests plant
    /// corrupt data.
    pub fn insert_raw(&self, cid: Cid, data: impl Into<Bytes>) {
        self.blocks
            .write()
            .expect("lock poisoned")
            .insert(cid, data.into());
    }

    fn check_read(&self, cid: &Cid, data: &[u8]) -> StoreResult<()> {
        if self.hash_on_read.load(Ordering::Relaxed) && !verify_block(cid, data)? {
            return Err(StoreError::HashMismatch(*cid));
        }
        Ok(())
    }
}

impl Default for InMemoryBlockStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlockStore for InMemoryBlockStore {
    async fn get(&self, cid: &Cid) -> StoreResult<Block> {
        let data = self
            .blocks
            .read()
            .expect("lock poisoned")
            .get(cid)
            .cloned()
            .ok_or(StoreError::NotFound(*cid))?;
        self.check_read(cid, &data)?;
        Ok(Block::with_cid(*cid, data)?)
    }

    async fn put(&self, block: Block) -> StoreResult<()> {
        let cid = *block.cid();
        let mut map = self.blocks.write().expect("lock poisoned");
        map.entry(cid).or_insert_with(|| block.into_data());
        Ok(())
    }

    async fn put_many(&self, blocks: Vec<Block>) -> StoreResult<()> {
        let mut map = self.blocks.write().expect("lock poisoned");
        for block in blocks {
            let cid = *block.cid();
            map.entry(cid).or_insert_with(|| block.into_data());
        }
        Ok(())
    }

    async fn has(&self, cid: &Cid) -> StoreResult<bool> {
        Ok(self.blocks.read().expect("lock poisoned").contains_key(cid))
    }

    async fn delete(&self, cid: &Cid) -> StoreResult<()> {
        self.blocks.write().expect("lock poisoned").remove(cid);
        Ok(())
    }

    async fn get_size(&self, cid: &Cid) -> StoreResult<usize> {
        self.blocks
            .read()
            .expect("lock poisoned")
            .get(cid)
            .map(Bytes::len)
            .ok_or(StoreError::NotFound(*cid))
    }

    async fn all_keys(&self) -> StoreResult<mpsc::Receiver<Cid>> {
        let cids = self.all_cids();
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(async move {
            for cid in cids {
                if tx.send(cid).await.is_err() {
                    break;
                }
            }
        });
        Ok(rx)
    }

    fn hash_on_read(&self, enabled: bool) {
        self.hash_on_read.store(enabled, Ordering::Relaxed);
    }

    fn viewer(self: Arc<Self>) -> Option<Arc<dyn BlockViewer>> {
        Some(self)
    }
}

#[async_trait]
impl BlockViewer for InMemoryBlockStore {
    async fn view(&self, cid: &Cid, f: &mut ViewFn<'_>) -> StoreResult<()> {
        let map = self.blocks.read().expect("lock poisoned");
        let data = map.get(cid).ok_or(StoreError::NotFound(*cid))?;
        self.check_read(cid, data)?;
        f(&data[..])
    }
}

impl std::fmt::Debug for InMemoryBlockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("InMemoryBlockStore")
            .field("block_count", &count)
            .finish()
    }
}
