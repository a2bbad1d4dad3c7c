use std::sync::Arc;

use async_trait::async_trait;
use tier_types::{Block, Cid};
use tokio::sync::mpsc;

use crate::error::StoreResult;

/// Content-addressed block store.
///
/// All implementations must satisfy these invariants:
/// - Blocks are immutable once written; writing the same CID twice is a no-op.
/// - `get` and `get_size` report a missing block as [`StoreError::NotFound`].
/// - `delete` of a missing block succeeds.
/// - All I/O errors are propagated, never silently ignored.
///
/// Optional capabilities are discovered through [`BlockStore::viewer`] and
/// [`BlockStore::closer`], which return `None` unless overridden.
///
/// [`StoreError::NotFound`]: crate::StoreError::NotFound
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Read a block by CID.
    async fn get(&self, cid: &Cid) -> StoreResult<Block>;

    /// Write a block. Idempotent.
    async fn put(&self, block: Block) -> StoreResult<()>;

    /// Write a batch of blocks.
    ///
    /// Default implementation calls `put()` for each block. Backends may
    /// override for better performance (e.g., single fsync).
    async fn put_many(&self, blocks: Vec<Block>) -> StoreResult<()> {
        for block in blocks {
            self.put(block).await?;
        }
        Ok(())
    }

    /// Check whether a block exists in the store.
    async fn has(&self, cid: &Cid) -> StoreResult<bool>;

    /// Delete a block by CID.
    async fn delete(&self, cid: &Cid) -> StoreResult<()>;

    /// Size in bytes of the stored block.
    async fn get_size(&self, cid: &Cid) -> StoreResult<usize>;

    /// Enumerate every stored CID.
    ///
    /// The store feeds the channel lazily; dropping the receiver stops the
    /// enumeration.
    async fn all_keys(&self) -> StoreResult<mpsc::Receiver<Cid>>;

    /// Toggle re-hashing of block data on every read.
    fn hash_on_read(&self, enabled: bool);

    /// Zero-copy read capability, if the backend has one.
    fn viewer(self: Arc<Self>) -> Option<Arc<dyn BlockViewer>> {
        None
    }

    /// Close capability, if the backend holds resources that need releasing.
    fn closer(self: Arc<Self>) -> Option<Arc<dyn BlockCloser>> {
        None
    }
}

/// Callback handed the raw bytes of a block by [`BlockViewer::view`].
pub type ViewFn<'a> = dyn FnMut(&[u8]) -> StoreResult<()> + Send + 'a;

/// Read a block without copying it out of the store.
#[async_trait]
pub trait BlockViewer: Send + Sync {
    /// Invoke `f` on the block's bytes. The slice must not outlive the call.
    async fn view(&self, cid: &Cid, f: &mut ViewFn<'_>) -> StoreResult<()>;
}

/// Release backend resources. Operations after `close` may fail.
#[async_trait]
pub trait BlockCloser: Send + Sync {
    async fn close(&self) -> StoreResult<()>;
}
