use std::sync::Arc;

use async_trait::async_trait;
use tier_types::{extract_identity, is_identity, Block, Cid};
use tokio::sync::mpsc;
use tracing::{debug, warn, Instrument, Span};

use crate::error::{StoreError, StoreResult};
use crate::origin::RemoteOrigin;
use crate::traits::{BlockCloser, BlockStore, BlockViewer, ViewFn};

/// Identity-aware, read-through block store.
///
/// Wraps a local [`BlockStore`] and a [`RemoteOrigin`]:
///
/// - Identity CIDs are answered from the CID itself. Neither the local store
///   nor the origin is ever touched for them.
/// - A `get` that misses locally is retried against the origin. Fetched
///   blocks are written back to the local store on a best-effort basis.
///
/// Origin failures of any kind surface as [`StoreError::NotFound`]. Every
/// other local error is returned unchanged. Fetched bytes are bound to the
/// requested CID without re-hashing.
///
/// Concurrent misses for the same CID are not coalesced: each caller fetches
/// and writes back independently.
pub struct IdStore {
    local: Arc<dyn BlockStore>,
    viewer: Option<Arc<dyn BlockViewer>>,
    closer: Option<Arc<dyn BlockCloser>>,
    origin: Arc<dyn RemoteOrigin>,
    span: Span,
}

impl IdStore {
    /// Wrap `local`, falling back to `origin` on local miss.
    ///
    /// The local store's optional view and close capabilities are probed once
    /// here.
    pub fn new(local: Arc<dyn BlockStore>, origin: Arc<dyn RemoteOrigin>) -> Self {
        let viewer = Arc::clone(&local).viewer();
        let closer = Arc::clone(&local).closer();
        Self {
            local,
            viewer,
            closer,
            origin,
            span: tracing::debug_span!("idstore"),
        }
    }

    /// Emit this store's events inside `span` instead of the default one.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    async fn read_through(&self, cid: &Cid) -> StoreResult<Block> {
        match self.local.get(cid).await {
            Ok(block) => {
                debug!(cid = %cid, "got block from local store");
                Ok(block)
            }
            Err(StoreError::NotFound(_)) => self.fetch_and_repair(cid).await,
            Err(e) => Err(e),
        }
    }

    async fn fetch_and_repair(&self, cid: &Cid) -> StoreResult<Block> {
        let data = match self.origin.fetch(cid).await {
            Ok(data) => data,
            Err(e) => {
                warn!(cid = %cid, error = %e, "failed to fetch block from origin");
                return Err(StoreError::NotFound(*cid));
            }
        };

        let block = match Block::with_cid(*cid, data) {
            Ok(block) => block,
            Err(e) => {
                warn!(cid = %cid, error = %e, "origin returned unusable block data");
                return Err(StoreError::NotFound(*cid));
            }
        };

        debug!(cid = %cid, size = block.len(), "got block from origin");
        if let Err(e) = self.local.put(block.clone()).await {
            warn!(cid = %cid, error = %e, "failed to write fetched block to local store");
        }
        Ok(block)
    }
}

#[async_trait]
impl BlockStore for IdStore {
    async fn get(&self, cid: &Cid) -> StoreResult<Block> {
        if let Some(block) = Block::from_identity_cid(*cid) {
            return Ok(block);
        }
        self.read_through(cid).instrument(self.span.clone()).await
    }

    async fn put(&self, block: Block) -> StoreResult<()> {
        if is_identity(block.cid()) {
            return Ok(());
        }
        self.local.put(block).await
    }

    async fn put_many(&self, blocks: Vec<Block>) -> StoreResult<()> {
        let to_put: Vec<Block> = blocks
            .into_iter()
            .filter(|block| !is_identity(block.cid()))
            .collect();
        self.local.put_many(to_put).await
    }

    async fn has(&self, cid: &Cid) -> StoreResult<bool> {
        if is_identity(cid) {
            return Ok(true);
        }
        self.local.has(cid).await
    }

    async fn delete(&self, cid: &Cid) -> StoreResult<()> {
        if is_identity(cid) {
            return Ok(());
        }
        self.local.delete(cid).await
    }

    async fn get_size(&self, cid: &Cid) -> StoreResult<usize> {
        if let Some(data) = extract_identity(cid) {
            return Ok(data.len());
        }
        self.local.get_size(cid).await
    }

    async fn all_keys(&self) -> StoreResult<mpsc::Receiver<Cid>> {
        self.local.all_keys().await
    }

    fn hash_on_read(&self, enabled: bool) {
        self.local.hash_on_read(enabled);
    }

    fn viewer(self: Arc<Self>) -> Option<Arc<dyn BlockViewer>> {
        Some(self)
    }

    fn closer(self: Arc<Self>) -> Option<Arc<dyn BlockCloser>> {
        Some(self)
    }
}

#[async_trait]
impl BlockViewer for IdStore {
    /// Identity CIDs are viewed straight from the CID. Otherwise the local
    /// viewer is used when there is one, and a full `get` (with origin
    /// fallback) when there is not.
    async fn view(&self, cid: &Cid, f: &mut ViewFn<'_>) -> StoreResult<()> {
        if let Some(data) = extract_identity(cid) {
            return f(&data[..]);
        }
        match &self.viewer {
            Some(viewer) => viewer.view(cid, f).await,
            None => {
                let block = self.get(cid).await?;
                f(&block.data()[..])
            }
        }
    }
}

#[async_trait]
impl BlockCloser for IdStore {
    async fn close(&self) -> StoreResult<()> {
        match &self.closer {
            Some(closer) => closer.close().await,
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for IdStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdStore")
            .field("has_viewer", &self.viewer.is_some())
            .field("has_closer", &self.closer.is_some())
            .finish()
    }
}
