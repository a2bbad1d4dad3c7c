use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tier_types::{parse_cid, verify_block, Block, Cid};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::traits::{BlockCloser, BlockStore};

/// Directory-backed block store: one file per block, named by its CID.
///
/// Writes go to a temporary file in the same directory and are renamed into
/// place, so readers never observe a partial block. Files whose names do not
/// parse as a CID are ignored by [`BlockStore::all_keys`].
///
/// The store has no zero-copy view. After [`BlockCloser::close`] every
/// operation returns [`StoreError::Closed`].
pub struct FsBlockStore {
    root: PathBuf,
    hash_on_read: AtomicBool,
    closed: AtomicBool,
}

impl FsBlockStore {
    /// Open (or create) a store rooted at `root`.
    pub async fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await?;
        debug!(root = %root.display(), "opened block directory");
        Ok(Self {
            root,
            hash_on_read: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        })
    }

    fn path_for(&self, cid: &Cid) -> PathBuf {
        self.root.join(cid.to_string())
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

fn not_found_or(cid: &Cid, err: io::Error) -> StoreError {
    if err.kind() == io::ErrorKind::NotFound {
        StoreError::NotFound(*cid)
    } else {
        StoreError::Io(err)
    }
}

fn write_atomic(root: &Path, dest: &Path, data: &[u8]) -> io::Result<()> {
    let mut tmp = tempfile::NamedTempFile::new_in(root)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl BlockStore for FsBlockStore {
    async fn get(&self, cid: &Cid) -> StoreResult<Block> {
        self.ensure_open()?;
        let data = tokio::fs::read(self.path_for(cid))
            .await
            .map_err(|e| not_found_or(cid, e))?;
        if self.hash_on_read.load(Ordering::Relaxed) && !verify_block(cid, &data)? {
            return Err(StoreError::HashMismatch(*cid));
        }
        Ok(Block::with_cid(*cid, data)?)
    }

    async fn put(&self, block: Block) -> StoreResult<()> {
        self.ensure_open()?;
        let dest = self.path_for(block.cid());
        if tokio::fs::try_exists(&dest).await? {
            return Ok(());
        }
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || write_atomic(&root, &dest, block.data()))
            .await
            .map_err(io::Error::other)??;
        Ok(())
    }

    async fn has(&self, cid: &Cid) -> StoreResult<bool> {
        self.ensure_open()?;
        Ok(tokio::fs::try_exists(self.path_for(cid)).await?)
    }

    async fn delete(&self, cid: &Cid) -> StoreResult<()> {
        self.ensure_open()?;
        match tokio::fs::remove_file(self.path_for(cid)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_size(&self, cid: &Cid) -> StoreResult<usize> {
        self.ensure_open()?;
        let meta = tokio::fs::metadata(self.path_for(cid))
            .await
            .map_err(|e| not_found_or(cid, e))?;
        Ok(meta.len() as usize)
    }

    async fn all_keys(&self) -> StoreResult<mpsc::Receiver<Cid>> {
        self.ensure_open()?;
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(async move {
            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => {
                        warn!(error = %e, "block directory listing failed; stopping");
                        break;
                    }
                };
                let Some(cid) = entry.file_name().to_str().and_then(|n| parse_cid(n).ok()) else {
                    continue;
                };
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

    fn closer(self: Arc<Self>) -> Option<Arc<dyn BlockCloser>> {
        Some(self)
    }
}

#[async_trait]
impl BlockCloser for FsBlockStore {
    async fn close(&self) -> StoreResult<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!(root = %self.root.display(), "closed block directory");
        }
        Ok(())
    }
}

impl std::fmt::Debug for FsBlockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsBlockStore")
            .field("root", &self.root)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}
