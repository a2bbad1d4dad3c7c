use tier_types::{Cid, TypeError};

/// Errors from block store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested block was not found.
    #[error("block not found: {0}")]
    NotFound(Cid),

    /// Content hash mismatch on read (data corruption).
    #[error("hash mismatch for {0}")]
    HashMismatch(Cid),

    /// The block could not be constructed or verified.
    #[error("invalid block: {0}")]
    InvalidBlock(#[from] TypeError),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store has been closed.
    #[error("store is closed")]
    Closed,
}

impl StoreError {
    /// Returns `true` for the not-found classification.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from a remote origin.
#[derive(Debug, thiserror::Error)]
pub enum OriginError {
    /// The origin does not have the block.
    #[error("block not found at origin: {0}")]
    NotFound(Cid),

    /// The origin could not be reached or answered with an error.
    #[error("origin unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for origin operations.
pub type OriginResult<T> = Result<T, OriginError>;
