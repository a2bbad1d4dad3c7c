use cid::Cid;
use thiserror::Error;

/// Errors produced by address and block construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid CID: {0}")]
    InvalidCid(String),

    #[error("invalid multihash: {0}")]
    InvalidMultihash(String),

    #[error("unsupported hash function: 0x{0:x}")]
    UnsupportedHash(u64),

    #[error("identity digest too large: {size} bytes (max {max})")]
    IdentityTooLarge { size: usize, max: usize },

    #[error("block too large: {size} bytes (max {max})")]
    BlockTooLarge { size: usize, max: usize },

    #[error("identity CID {0} does not embed the supplied data")]
    IdentityMismatch(Cid),
}
