use std::fmt;

use bytes::Bytes;
use cid::Cid;

use crate::address::{blake3_cid, extract_identity, identity_cid, verify_block};
use crate::error::TypeError;

/// Largest block accepted by [`Block`] constructors (2 MiB).
pub const MAX_BLOCK_SIZE: usize = 2 * 1024 * 1024;

/// An immutable block: raw bytes bound to the CID that addresses them.
///
/// Constructors check size and identity consistency, but never re-hash data
/// bound to a caller-supplied CID. Use [`Block::verify`] for that.
#[derive(Clone, PartialEq, Eq)]
pub struct Block {
    cid: Cid,
    data: Bytes,
}

impl Block {
    /// Hash `data` with BLAKE3 and wrap it in a block.
    pub fn new(codec: u64, data: impl Into<Bytes>) -> Result<Self, TypeError> {
        let data = data.into();
        check_size(data.len())?;
        let cid = blake3_cid(codec, &data);
        Ok(Self { cid, data })
    }

    /// Build an identity block whose CID embeds `data`.
    pub fn identity(codec: u64, data: impl Into<Bytes>) -> Result<Self, TypeError> {
        let data = data.into();
        let cid = identity_cid(codec, &data)?;
        Ok(Self { cid, data })
    }

    /// Bind `data` to an existing CID without hashing it.
    pub fn with_cid(cid: Cid, data: impl Into<Bytes>) -> Result<Self, TypeError> {
        let data = data.into();
        check_size(data.len())?;
        if let Some(embedded) = extract_identity(&cid) {
            if embedded != data {
                return Err(TypeError::IdentityMismatch(cid));
            }
        }
        Ok(Self { cid, data })
    }

    /// Synthesize the block an identity CID describes. `None` for any other CID.
    pub fn from_identity_cid(cid: Cid) -> Option<Self> {
        extract_identity(&cid).map(|data| Self { cid, data })
    }

    pub fn cid(&self) -> &Cid {
        &self.cid
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn into_data(self) -> Bytes {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Re-hash the data and compare it against the CID's digest.
    pub fn verify(&self) -> Result<bool, TypeError> {
        verify_block(&self.cid, &self.data)
    }
}

fn check_size(size: usize) -> Result<(), TypeError> {
    if size > MAX_BLOCK_SIZE {
        return Err(TypeError::BlockTooLarge {
            size,
            max: MAX_BLOCK_SIZE,
        });
    }
    Ok(())
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("cid", &self.cid.to_string())
            .field("len", &self.data.len())
            .finish()
    }
}
