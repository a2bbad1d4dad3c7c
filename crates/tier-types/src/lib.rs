//! Foundation types for Tier.
//!
//! This crate provides the content-addressing vocabulary shared by every other
//! Tier crate: CIDs, multihash codes, the identity classification helper, and
//! the [`Block`] type pairing an address with its bytes.
//!
//! # Key Types
//!
//! - [`Cid`] -- Content identifier (codec tag + multihash), re-exported from `cid`
//! - [`Block`] -- Immutable `(Cid, Bytes)` pair
//! - [`extract_identity`] -- Detects self-describing identity addresses
//! - [`TypeError`] -- Address and block construction failures

pub mod address;
pub mod block;
pub mod error;

pub use address::{
    blake3_cid, extract_identity, identity_cid, is_identity, parse_cid, verify_block,
    BLAKE3_256, DAG_CBOR, IDENTITY, MAX_IDENTITY_SIZE, RAW,
};
pub use block::{Block, MAX_BLOCK_SIZE};
pub use bytes::Bytes;
pub use cid::Cid;
pub use error::TypeError;
