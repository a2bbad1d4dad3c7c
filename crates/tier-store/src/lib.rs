//! Block storage for Tier.
//!
//! This crate defines the content-addressed [`BlockStore`] interface, two
//! reference backends, the [`RemoteOrigin`] interface for a secondary source of
//! blocks, and [`IdStore`], the decorator that ties them together.
//!
//! # IdStore
//!
//! [`IdStore`] wraps a local store and an origin behind the same
//! [`BlockStore`] interface:
//!
//! - Identity CIDs (multihash code `0x00`) carry their content inline and are
//!   answered without touching either tier.
//! - Reads that miss locally fall back to the origin, and the fetched block is
//!   written back to the local store.
//!
//! # Storage Backends
//!
//! - [`InMemoryBlockStore`] -- `HashMap`-based store with zero-copy views
//! - [`FsBlockStore`] -- one file per block under a directory, closeable
//!
//! # Origins
//!
//! - [`InMemoryOrigin`] -- map-backed origin for tests and embedding
//! - [`StoreOrigin`] -- serves any [`BlockStore`] read-only
//! - [`NoOrigin`] -- never has anything
//!
//! # Design Rules
//!
//! 1. Blocks are immutable once written; writes are idempotent.
//! 2. Optional capabilities (view, close) are probed once, at wrap time.
//! 3. A failed cache repair never fails the read that triggered it.
//! 4. Only a local not-found triggers origin fallback; other errors propagate.

pub mod error;
pub mod fs;
pub mod idstore;
pub mod memory;
pub mod origin;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{OriginError, OriginResult, StoreError, StoreResult};
pub use fs::FsBlockStore;
pub use idstore::IdStore;
pub use memory::InMemoryBlockStore;
pub use origin::{InMemoryOrigin, NoOrigin, RemoteOrigin, StoreOrigin};
pub use traits::{BlockCloser, BlockStore, BlockViewer, ViewFn};
