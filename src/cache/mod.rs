//! Versioned response cache.
//!
//! # Data Flow
//! ```text
//! Interception proxy
//!     → key.rs (normalize GET request → CacheKey)
//!     → store.rs lookup (active generation only)
//!     → on network success: store.rs put (active generation)
//!
//! Rollover:
//!     open(new) → put manifest assets → activate(new)
//!     → delete_generations_except(new)
//! ```
//!
//! # Design Decisions
//! - Generations are whole snapshots; no per-entry TTL
//! - Entries are `Arc`-shared so readers never observe a partial write
//! - Deleting a generation only unlinks it; in-flight writes land in the
//!   detached map and become unreachable

pub mod entry;
pub mod key;
pub mod store;

pub use entry::StoredResponse;
pub use key::CacheKey;
pub use store::{CacheStore, CacheStoreError, GenerationHandle, GenerationId, MemoryCacheStore};
