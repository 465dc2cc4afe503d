//! # bulkpool - Preallocated Memory Pools
//!
//! This crate provides two fixed-capacity allocators that carve every allocation
//! out of one memory bulk mapped at creation and never grown:
//!
//! - [`BuddyPool`]: power-of-two size classes with split on demand and merge on free.
//! - [`LinearPool`]: bump allocation with deferred, checksum-guarded out-of-order free.
//!
//! ## Overview
//!
//! ```text
//!   Buddy pool (64 KiB):
//!
//!   ┌───────────────────────────────┬───────────────────────────────┐
//!   │            32 KiB             │            32 KiB free        │
//!   ├───────────────┬───────────────┼───────────────────────────────┘
//!   │    16 KiB     │  16 KiB free  │
//!   ├───────┬───────┼───────────────┘
//!   │ 8 KiB │ 8 KiB │   split on alloc, merge with the buddy on free
//!   │ used  │ used  │
//!   └───────┴───────┘
//!
//!   Linear pool:
//!
//!   ┌─────┬─────┬─────┬─────┬─────┬─────┬──────────────────────────────┐
//!   │ hdr │ A1  │ hdr │ A2  │ hdr │ A3  │          Free Space          │
//!   └─────┴─────┴─────┴─────┴─────┴─────┴──────────────────────────────┘
//!                                       ▲
//!                                    current
//!
//!   Each allocation bumps `current` forward. Freeing the top cell rolls it
//!   back over every already-freed cell beneath it.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   bulkpool
//!   ├── align      - Alignment macros (align_up!, is_aligned!)
//!   ├── bulk       - MemoryBulk, the mmap-backed region (internal)
//!   ├── block      - Buddy block addressing (internal)
//!   ├── bitmap     - Buddy in-use bitmap (internal)
//!   ├── buddy      - BuddyPool
//!   ├── linear     - LinearPool
//!   ├── pool       - Pool trait and PoolStats
//!   ├── registry   - PoolRegistry, 256 slots of pools
//!   ├── adapter    - PoolAlloc, GlobalAlloc over a pool
//!   ├── config     - RegistryConfig, TOML slot table
//!   └── error      - PoolError
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use bulkpool::{BuddyPool, Pool};
//!
//! let mut pool = BuddyPool::new(64 * 1024).unwrap();
//!
//! let ptr = pool.alloc(100).unwrap();
//! assert_eq!(128, pool.used());
//!
//! unsafe { pool.free(ptr) };
//! assert_eq!(pool.capacity(), pool.available());
//! ```
//!
//! ## Failure Model
//!
//! Running out of memory is the only condition callers are expected to handle,
//! and it is reported as `None` (or `0` from [`PoolRegistry::create`]). Misuse
//! such as double frees, foreign pointers or corrupted linear headers trips a
//! debug assertion and is undefined in release builds, which is why the release
//! operations are `unsafe fn`.
//!
//! ## Limitations
//!
//! - **Single-threaded pools**: wrap a pool in [`PoolAlloc`] or your own lock to share it
//! - **Fixed capacity**: the bulk is never grown or shrunk
//! - **Unix-only**: the bulk is an anonymous `mmap` through `libc`

pub mod align;
mod adapter;
mod bitmap;
mod block;
mod buddy;
mod bulk;
mod config;
mod error;
mod linear;
mod pool;
mod registry;

pub use adapter::PoolAlloc;
pub use block::MIN_BLOCK_SIZE;
pub use buddy::{BuddyPool, MAX_BUDDY_SHIFT};
pub use config::{RegistryConfig, SlotConfig};
pub use error::PoolError;
pub use linear::{LinearPool, MAX_LINEAR_SIZE, MIN_LINEAR_SIZE};
pub use pool::{Pool, PoolStats};
pub use registry::{PoolRegistry, SLOT_COUNT};
