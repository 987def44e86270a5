//! # haystack
//!
//! Stores large numbers of small-to-medium blobs without one file per object:
//! - Needles packed into a single append-only volume file
//! - In-memory (key, alternate_key) → offset index, rebuilt on open
//! - CRC32 corruption detection and cookie checks on every read
//! - Size-classed buffer pool behind all volume I/O
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Volume                              │
//! │        write / read / delete / reload   (one RwLock)         │
//! └──────────┬──────────────────────┬───────────────────┬────────┘
//!            │                      │                   │
//!            ▼                      ▼                   ▼
//!   ┌─────────────────┐   ┌──────────────────┐   ┌─────────────┐
//!   │  Needle codec   │──►│   Buffer pool    │   │ Backing file│
//!   │ encode/validate │   │ (size classes)   │   │ (pread/     │
//!   └────────┬────────┘   └──────────────────┘   │  pwrite)    │
//!            ▼                                   └─────────────┘
//!   ┌─────────────────┐
//!   │    Checksum     │
//!   │    (CRC32)      │
//!   └─────────────────┘
//! ```
//!
//! Alongside the volume engine: a flat-file store (`disk`) and an AES-CTR
//! stream cipher (`crypto`) for encrypting blobs at rest.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod checksum;
pub mod pool;
pub mod needle;
pub mod volume;

pub mod crypto;
pub mod disk;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{HaystackError, Result};
pub use config::{Config, SyncStrategy};
pub use needle::Needle;
pub use pool::{Buffer, BufferPool};
pub use volume::{KeyPair, NeedleMeta, RecoveryReport, Volume};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of haystack
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
