//! Volume Module
//!
//! One append-only backing file of needles plus its in-memory offset index.
//!
//! ## Responsibilities
//! - Append encoded needles at a monotonically increasing offset
//! - Map (key, alternate_key) to the offset and size of the latest needle
//! - Validate records on read (magic, cookie, tombstone, CRC)
//! - Rebuild the index on open by scanning the file
//!
//! ## File Layout
//! ```text
//! offset 0                                                   write_offset
//! ┌──────────────┬──────────┬──────────────┬──────────────┐  │
//! │ needle k=1   │ needle   │ needle k=1   │ tombstone    │  ▼
//! │ (stale)      │ k=2      │ (current)    │ k=2          │ next append
//! └──────────────┴──────────┴──────────────┴──────────────┘
//! ```
//!
//! Overwritten and deleted needles stay on disk as unreachable space.

mod index;
mod pio;
mod recovery;
mod store;

pub use index::{KeyPair, NeedleMeta};
pub use recovery::RecoveryReport;
pub use store::Volume;
