//! Flat-file Module
//!
//! A one-file-per-object backend: each logical key maps to a path under a
//! root directory through a pluggable transform. The simple alternative to
//! needle volumes, with optional stream encryption.
//!
//! ## Layout (prefix transform)
//! ```text
//! {root}/
//!   ├── ab/
//!   │   └── cdefg        key "abcdefg"
//!   └── pi/
//!       └── cture_01     key "picture_01"
//! ```

mod path;
mod store;

use std::io::Read;

use crate::error::Result;

pub use path::{identity_transform, prefix_transform, PathKey, PathTransform};
pub use store::{DiskStore, DiskStoreBuilder, DEFAULT_ROOT};

/// A keyed blob store
pub trait Store {
    /// Stream handed back by `read`
    type Reader: Read;

    /// Whether a blob exists for `key`
    fn has(&self, key: &str) -> bool;

    /// Store everything `reader` yields under `key`, replacing any previous
    /// blob; returns the number of bytes written
    fn write(&self, key: &str, reader: &mut dyn Read) -> Result<u64>;

    /// Open the blob stored under `key`; returns its size and a reader
    fn read(&self, key: &str) -> Result<(u64, Self::Reader)>;
}
