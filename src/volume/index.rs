//! Index entries
//!
//! Identity key and location of the latest needle for that key.

use crate::error::Result;
use crate::needle;

/// Identity of a needle: (key, alternate_key)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyPair {
    pub key: u64,
    pub alternate_key: u32,
}

impl KeyPair {
    pub fn new(key: u64, alternate_key: u32) -> Self {
        Self { key, alternate_key }
    }
}

/// Location of the most recent needle written for a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeedleMeta {
    /// Byte offset of the record in the volume file
    pub offset: u64,

    /// Payload length (not the record length)
    pub size: u32,
}

impl NeedleMeta {
    /// Padded on-disk length of the record this entry points to
    pub fn record_len(&self) -> Result<usize> {
        needle::padded_len(self.size as usize)
    }
}
