//! Needle definitions
//!
//! In-memory shape of a needle. Only its encoded bytes are persisted.

use crate::error::Result;
use crate::volume::KeyPair;

use super::{payload_size, FLAG_DELETED, MAGIC_FOOTER, MAGIC_HEADER};

/// Fixed-size needle header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeedleHeader {
    /// Must equal `MAGIC_HEADER`
    pub magic: u32,

    /// Caller-supplied token re-checked on every read
    pub cookie: u64,

    /// Primary key
    pub key: u64,

    /// Secondary key; (key, alternate_key) identifies the needle
    pub alternate_key: u32,

    /// Flag bits (bit 0 = deleted)
    pub flags: u8,

    /// Payload length in bytes
    pub size: u32,
}

/// Needle footer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeedleFooter {
    /// CRC32 over header and payload bytes
    pub checksum: u32,

    /// Must equal `MAGIC_FOOTER`
    pub magic: u32,
}

/// A needle: header, payload and footer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Needle {
    pub header: NeedleHeader,
    pub data: Vec<u8>,
    pub footer: NeedleFooter,
}

impl NeedleHeader {
    /// Whether the tombstone bit is set
    pub fn is_deleted(&self) -> bool {
        self.flags & FLAG_DELETED != 0
    }

    /// The (key, alternate_key) identity of this needle
    pub fn key_pair(&self) -> KeyPair {
        KeyPair::new(self.key, self.alternate_key)
    }
}

impl Needle {
    /// Create a live needle carrying `data`
    ///
    /// A payload longer than `u32::MAX` bytes cannot be stored: its size field
    /// saturates and `encode` fails with `Overflow`. Use `try_new` to
    /// reject it up front.
    pub fn new(key: u64, alternate_key: u32, cookie: u64, data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        let size = u32::try_from(data.len()).unwrap_or(u32::MAX);
        Self::with_size(key, alternate_key, cookie, data, size)
    }

    /// Create a live needle, failing with `Overflow` if `data` does not fit
    /// the 32-bit size field
    pub fn try_new(
        key: u64,
        alternate_key: u32,
        cookie: u64,
        data: impl Into<Vec<u8>>,
    ) -> Result<Self> {
        let data = data.into();
        let size = payload_size(data.len())?;
        Ok(Self::with_size(key, alternate_key, cookie, data, size))
    }

    fn with_size(key: u64, alternate_key: u32, cookie: u64, data: Vec<u8>, size: u32) -> Self {
        Self {
            header: NeedleHeader {
                magic: MAGIC_HEADER,
                cookie,
                key,
                alternate_key,
                flags: 0,
                size,
            },
            data,
            footer: NeedleFooter {
                checksum: 0,
                magic: MAGIC_FOOTER,
            },
        }
    }

    /// Create a zero-payload tombstone for (key, alternate_key)
    pub fn tombstone(key: u64, alternate_key: u32, cookie: u64) -> Self {
        let mut needle = Self::new(key, alternate_key, cookie, Vec::new());
        needle.header.flags |= FLAG_DELETED;
        needle
    }

    pub fn is_deleted(&self) -> bool {
        self.header.is_deleted()
    }

    pub fn key_pair(&self) -> KeyPair {
        self.header.key_pair()
    }
}
