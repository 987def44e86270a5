//! Checksum utility
//!
//! Stateless CRC-32 (IEEE polynomial) over byte slices. Needles store this
//! value over their header and payload bytes.

/// Compute the CRC-32 (IEEE) of `data`
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Check `data` against a previously stored checksum
pub fn verify(data: &[u8], expected: u32) -> bool {
    crc32(data) == expected
}

/// Incremental CRC-32 (IEEE) for data read in pieces
pub use crc32fast::Hasher;
