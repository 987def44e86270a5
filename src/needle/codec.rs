//! Needle codec
//!
//! Encoding into pooled buffers, and the validation / extraction steps used
//! on the read path.
//!
//! ## Read-side Checks (in order)
//! 1. `validate_block`: length, header magic, cookie, tombstone bit
//! 2. `extract_payload`: CRC32 over `[0, HEADER_SIZE + size)`, footer magic
//!
//! The checksum is computed over exactly the header and payload on both
//! sides. Padding and footer bytes never enter it.

use bytes::{Buf, BufMut};

use crate::checksum;
use crate::error::Result;
use crate::pool::{Buffer, BufferPool};
use crate::HaystackError;

use super::{
    Needle, NeedleFooter, NeedleHeader, ALIGNMENT, FLAG_DELETED, FOOTER_SIZE, HEADER_SIZE,
    MAGIC_FOOTER, MAGIC_HEADER, MIN_BLOCK_SIZE,
};

// =============================================================================
// Record Lengths
// =============================================================================

/// Header + payload + footer, without padding
pub fn unpadded_len(payload_len: usize) -> Result<usize> {
    HEADER_SIZE
        .checked_add(payload_len)
        .and_then(|len| len.checked_add(FOOTER_SIZE))
        .ok_or(HaystackError::Overflow {
            value: payload_len as u64,
            target: "usize",
        })
}

/// Full on-disk record length: unpadded length rounded up to `ALIGNMENT`
pub fn padded_len(payload_len: usize) -> Result<usize> {
    let len = unpadded_len(payload_len)?;
    len.checked_next_multiple_of(ALIGNMENT)
        .ok_or(HaystackError::Overflow {
            value: len as u64,
            target: "usize",
        })
}

/// Payload length as stored in the header's size field
pub fn payload_size(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| HaystackError::Overflow {
        value: len as u64,
        target: "u32",
    })
}

// =============================================================================
// Encoding
// =============================================================================

impl Needle {
    /// Padded on-disk length of this needle
    pub fn record_len(&self) -> Result<usize> {
        padded_len(self.data.len())
    }

    /// Encode into a buffer drawn from `pool`
    ///
    /// The returned buffer holds the full padded record; the caller owns it
    /// until it is handed back with `BufferPool::put`.
    pub fn encode(&self, pool: &BufferPool) -> Result<Buffer> {
        // Only canonical magic is ever written.
        if self.header.magic != MAGIC_HEADER || self.footer.magic != MAGIC_FOOTER {
            return Err(HaystackError::MagicNumber);
        }

        let size = payload_size(self.data.len())?;
        if size != self.header.size {
            return Err(HaystackError::SizeMismatch {
                declared: self.header.size,
                actual: self.data.len(),
            });
        }

        let record_len = self.record_len()?;
        let mut buf = pool.get(record_len)?;

        buf.put_u32(self.header.magic);
        buf.put_u64(self.header.cookie);
        buf.put_u64(self.header.key);
        buf.put_u32(self.header.alternate_key);
        buf.put_u8(self.header.flags);
        buf.put_u32(size);
        buf.put_slice(&self.data);

        let body_len = HEADER_SIZE + self.data.len();
        let crc = checksum::crc32(&buf[..body_len]);
        buf.put_u32(crc);
        buf.put_u32(self.footer.magic);

        let padding = record_len - buf.len();
        buf.put_bytes(0, padding);

        debug_assert_eq!(buf.len() % ALIGNMENT, 0);
        Ok(buf)
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Check the fixed prefix of a record read back from disk
///
/// Fails, in order, with `BufferTooSmall` (fewer than 25 bytes),
/// `MagicNumber`, `Cookie` and `DataDeleted`.
pub fn validate_block(block: &[u8], cookie: u64) -> Result<()> {
    if block.len() < MIN_BLOCK_SIZE {
        return Err(HaystackError::BufferTooSmall {
            needed: MIN_BLOCK_SIZE,
            actual: block.len(),
        });
    }

    let mut prefix = &block[..MIN_BLOCK_SIZE];

    if prefix.get_u32() != MAGIC_HEADER {
        return Err(HaystackError::MagicNumber);
    }

    if prefix.get_u64() != cookie {
        return Err(HaystackError::Cookie);
    }

    // key (8) + alternate key (4)
    prefix.advance(12);

    if prefix.get_u8() & FLAG_DELETED != 0 {
        return Err(HaystackError::DataDeleted);
    }

    Ok(())
}

/// Verify the checksum of a record holding `payload_len` bytes of data and
/// return the payload
///
/// `block` must hold at least the unpadded record. The returned slice borrows
/// `block`; copy it out before the backing buffer goes back to the pool.
pub fn extract_payload(block: &[u8], payload_len: usize) -> Result<&[u8]> {
    let record_len = unpadded_len(payload_len)?;
    if block.len() < record_len {
        return Err(HaystackError::BufferTooSmall {
            needed: record_len,
            actual: block.len(),
        });
    }

    let body_len = HEADER_SIZE + payload_len;
    let mut footer = &block[body_len..record_len];
    let stored_crc = footer.get_u32();
    let footer_magic = footer.get_u32();

    if !checksum::verify(&block[..body_len], stored_crc) {
        return Err(HaystackError::CrcNotValid);
    }

    if footer_magic != MAGIC_FOOTER {
        return Err(HaystackError::MagicNumber);
    }

    Ok(&block[HEADER_SIZE..body_len])
}

/// Parse the 29-byte header at the start of `block`
pub fn decode_header(block: &[u8]) -> Result<NeedleHeader> {
    if block.len() < HEADER_SIZE {
        return Err(HaystackError::BufferTooSmall {
            needed: HEADER_SIZE,
            actual: block.len(),
        });
    }

    let mut header = &block[..HEADER_SIZE];
    let magic = header.get_u32();
    if magic != MAGIC_HEADER {
        return Err(HaystackError::MagicNumber);
    }

    Ok(NeedleHeader {
        magic,
        cookie: header.get_u64(),
        key: header.get_u64(),
        alternate_key: header.get_u32(),
        flags: header.get_u8(),
        size: header.get_u32(),
    })
}

impl Needle {
    /// Decode a complete record, checksum included
    ///
    /// Tombstones decode successfully; callers check `is_deleted`.
    pub fn decode(block: &[u8]) -> Result<Needle> {
        let header = decode_header(block)?;
        let payload_len = header.size as usize;
        let data = extract_payload(block, payload_len)?.to_vec();

        let mut tail = &block[HEADER_SIZE + payload_len..];
        let footer = NeedleFooter {
            checksum: tail.get_u32(),
            magic: tail.get_u32(),
        };

        Ok(Needle {
            header,
            data,
            footer,
        })
    }
}
