//! Volume recovery
//!
//! Rebuilds the index by scanning a volume file from offset 0.
//!
//! ## Scan
//! 1. Read the 29-byte header at the cursor, check its magic
//! 2. Derive the padded record length from its size field
//! 3. Longer than the largest buffer class: no write through this pool made
//!    it. An intact record fails with `TooLarge`, anything else with
//!    `CorruptVolume`
//! 4. Fewer bytes left than that: a torn append, unless an intact needle
//!    follows in the remaining bytes (then the size field itself is bad and
//!    the scan fails with `CorruptVolume`). Stop and cut the file there
//! 5. Otherwise read the record and verify its checksum
//! 6. Apply it (live needle: upsert, tombstone: remove) and move on

use std::collections::HashMap;
use std::fs::File;

use bytes::Buf;

use crate::checksum;
use crate::error::Result;
use crate::needle::{self, ALIGNMENT, FOOTER_SIZE, HEADER_SIZE, MAGIC_FOOTER};
use crate::pool::BufferPool;
use crate::HaystackError;

use super::pio;
use super::{KeyPair, NeedleMeta};

/// Read size when checksumming a record too large for any pool buffer
const STREAM_CHUNK: usize = 64 * 1024;

/// Result of a recovery scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Live needle records applied to the index
    pub needles_recovered: u64,

    /// Tombstone records applied
    pub tombstones: u64,

    /// Complete records skipped because their checksum or footer was bad
    pub needles_corrupted: u64,

    /// Keys in the rebuilt index
    pub live_needles: u64,

    /// Offset after the last complete record; next append goes here
    pub end_offset: u64,

    /// Whether a torn trailing record was cut off
    pub was_truncated: bool,
}

/// Scan `file` and rebuild the index
///
/// A bad header magic before the end of the file fails with `CorruptVolume`:
/// the record boundary is lost, so nothing after it can be trusted.
pub(crate) fn scan(
    file: &File,
    pool: &BufferPool,
) -> Result<(HashMap<KeyPair, NeedleMeta>, RecoveryReport)> {
    let file_len = file.metadata()?.len();
    let mut index = HashMap::new();
    let mut report = RecoveryReport::default();
    let mut header_bytes = [0u8; HEADER_SIZE];
    let mut offset = 0u64;

    while offset < file_len {
        let remaining = file_len - offset;

        // Step 1: Header
        if remaining < HEADER_SIZE as u64 {
            report.was_truncated = true;
            break;
        }

        pio::read_exact_at(file, &mut header_bytes, offset)?;
        let header = match needle::decode_header(&header_bytes) {
            Ok(header) => header,
            Err(HaystackError::MagicNumber) => {
                return Err(HaystackError::CorruptVolume {
                    offset,
                    reason: "bad needle header magic".to_string(),
                })
            }
            Err(e) => return Err(e),
        };

        // Step 2: Record length
        let record_len = needle::padded_len(header.size as usize)?;

        // Step 3: Oversized
        if record_len > pool.largest_class() {
            return Err(reject_oversized(
                file,
                pool,
                offset,
                header.size,
                record_len,
                remaining,
            ));
        }

        // Step 4: Torn append
        if record_len as u64 > remaining {
            if let Some(intact) = find_intact_needle(file, pool, offset, remaining)? {
                return Err(HaystackError::CorruptVolume {
                    offset,
                    reason: format!(
                        "record of {} bytes runs past the end of the file, \
                         but an intact needle follows at offset {}",
                        record_len, intact
                    ),
                });
            }

            report.was_truncated = true;
            break;
        }

        // Step 5: Checksum
        let mut record = pool.checkout(record_len)?;
        record.resize(record_len, 0);
        pio::read_exact_at(file, &mut record[..], offset)?;

        match needle::extract_payload(&record, header.size as usize) {
            Ok(_) => {}
            Err(HaystackError::CrcNotValid) | Err(HaystackError::MagicNumber) => {
                tracing::warn!(
                    offset,
                    key = header.key,
                    alternate_key = header.alternate_key,
                    "skipping needle with bad checksum"
                );
                report.needles_corrupted += 1;
                offset += record_len as u64;
                continue;
            }
            Err(e) => return Err(e),
        }

        // Step 6: Apply
        let key = header.key_pair();
        if header.is_deleted() {
            index.remove(&key);
            report.tombstones += 1;
        } else {
            index.insert(
                key,
                NeedleMeta {
                    offset,
                    size: header.size,
                },
            );
            report.needles_recovered += 1;
        }

        offset += record_len as u64;
    }

    if report.was_truncated {
        tracing::warn!(
            offset,
            dropped = file_len - offset,
            "truncating torn needle at end of volume"
        );
        file.set_len(offset)?;
    }

    report.end_offset = offset;
    report.live_needles = index.len() as u64;

    Ok((index, report))
}

/// Error for a record longer than every buffer class in `pool`
///
/// A complete record with a valid checksum was written through a larger pool
/// and is reported as `TooLarge`; reopening with larger classes reads it.
fn reject_oversized(
    file: &File,
    pool: &BufferPool,
    offset: u64,
    size: u32,
    record_len: usize,
    remaining: u64,
) -> HaystackError {
    let largest = pool.largest_class();

    if record_len as u64 <= remaining {
        match record_is_intact(file, pool, offset, size) {
            Ok(true) => {
                tracing::warn!(
                    offset,
                    record_len,
                    largest,
                    "needle larger than every buffer class; reopen with a larger pool"
                );
                return HaystackError::TooLarge {
                    requested: record_len,
                    largest,
                };
            }
            Ok(false) => {}
            Err(e) => return e,
        }
    }

    HaystackError::CorruptVolume {
        offset,
        reason: format!(
            "record of {} bytes exceeds the largest buffer class ({}) and is not intact",
            record_len, largest
        ),
    }
}

/// Checksum a record of `size` payload bytes in pool-sized chunks
fn record_is_intact(file: &File, pool: &BufferPool, offset: u64, size: u32) -> Result<bool> {
    let body_len = HEADER_SIZE as u64 + u64::from(size);
    let chunk_len = pool.largest_class().min(STREAM_CHUNK);
    let mut chunk = pool.checkout(chunk_len)?;
    chunk.resize(chunk_len, 0);

    let mut hasher = checksum::Hasher::new();
    let mut pos = 0u64;
    while pos < body_len {
        let n = (body_len - pos).min(chunk_len as u64) as usize;
        pio::read_exact_at(file, &mut chunk[..n], offset + pos)?;
        hasher.update(&chunk[..n]);
        pos += n as u64;
    }

    let mut footer_bytes = [0u8; FOOTER_SIZE];
    pio::read_exact_at(file, &mut footer_bytes, offset + body_len)?;
    let mut footer = &footer_bytes[..];
    let stored_crc = footer.get_u32();
    let footer_magic = footer.get_u32();

    Ok(stored_crc == hasher.finalize() && footer_magic == MAGIC_FOOTER)
}

/// Look for a complete, checksum-valid needle at an aligned offset after
/// `offset`
///
/// Only called when the record at `offset` runs past the end of the file, so
/// the `remaining` bytes are shorter than one buffer class.
fn find_intact_needle(
    file: &File,
    pool: &BufferPool,
    offset: u64,
    remaining: u64,
) -> Result<Option<u64>> {
    let tail_len = usize::try_from(remaining).map_err(|_| HaystackError::Overflow {
        value: remaining,
        target: "usize",
    })?;
    let mut tail = pool.checkout(tail_len)?;
    tail.resize(tail_len, 0);
    pio::read_exact_at(file, &mut tail[..], offset)?;

    let found = (ALIGNMENT..tail_len).step_by(ALIGNMENT).find(|&rel| {
        let block = &tail[rel..];
        needle::decode_header(block)
            .and_then(|header| needle::extract_payload(block, header.size as usize))
            .is_ok()
    });

    Ok(found.map(|rel| offset + rel as u64))
}
