//! Needle Module
//!
//! A needle is one stored object: header, payload, footer and padding,
//! written as a single contiguous record in a volume file.
//!
//! ## Record Format (big-endian)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ Header (29 bytes)                                                   │
//! │ ┌───────────┬──────────┬─────────┬─────────────┬──────────┬────────┐│
//! │ │ Magic (4) │Cookie (8)│ Key (8) │ AltKey (4)  │ Flag (1) │Size (4)││
//! │ └───────────┴──────────┴─────────┴─────────────┴──────────┴────────┘│
//! ├─────────────────────────────────────────────────────────────────────┤
//! │ Data (Size bytes)                                                   │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │ Footer (8 bytes)                                                    │
//! │ ┌────────────────────────────┬──────────────────────────┐           │
//! │ │ CRC32 of header+data (4)   │ Magic (4)                │           │
//! │ └────────────────────────────┴──────────────────────────┘           │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │ Zero padding up to the next multiple of 8                           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Offsets: magic `[0,4)`, cookie `[4,12)`, key `[12,20)`, alternate key
//! `[20,24)`, flag `[24]`, size `[25,29)`, data `[29, 29+Size)`.
//! Bit 0 of the flag byte marks a tombstone.
//!
//! Any change to field order, widths or the padding rule breaks existing
//! volume files.

mod codec;
mod entry;

pub use codec::{
    decode_header, extract_payload, padded_len, payload_size, unpadded_len, validate_block,
};
pub use entry::{Needle, NeedleFooter, NeedleHeader};

// =============================================================================
// Format Constants
// =============================================================================

/// Magic number at the start of every needle
pub const MAGIC_HEADER: u32 = 0x2DCF25 >> 1;

/// Magic number closing every needle footer
pub const MAGIC_FOOTER: u32 = 0x2DCF25 << 1;

/// Header size: Magic (4) + Cookie (8) + Key (8) + AltKey (4) + Flag (1) + Size (4)
pub const HEADER_SIZE: usize = 29;

/// Footer size: Checksum (4) + Magic (4)
pub const FOOTER_SIZE: usize = 8;

/// Records are padded to a multiple of this many bytes
pub const ALIGNMENT: usize = 8;

/// Bytes needed to validate a record: everything up to and including the flag byte
pub const MIN_BLOCK_SIZE: usize = 25;

/// Offset of the flag byte within a record
pub const FLAG_OFFSET: usize = 24;

/// Flag bit marking a soft-deleted needle
pub const FLAG_DELETED: u8 = 0x01;
