//! Tests for the needle codec
//!
//! These tests verify:
//! - Exact byte layout of encoded needles (offsets, endianness, padding)
//! - Decoding recovers every header field and the payload
//! - Validation order: length, magic, cookie, tombstone
//! - CRC detection of any flipped header or payload byte
//! - Size and capacity errors

use haystack::checksum::crc32;
use haystack::needle::{
    decode_header, extract_payload, padded_len, payload_size, unpadded_len, validate_block, Needle,
    FLAG_DELETED, FLAG_OFFSET, FOOTER_SIZE, HEADER_SIZE, MAGIC_FOOTER, MAGIC_HEADER,
    MIN_BLOCK_SIZE,
};
use haystack::{BufferPool, HaystackError, KeyPair};

// =============================================================================
// Helper Functions
// =============================================================================

fn encode(needle: &Needle) -> Vec<u8> {
    let pool = BufferPool::default();
    let buf = needle.encode(&pool).unwrap();
    buf.to_vec()
}

fn sample_needle() -> Needle {
    Needle::new(100, 50, 9999, b"hello world data".to_vec())
}

// =============================================================================
// Format Constants Tests
// =============================================================================

#[test]
fn test_magic_numbers_distinct_and_non_zero() {
    assert_ne!(MAGIC_HEADER, 0);
    assert_ne!(MAGIC_FOOTER, 0);
    assert_ne!(MAGIC_HEADER, MAGIC_FOOTER);
}

#[test]
fn test_record_lengths() {
    assert_eq!(unpadded_len(0).unwrap(), 37);
    assert_eq!(padded_len(0).unwrap(), 40);
    assert_eq!(unpadded_len(16).unwrap(), 53);
    assert_eq!(padded_len(16).unwrap(), 56);
    assert_eq!(padded_len(17).unwrap(), 56);
    assert_eq!(padded_len(4096).unwrap(), 4136);
    assert_eq!(padded_len(3).unwrap(), 40);
}

#[test]
fn test_record_length_overflow() {
    assert!(matches!(
        unpadded_len(usize::MAX),
        Err(HaystackError::Overflow { .. })
    ));
    assert!(matches!(
        padded_len(usize::MAX - HEADER_SIZE - FOOTER_SIZE),
        Err(HaystackError::Overflow { .. })
    ));
}

// =============================================================================
// Encoding Layout Tests
// =============================================================================

#[test]
fn test_encode_field_offsets() {
    let needle = Needle::new(0x0102_0304_0506_0708, 0x0A0B_0C0D, 0x1112_1314_1516_1718, b"abc".to_vec());

    let bytes = encode(&needle);

    assert_eq!(bytes.len(), 40);
    assert_eq!(&bytes[0..4], &MAGIC_HEADER.to_be_bytes());
    assert_eq!(&bytes[4..12], &0x1112_1314_1516_1718u64.to_be_bytes());
    assert_eq!(&bytes[12..20], &0x0102_0304_0506_0708u64.to_be_bytes());
    assert_eq!(&bytes[20..24], &0x0A0B_0C0Du32.to_be_bytes());
    assert_eq!(bytes[24], 0);
    assert_eq!(&bytes[25..29], &3u32.to_be_bytes());
    assert_eq!(&bytes[29..32], b"abc");
    assert_eq!(&bytes[32..36], &crc32(&bytes[..32]).to_be_bytes());
    assert_eq!(&bytes[36..40], &MAGIC_FOOTER.to_be_bytes());
}

#[test]
fn test_encode_pads_with_zeros() {
    let needle = sample_needle();
    let payload_len = needle.data.len();

    let bytes = encode(&needle);

    // 29 + 16 + 8 = 53, padded to 56
    assert_eq!(bytes.len(), 56);
    assert_eq!(bytes.len(), needle.record_len().unwrap());
    let footer_end = HEADER_SIZE + payload_len + FOOTER_SIZE;
    assert!(bytes[footer_end..].iter().all(|&b| b == 0));
}

#[test]
fn test_encoded_length_always_aligned() {
    for payload_len in 0..=64usize {
        let needle = Needle::new(1, 2, 3, vec![0xAB; payload_len]);

        let bytes = encode(&needle);

        assert_eq!(bytes.len() % 8, 0, "payload {}", payload_len);
        assert_eq!(bytes.len(), padded_len(payload_len).unwrap());
        assert!(bytes.len() - (HEADER_SIZE + payload_len + FOOTER_SIZE) < 8);
    }
}

#[test]
fn test_encode_checksum_excludes_padding_and_footer() {
    let needle = Needle::new(7, 7, 7, b"x".to_vec());

    let bytes = encode(&needle);

    let body_len = HEADER_SIZE + 1;
    let stored = u32::from_be_bytes(bytes[body_len..body_len + 4].try_into().unwrap());
    assert_eq!(stored, crc32(&bytes[..body_len]));
}

#[test]
fn test_encode_uses_pool_class() {
    let pool = BufferPool::new(&[64, 1024]).unwrap();
    let needle = sample_needle();

    let buf = needle.encode(&pool).unwrap();

    assert_eq!(buf.capacity(), 64);
    assert_eq!(buf.len(), 56);
    pool.put(buf);
    assert_eq!(pool.idle_count(64), Some(1));
}

#[test]
fn test_encode_too_large_for_pool() {
    let pool = BufferPool::new(&[64]).unwrap();
    let needle = Needle::new(1, 1, 1, vec![0u8; 100]);

    let result = needle.encode(&pool);

    assert!(matches!(result, Err(HaystackError::TooLarge { .. })));
}

#[test]
fn test_encode_size_mismatch() {
    let pool = BufferPool::default();
    let mut needle = Needle::new(1, 1, 1, b"abc".to_vec());
    needle.header.size = 5;

    let result = needle.encode(&pool);

    assert!(matches!(
        result,
        Err(HaystackError::SizeMismatch {
            declared: 5,
            actual: 3
        })
    ));
}

#[test]
fn test_encode_rejects_foreign_magic() {
    let pool = BufferPool::default();

    let mut needle = sample_needle();
    needle.header.magic = MAGIC_HEADER ^ 1;
    assert!(matches!(needle.encode(&pool), Err(HaystackError::MagicNumber)));

    let mut needle = sample_needle();
    needle.footer.magic = MAGIC_HEADER;
    assert!(matches!(needle.encode(&pool), Err(HaystackError::MagicNumber)));
}

#[test]
fn test_try_new_matches_new() {
    let needle = Needle::try_new(100, 50, 9999, b"hello world data".to_vec()).unwrap();

    assert_eq!(needle, sample_needle());
    assert_eq!(needle.header.size, 16);
}

#[test]
fn test_payload_size_limits() {
    assert_eq!(payload_size(0).unwrap(), 0);
    assert_eq!(payload_size(u32::MAX as usize).unwrap(), u32::MAX);

    #[cfg(target_pointer_width = "64")]
    assert!(matches!(
        payload_size(u32::MAX as usize + 1),
        Err(HaystackError::Overflow { target: "u32", .. })
    ));
}

// =============================================================================
// Decoding Tests
// =============================================================================

#[test]
fn test_decode_recovers_fields() {
    for payload in [Vec::new(), vec![1u8], b"hello world data".to_vec(), vec![0x5A; 1000]] {
        let needle = Needle::new(u64::MAX, u32::MAX, 42, payload.clone());
        let bytes = encode(&needle);

        let decoded = Needle::decode(&bytes).unwrap();

        assert_eq!(decoded.header, needle.header);
        assert_eq!(decoded.data, payload);
        assert_eq!(decoded.footer.magic, MAGIC_FOOTER);
        assert_eq!(
            decoded.footer.checksum,
            crc32(&bytes[..HEADER_SIZE + payload.len()])
        );
    }
}

#[test]
fn test_decode_header() {
    let bytes = encode(&sample_needle());

    let header = decode_header(&bytes).unwrap();

    assert_eq!(header.magic, MAGIC_HEADER);
    assert_eq!(header.cookie, 9999);
    assert_eq!(header.key, 100);
    assert_eq!(header.alternate_key, 50);
    assert_eq!(header.flags, 0);
    assert_eq!(header.size, 16);
    assert_eq!(header.key_pair(), KeyPair::new(100, 50));
}

#[test]
fn test_decode_header_bad_magic() {
    let mut bytes = encode(&sample_needle());
    bytes[0] ^= 0xFF;

    assert!(matches!(decode_header(&bytes), Err(HaystackError::MagicNumber)));
}

#[test]
fn test_decode_header_short_block() {
    let bytes = encode(&sample_needle());

    let result = decode_header(&bytes[..HEADER_SIZE - 1]);

    assert!(matches!(
        result,
        Err(HaystackError::BufferTooSmall {
            needed: 29,
            actual: 28
        })
    ));
}

#[test]
fn test_tombstone_encoding() {
    let tombstone = Needle::tombstone(100, 50, 9999);

    let bytes = encode(&tombstone);

    assert!(tombstone.is_deleted());
    assert_eq!(tombstone.header.size, 0);
    assert_eq!(bytes.len(), 40);
    assert_eq!(bytes[FLAG_OFFSET] & FLAG_DELETED, FLAG_DELETED);

    let decoded = Needle::decode(&bytes).unwrap();
    assert!(decoded.is_deleted());
    assert!(decoded.data.is_empty());
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_validate_block_ok() {
    let bytes = encode(&sample_needle());

    validate_block(&bytes, 9999).unwrap();
    validate_block(&bytes[..MIN_BLOCK_SIZE], 9999).unwrap();
}

#[test]
fn test_validate_block_too_small() {
    let bytes = encode(&sample_needle());

    let result = validate_block(&bytes[..MIN_BLOCK_SIZE - 1], 9999);

    assert!(matches!(
        result,
        Err(HaystackError::BufferTooSmall {
            needed: 25,
            actual: 24
        })
    ));
}

#[test]
fn test_validate_block_magic() {
    let mut bytes = encode(&sample_needle());
    bytes[0..4].copy_from_slice(&[0, 0, 0, 0]);

    assert!(matches!(
        validate_block(&bytes, 9999),
        Err(HaystackError::MagicNumber)
    ));
}

#[test]
fn test_validate_block_cookie() {
    let bytes = encode(&sample_needle());

    assert!(matches!(
        validate_block(&bytes, 1111),
        Err(HaystackError::Cookie)
    ));
}

#[test]
fn test_validate_block_deleted() {
    let bytes = encode(&Needle::tombstone(100, 50, 9999));

    assert!(matches!(
        validate_block(&bytes, 9999),
        Err(HaystackError::DataDeleted)
    ));
}

#[test]
fn test_validate_magic_checked_before_cookie() {
    let mut bytes = encode(&sample_needle());
    bytes[1] ^= 0xFF;

    assert!(matches!(
        validate_block(&bytes, 1111),
        Err(HaystackError::MagicNumber)
    ));
}

#[test]
fn test_validate_cookie_checked_before_tombstone() {
    let bytes = encode(&Needle::tombstone(100, 50, 9999));

    assert!(matches!(
        validate_block(&bytes, 1111),
        Err(HaystackError::Cookie)
    ));
}

#[test]
fn test_validate_ignores_other_flag_bits() {
    let mut bytes = encode(&sample_needle());
    bytes[FLAG_OFFSET] = 0x02;

    validate_block(&bytes, 9999).unwrap();
}

// =============================================================================
// Payload Extraction Tests
// =============================================================================

#[test]
fn test_extract_payload() {
    let needle = sample_needle();
    let bytes = encode(&needle);

    let payload = extract_payload(&bytes, needle.data.len()).unwrap();

    assert_eq!(payload, b"hello world data");
}

#[test]
fn test_extract_payload_from_unpadded_block() {
    let needle = sample_needle();
    let bytes = encode(&needle);
    let unpadded = unpadded_len(needle.data.len()).unwrap();

    let payload = extract_payload(&bytes[..unpadded], needle.data.len()).unwrap();

    assert_eq!(payload, needle.data.as_slice());
}

#[test]
fn test_extract_payload_detects_any_flipped_byte() {
    let needle = sample_needle();
    let bytes = encode(&needle);
    let body_len = HEADER_SIZE + needle.data.len();

    for i in 0..body_len {
        let mut corrupted = bytes.clone();
        corrupted[i] ^= 0xFF;

        let result = extract_payload(&corrupted, needle.data.len());

        assert!(
            matches!(result, Err(HaystackError::CrcNotValid)),
            "flip at byte {} not detected",
            i
        );
    }
}

#[test]
fn test_extract_payload_detects_bad_stored_checksum() {
    let needle = sample_needle();
    let mut bytes = encode(&needle);
    bytes[HEADER_SIZE + needle.data.len()] ^= 0x01;

    assert!(matches!(
        extract_payload(&bytes, needle.data.len()),
        Err(HaystackError::CrcNotValid)
    ));
}

#[test]
fn test_extract_payload_bad_footer_magic() {
    let needle = sample_needle();
    let mut bytes = encode(&needle);
    let footer_magic = HEADER_SIZE + needle.data.len() + 4;
    bytes[footer_magic] ^= 0xFF;

    assert!(matches!(
        extract_payload(&bytes, needle.data.len()),
        Err(HaystackError::MagicNumber)
    ));
}

#[test]
fn test_extract_payload_ignores_padding() {
    let needle = sample_needle();
    let mut bytes = encode(&needle);
    let last = bytes.len() - 1;
    bytes[last] = 0xEE;

    extract_payload(&bytes, needle.data.len()).unwrap();
}

#[test]
fn test_extract_payload_short_block() {
    let needle = sample_needle();
    let bytes = encode(&needle);

    let result = extract_payload(&bytes[..40], needle.data.len());

    assert!(matches!(
        result,
        Err(HaystackError::BufferTooSmall {
            needed: 53,
            actual: 40
        })
    ));
}

#[test]
fn test_extract_payload_wrong_length_fails_crc() {
    let needle = sample_needle();
    let bytes = encode(&needle);

    let result = extract_payload(&bytes, needle.data.len() - 1);

    assert!(matches!(result, Err(HaystackError::CrcNotValid)));
}
