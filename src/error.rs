//! Error types for haystack
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using HaystackError
pub type Result<T> = std::result::Result<T, HaystackError>;

/// Unified error type for haystack operations
#[derive(Debug, Error)]
pub enum HaystackError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Index Errors
    // -------------------------------------------------------------------------
    #[error("Needle not found: key={key} alternate_key={alternate_key}")]
    NotFound { key: u64, alternate_key: u32 },

    // -------------------------------------------------------------------------
    // Needle Validation Errors
    // -------------------------------------------------------------------------
    #[error("Magic number mismatch (corrupted header or offset drift)")]
    MagicNumber,

    #[error("Cookie mismatch")]
    Cookie,

    #[error("Needle data is deleted")]
    DataDeleted,

    #[error("Needle checksum is not valid")]
    CrcNotValid,

    #[error("Needle size mismatch: header declares {declared} bytes, data has {actual}")]
    SizeMismatch { declared: u32, actual: usize },

    // -------------------------------------------------------------------------
    // Capacity Errors
    // -------------------------------------------------------------------------
    #[error("Requested buffer too large: {requested} bytes (largest size class is {largest})")]
    TooLarge { requested: usize, largest: usize },

    #[error("Buffer too small: need {needed} bytes, got {actual}")]
    BufferTooSmall { needed: usize, actual: usize },

    #[error("Integer overflow: {value} does not fit in {target}")]
    Overflow { value: u64, target: &'static str },

    // -------------------------------------------------------------------------
    // Volume State Errors
    // -------------------------------------------------------------------------
    #[error("Corrupt volume at offset {offset}: {reason}")]
    CorruptVolume { offset: u64, reason: String },

    #[error("Volume write cursor is untrusted after a failed append; reload required")]
    VolumeFailed,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Collaborator Errors
    // -------------------------------------------------------------------------
    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}
