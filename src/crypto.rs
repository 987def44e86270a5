//! Stream cipher
//!
//! AES-256-CTR over byte streams. Independent of the needle format; used to
//! encrypt blobs before they reach the flat-file backend.
//!
//! ## Stream Format
//! ```text
//! ┌──────────────┬─────────────────────────────────┐
//! │ IV (16)      │ Ciphertext (same length as input)│
//! └──────────────┴─────────────────────────────────┘
//! ```

use std::io::{ErrorKind, Read, Write};

use ctr::cipher::{KeyIvInit, StreamCipher};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::Result;
use crate::HaystackError;

type Aes256Ctr = ctr::Ctr128BE<aes::Aes256>;

/// AES-256 key length
pub const KEY_SIZE: usize = 32;

/// IV length: one AES block
pub const IV_SIZE: usize = 16;

/// Bytes processed per read/encrypt/write round
const CHUNK_SIZE: usize = 32 * 1024;

/// Generate a random AES-256 key
pub fn new_encryption_key() -> [u8; KEY_SIZE] {
    let mut key = [0u8; KEY_SIZE];
    OsRng.fill_bytes(&mut key);
    key
}

/// Encrypt `src` into `dst`, prefixed with a random IV
///
/// Returns the number of bytes written to `dst`, IV included.
pub fn copy_encrypt<R: Read, W: Write>(key: &[u8], mut src: R, mut dst: W) -> Result<u64> {
    let mut iv = [0u8; IV_SIZE];
    OsRng.fill_bytes(&mut iv);

    let mut cipher = new_cipher(key, &iv)?;
    dst.write_all(&iv)?;

    let written = copy_stream(&mut cipher, &mut src, &mut dst)?;
    Ok(IV_SIZE as u64 + written)
}

/// Read the IV from `src` and decrypt the rest into `dst`
///
/// Returns the number of plaintext bytes written.
pub fn copy_decrypt<R: Read, W: Write>(key: &[u8], mut src: R, mut dst: W) -> Result<u64> {
    let mut iv = [0u8; IV_SIZE];
    src.read_exact(&mut iv).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => {
            HaystackError::Crypto("stream shorter than its initialization vector".to_string())
        }
        _ => HaystackError::Io(e),
    })?;

    let mut cipher = new_cipher(key, &iv)?;
    copy_stream(&mut cipher, &mut src, &mut dst)
}

fn new_cipher(key: &[u8], iv: &[u8]) -> Result<Aes256Ctr> {
    Aes256Ctr::new_from_slices(key, iv).map_err(|_| {
        HaystackError::Crypto(format!(
            "invalid key length {} (expected {})",
            key.len(),
            KEY_SIZE
        ))
    })
}

fn copy_stream<R: Read, W: Write>(cipher: &mut Aes256Ctr, src: &mut R, dst: &mut W) -> Result<u64> {
    let mut chunk = vec![0u8; CHUNK_SIZE];
    let mut written = 0u64;

    loop {
        let n = match src.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };

        cipher.apply_keystream(&mut chunk[..n]);
        dst.write_all(&chunk[..n])?;
        written += n as u64;
    }

    dst.flush()?;
    Ok(written)
}
