//! Pooled buffers
//!
//! `Buffer` is the owned handle the pool hands out; `PooledBuffer` returns it
//! to the pool when dropped.

use std::ops::{Deref, DerefMut};

use bytes::BytesMut;

use super::BufferPool;

/// An owned byte buffer whose capacity is one of the pool's size classes
///
/// Dereferences to `BytesMut`, so `BufMut` writers (`put_u32`, `put_slice`, ...)
/// work directly on it. Growing it past its capacity is allowed but the pool
/// will no longer recycle it.
#[derive(Debug, Default)]
pub struct Buffer {
    bytes: BytesMut,
}

impl Buffer {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: BytesMut::with_capacity(capacity),
        }
    }

    pub(crate) fn from_bytes(mut bytes: BytesMut) -> Self {
        bytes.clear();
        Self { bytes }
    }

    pub(crate) fn into_bytes(self) -> BytesMut {
        self.bytes
    }
}

impl Deref for Buffer {
    type Target = BytesMut;

    fn deref(&self) -> &Self::Target {
        &self.bytes
    }
}

impl DerefMut for Buffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.bytes
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// A buffer checked out of a pool, returned to it on drop
pub struct PooledBuffer<'a> {
    pool: &'a BufferPool,
    buffer: Buffer,
}

impl<'a> PooledBuffer<'a> {
    pub(crate) fn new(pool: &'a BufferPool, buffer: Buffer) -> Self {
        Self { pool, buffer }
    }

    /// Detach the buffer; the caller becomes responsible for returning it
    pub fn into_inner(mut self) -> Buffer {
        std::mem::take(&mut self.buffer)
    }
}

impl Deref for PooledBuffer<'_> {
    type Target = Buffer;

    fn deref(&self) -> &Self::Target {
        &self.buffer
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buffer
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        // A detached guard holds an empty zero-capacity buffer, which put() drops.
        self.pool.put(std::mem::take(&mut self.buffer));
    }
}
