//! Buffer Pool Module
//!
//! Size-classed, thread-safe recycling of I/O buffers.
//!
//! ## Responsibilities
//! - Hand out buffers whose capacity is the smallest class that fits a request
//! - Take buffers back and recycle them by capacity
//! - Pre-allocate buffers on warm-up so steady state avoids allocation bursts
//!
//! ## Layout
//! ```text
//!   get(size) ──► binary search classes ──► free-list[class].pop()
//!                                               │ (empty)
//!                                               ▼
//!                                     BytesMut::with_capacity(class)
//!
//!   ┌────────┬────────┬─────────┬────────┬─────────┐
//!   │  64 B  │ 1 KiB  │ 32 KiB  │ 1 MiB  │ 20 MiB  │   default classes
//!   ├────────┼────────┼─────────┼────────┼─────────┤
//!   │SegQueue│SegQueue│SegQueue │SegQueue│SegQueue │   one free-list each
//!   └────────┴────────┴─────────┴────────┴─────────┘
//! ```
//!
//! A buffer is exclusively owned by whoever holds it. Contents are not
//! cleared when it goes back to the pool, only its length is reset when it is
//! handed out again.

mod buffer;
mod buffer_pool;

pub use buffer::{Buffer, PooledBuffer};
pub use buffer_pool::BufferPool;

/// Default size classes: 64 B, 1 KiB, 32 KiB, 1 MiB, 20 MiB
pub const DEFAULT_SIZE_CLASSES: [usize; 5] = [
    64,
    1024,
    32 * 1024,
    1024 * 1024,
    20 * 1024 * 1024,
];
