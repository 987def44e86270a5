//! BufferPool implementation
//!
//! One lock-free free-list per size class.

use crossbeam::queue::SegQueue;
use bytes::BytesMut;

use crate::config::{Config, DEFAULT_WARM_UP_COUNT};
use crate::error::Result;
use crate::HaystackError;

use super::{Buffer, PooledBuffer, DEFAULT_SIZE_CLASSES};

/// A single size class and its free-list
struct SizeClass {
    capacity: usize,
    free: SegQueue<BytesMut>,
}

impl SizeClass {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            free: SegQueue::new(),
        }
    }
}

/// Size-classed pool of reusable byte buffers
///
/// ## Concurrency:
/// - `get`/`put` take `&self` and may be called from any number of threads
/// - Each class free-list is a `SegQueue` (lock-free)
/// - The class list itself is immutable after construction
pub struct BufferPool {
    /// Size classes, ascending by capacity
    classes: Vec<SizeClass>,

    /// Buffers per class allocated by `warm_up`
    warm_up_count: usize,
}

impl BufferPool {
    /// Create a pool with the given size classes
    ///
    /// Classes must be non-empty, non-zero and strictly ascending.
    pub fn new(size_classes: &[usize]) -> Result<Self> {
        Self::with_classes(size_classes, DEFAULT_WARM_UP_COUNT)
    }

    /// Create a pool from a config (size classes + warm-up count)
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_classes(&config.size_classes, config.warm_up_count)
    }

    fn with_classes(size_classes: &[usize], warm_up_count: usize) -> Result<Self> {
        if size_classes.is_empty() {
            return Err(HaystackError::Config(
                "buffer pool needs at least one size class".to_string(),
            ));
        }

        if size_classes[0] == 0 {
            return Err(HaystackError::Config(
                "buffer pool size classes must be non-zero".to_string(),
            ));
        }

        if !size_classes.windows(2).all(|pair| pair[0] < pair[1]) {
            return Err(HaystackError::Config(format!(
                "buffer pool size classes must be strictly ascending: {:?}",
                size_classes
            )));
        }

        Ok(Self {
            classes: size_classes.iter().map(|&c| SizeClass::new(c)).collect(),
            warm_up_count,
        })
    }

    /// Get a buffer able to hold `size` bytes
    ///
    /// Returns a buffer from the smallest class >= `size`, with length 0 and
    /// the full class capacity. Fails with `TooLarge` if `size` exceeds the
    /// largest class.
    pub fn get(&self, size: usize) -> Result<Buffer> {
        let class = self.class_index(size).ok_or(HaystackError::TooLarge {
            requested: size,
            largest: self.largest_class(),
        })?;

        let class = &self.classes[class];
        let buffer = match class.free.pop() {
            Some(bytes) => Buffer::from_bytes(bytes),
            None => Buffer::with_capacity(class.capacity),
        };

        Ok(buffer)
    }

    /// Get a buffer that goes back to this pool when dropped
    pub fn checkout(&self, size: usize) -> Result<PooledBuffer<'_>> {
        Ok(PooledBuffer::new(self, self.get(size)?))
    }

    /// Return a buffer to the free-list matching its capacity
    ///
    /// Buffers whose capacity matches no class are dropped.
    pub fn put(&self, buffer: Buffer) {
        let capacity = buffer.capacity();

        match self
            .classes
            .binary_search_by_key(&capacity, |class| class.capacity)
        {
            Ok(idx) => self.classes[idx].free.push(buffer.into_bytes()),
            Err(_) => {
                if capacity > 0 {
                    tracing::trace!(capacity, "dropping buffer outside every size class");
                }
            }
        }
    }

    /// Pre-allocate the configured number of buffers in every class
    pub fn warm_up(&self) {
        self.warm_up_with(self.warm_up_count);
    }

    /// Pre-allocate `count` buffers in every class
    pub fn warm_up_with(&self, count: usize) {
        for class in &self.classes {
            for _ in 0..count {
                class.free.push(BytesMut::with_capacity(class.capacity));
            }
        }

        tracing::info!(
            classes = self.classes.len(),
            per_class = count,
            "buffer pool warmed up"
        );
    }

    /// The configured size classes, ascending
    pub fn size_classes(&self) -> Vec<usize> {
        self.classes.iter().map(|class| class.capacity).collect()
    }

    /// Capacity of the largest size class
    pub fn largest_class(&self) -> usize {
        self.classes.last().map(|class| class.capacity).unwrap_or(0)
    }

    /// Capacity of the class a request of `size` bytes would be served from
    pub fn class_for(&self, size: usize) -> Option<usize> {
        self.class_index(size).map(|idx| self.classes[idx].capacity)
    }

    /// Number of idle buffers in the class with capacity `class`
    pub fn idle_count(&self, class: usize) -> Option<usize> {
        self.classes
            .binary_search_by_key(&class, |c| c.capacity)
            .ok()
            .map(|idx| self.classes[idx].free.len())
    }

    fn class_index(&self, size: usize) -> Option<usize> {
        let idx = self.classes.partition_point(|class| class.capacity < size);
        (idx < self.classes.len()).then_some(idx)
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self {
            classes: DEFAULT_SIZE_CLASSES.iter().map(|&c| SizeClass::new(c)).collect(),
            warm_up_count: DEFAULT_WARM_UP_COUNT,
        }
    }
}

impl std::fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPool")
            .field("size_classes", &self.size_classes())
            .field("warm_up_count", &self.warm_up_count)
            .finish()
    }
}
