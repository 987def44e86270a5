//! Configuration for haystack
//!
//! Centralized configuration with sensible defaults.

use crate::pool::DEFAULT_SIZE_CLASSES;

/// Number of buffers pre-allocated per size class by a warm-up
pub const DEFAULT_WARM_UP_COUNT: usize = 50;

/// Configuration shared by the buffer pool and the volumes built on it
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Buffer Pool Configuration
    // -------------------------------------------------------------------------
    /// Buffer capacities recycled by the pool, strictly ascending (bytes)
    pub size_classes: Vec<usize>,

    /// Buffers allocated per class by `BufferPool::warm_up`
    pub warm_up_count: usize,

    // -------------------------------------------------------------------------
    // Volume Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: when appended needles are forced to disk
    pub sync_strategy: SyncStrategy,
}

/// Volume sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// Never sync implicitly; callers use `Volume::sync`
    Never,

    /// `sync_data` after every append (safest, slowest)
    EveryWrite,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            size_classes: DEFAULT_SIZE_CLASSES.to_vec(),
            warm_up_count: DEFAULT_WARM_UP_COUNT,
            sync_strategy: SyncStrategy::Never,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the buffer pool size classes (ascending, in bytes)
    pub fn size_classes(mut self, classes: impl Into<Vec<usize>>) -> Self {
        self.config.size_classes = classes.into();
        self
    }

    /// Set how many buffers per class a warm-up allocates
    pub fn warm_up_count(mut self, count: usize) -> Self {
        self.config.warm_up_count = count;
        self
    }

    /// Set the volume sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
