//! Volume implementation
//!
//! Write, read and delete needles in one backing file.

use std::collections::HashMap;
use std::fs::File;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::{Config, SyncStrategy};
use crate::error::Result;
use crate::needle::{self, Needle, MIN_BLOCK_SIZE};
use crate::pool::{BufferPool, PooledBuffer};
use crate::HaystackError;

use super::pio;
use super::recovery::{self, RecoveryReport};
use super::{KeyPair, NeedleMeta};

/// Mutable volume state, guarded by one lock
#[derive(Default)]
struct VolumeState {
    /// (key, alternate_key) → latest needle location
    index: HashMap<KeyPair, NeedleMeta>,

    /// Offset of the next append; equals the file length after the last
    /// successful write and only moves forward between reloads
    write_offset: u64,

    /// Set when an append failed part-way; blocks writes until reload
    failed: bool,

    /// Report from the most recent reload
    last_recovery: RecoveryReport,
}

/// An append-only needle volume
///
/// ## Concurrency Model
///
/// - **Writes** (write/delete/reload): exclusive `state` lock held across the
///   positional write and the index update
/// - **Reads**: shared lock only for the index lookup; the positional read
///   and validation run unlocked
/// - Buffers come from the shared `BufferPool`, which needs no volume lock
///
/// The file is never read or written through its cursor, so readers and the
/// writer do not interfere on file position.
pub struct Volume {
    /// Backing file, opened and closed by the caller
    file: File,

    /// Pool all record buffers are drawn from
    pool: Arc<BufferPool>,

    /// Volume configuration
    config: Config,

    /// Index, write cursor and failure flag
    state: RwLock<VolumeState>,
}

impl Volume {
    /// Open a volume over an already-open file
    ///
    /// Scans the file to rebuild the index. A torn trailing record is cut off;
    /// a lost record boundary fails with `CorruptVolume`.
    pub fn open(file: File, pool: Arc<BufferPool>, config: Config) -> Result<Self> {
        let volume = Self {
            file,
            pool,
            config,
            state: RwLock::new(VolumeState::default()),
        };

        volume.reload()?;
        Ok(volume)
    }

    /// Open with a fresh default pool and default config
    pub fn open_default(file: File) -> Result<Self> {
        Self::open(file, Arc::new(BufferPool::default()), Config::default())
    }

    /// Rebuild the index from the backing file
    ///
    /// Also clears the failed state left by an interrupted append.
    pub fn reload(&self) -> Result<RecoveryReport> {
        let mut state = self.state.write();

        let (index, report) = recovery::scan(&self.file, &self.pool)?;

        if report.needles_recovered > 0 || report.needles_corrupted > 0 || report.was_truncated {
            tracing::info!(
                recovered = report.needles_recovered,
                tombstones = report.tombstones,
                corrupted = report.needles_corrupted,
                live = report.live_needles,
                end_offset = report.end_offset,
                truncated = report.was_truncated,
                "volume reloaded"
            );
        }

        state.index = index;
        state.write_offset = report.end_offset;
        state.failed = false;
        state.last_recovery = report.clone();

        Ok(report)
    }

    /// Append a needle and point its key at it
    ///
    /// On failure the index is left untouched. An I/O failure also marks the
    /// volume failed, since bytes past the write cursor may now be garbage.
    /// Writing a tombstone removes the key instead.
    pub fn write(&self, needle: &Needle) -> Result<()> {
        let record = PooledBuffer::new(&self.pool, needle.encode(&self.pool)?);
        let key = needle.key_pair();

        let mut state = self.state.write();
        let offset = self.append(&mut state, &record)?;

        if needle.is_deleted() {
            state.index.remove(&key);
        } else {
            state.index.insert(
                key,
                NeedleMeta {
                    offset,
                    size: needle.header.size,
                },
            );
        }

        tracing::debug!(
            key = key.key,
            alternate_key = key.alternate_key,
            offset,
            size = needle.header.size,
            "needle written"
        );

        Ok(())
    }

    /// Read the payload stored for `key`, checking it against `cookie`
    ///
    /// Fails with `NotFound`, `MagicNumber`, `Cookie`, `DataDeleted` or
    /// `CrcNotValid`. The returned bytes are a copy; no pool memory escapes.
    pub fn read(&self, key: KeyPair, cookie: u64) -> Result<Vec<u8>> {
        let meta = self
            .state
            .read()
            .index
            .get(&key)
            .copied()
            .ok_or(HaystackError::NotFound {
                key: key.key,
                alternate_key: key.alternate_key,
            })?;

        let record_len = meta.record_len()?;
        let mut record = self.pool.checkout(record_len)?;
        record.resize(record_len, 0);
        pio::read_exact_at(&self.file, &mut record[..], meta.offset)?;

        needle::validate_block(&record, cookie)?;
        let payload = needle::extract_payload(&record, meta.size as usize)?;

        tracing::debug!(
            key = key.key,
            alternate_key = key.alternate_key,
            offset = meta.offset,
            size = meta.size,
            "needle read"
        );

        Ok(payload.to_vec())
    }

    /// Delete `key` by appending a tombstone and dropping it from the index
    ///
    /// The stored needle must accept `cookie`; a wrong cookie fails with
    /// `Cookie` and deletes nothing.
    pub fn delete(&self, key: KeyPair, cookie: u64) -> Result<()> {
        let mut state = self.state.write();

        if state.failed {
            return Err(HaystackError::VolumeFailed);
        }

        let meta = state
            .index
            .get(&key)
            .copied()
            .ok_or(HaystackError::NotFound {
                key: key.key,
                alternate_key: key.alternate_key,
            })?;

        let mut prefix = [0u8; MIN_BLOCK_SIZE];
        pio::read_exact_at(&self.file, &mut prefix, meta.offset)?;
        needle::validate_block(&prefix, cookie)?;

        let tombstone = Needle::tombstone(key.key, key.alternate_key, cookie);
        let record = PooledBuffer::new(&self.pool, tombstone.encode(&self.pool)?);
        let offset = self.append(&mut state, &record)?;
        state.index.remove(&key);

        tracing::debug!(
            key = key.key,
            alternate_key = key.alternate_key,
            offset,
            "needle deleted"
        );

        Ok(())
    }

    /// Force appended needles to disk
    pub fn sync(&self) -> Result<()> {
        self.file.sync_data()?;
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Offset the next needle will be written at
    pub fn write_offset(&self) -> u64 {
        self.state.read().write_offset
    }

    /// Index entry for `key`, if any
    pub fn meta(&self, key: &KeyPair) -> Option<NeedleMeta> {
        self.state.read().index.get(key).copied()
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.state.read().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().index.is_empty()
    }

    /// Whether a failed append is blocking writes
    pub fn is_failed(&self) -> bool {
        self.state.read().failed
    }

    /// Report from the most recent reload
    pub fn last_recovery(&self) -> RecoveryReport {
        self.state.read().last_recovery.clone()
    }

    /// The shared buffer pool
    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    /// The volume configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Give the backing file back to the caller
    pub fn into_file(self) -> File {
        self.file
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Write `record` at the cursor and advance it (state lock held)
    fn append(&self, state: &mut VolumeState, record: &[u8]) -> Result<u64> {
        if state.failed {
            return Err(HaystackError::VolumeFailed);
        }

        let offset = state.write_offset;
        let written = pio::write_all_at(&self.file, record, offset).and_then(|()| {
            match self.config.sync_strategy {
                SyncStrategy::EveryWrite => self.file.sync_data(),
                SyncStrategy::Never => Ok(()),
            }
        });

        if let Err(e) = written {
            state.failed = true;
            tracing::warn!(offset, error = %e, "needle append failed; volume needs reload");
            return Err(e.into());
        }

        state.write_offset = offset + record.len() as u64;
        Ok(offset)
    }
}
