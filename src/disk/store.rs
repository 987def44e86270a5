//! DiskStore implementation

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::crypto;
use crate::error::Result;
use crate::HaystackError;

use super::path::{identity_transform, PathKey, PathTransform};
use super::Store;

/// Root directory used when none is configured
pub const DEFAULT_ROOT: &str = "root";

/// Flat-file blob store rooted at a directory
pub struct DiskStore {
    /// Directory every blob path is resolved under
    root: PathBuf,

    /// Key → relative path
    transform: PathTransform,
}

impl DiskStore {
    /// Create a new store builder
    pub fn builder() -> DiskStoreBuilder {
        DiskStoreBuilder::default()
    }

    /// Store rooted at `root` using the identity transform
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::builder().root(root).build()
    }

    /// The root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Encrypt `reader` with `enc_key` and store it under `key`
    ///
    /// Returns bytes written to disk, IV included.
    pub fn write_encrypted<R: Read>(&self, enc_key: &[u8], key: &str, reader: R) -> Result<u64> {
        let file = self.open_write_file(key)?;
        let mut writer = io::BufWriter::new(file);
        let written = crypto::copy_encrypt(enc_key, reader, &mut writer)?;
        writer.flush()?;
        Ok(written)
    }

    /// Decrypt the blob under `key` into `writer`
    ///
    /// Returns plaintext bytes written.
    pub fn read_decrypted<W: Write>(&self, enc_key: &[u8], key: &str, writer: W) -> Result<u64> {
        let file = self.open_read_file(key)?;
        crypto::copy_decrypt(enc_key, io::BufReader::new(file), writer)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Transform `key` and reject anything that would escape the root
    fn resolve(&self, key: &str) -> Result<PathKey> {
        if key.is_empty() {
            return Err(HaystackError::InvalidKey("empty key".to_string()));
        }

        if key.contains(['/', '\\']) {
            return Err(HaystackError::InvalidKey(format!(
                "key {:?} contains a path separator",
                key
            )));
        }

        let path_key = (self.transform)(key);
        if path_key.file_name.is_empty() {
            return Err(HaystackError::InvalidKey(format!(
                "key {:?} maps to an empty file name",
                key
            )));
        }

        let escapes = path_key
            .full_path()
            .components()
            .any(|component| !matches!(component, Component::Normal(_)));
        if escapes {
            return Err(HaystackError::InvalidKey(format!(
                "key {:?} maps outside the store root",
                key
            )));
        }

        Ok(path_key)
    }

    fn open_write_file(&self, key: &str) -> Result<File> {
        let path_key = self.resolve(key)?;
        fs::create_dir_all(self.root.join(&path_key.dir))?;
        Ok(File::create(self.root.join(path_key.full_path()))?)
    }

    fn open_read_file(&self, key: &str) -> Result<File> {
        let path_key = self.resolve(key)?;
        Ok(File::open(self.root.join(path_key.full_path()))?)
    }
}

impl Store for DiskStore {
    type Reader = File;

    fn has(&self, key: &str) -> bool {
        self.resolve(key)
            .map(|path_key| self.root.join(path_key.full_path()).exists())
            .unwrap_or(false)
    }

    fn write(&self, key: &str, reader: &mut dyn Read) -> Result<u64> {
        let mut file = self.open_write_file(key)?;
        let written = io::copy(reader, &mut file)?;
        Ok(written)
    }

    fn read(&self, key: &str) -> Result<(u64, File)> {
        let file = self.open_read_file(key)?;
        let size = file.metadata()?.len();
        Ok((size, file))
    }
}

/// Builder for DiskStore
pub struct DiskStoreBuilder {
    root: PathBuf,
    transform: PathTransform,
}

impl Default for DiskStoreBuilder {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            transform: Arc::new(identity_transform),
        }
    }
}

impl DiskStoreBuilder {
    /// Set the root directory
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Set the key → path transform
    pub fn path_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(&str) -> PathKey + Send + Sync + 'static,
    {
        self.transform = Arc::new(transform);
        self
    }

    pub fn build(self) -> DiskStore {
        DiskStore {
            root: self.root,
            transform: self.transform,
        }
    }
}
