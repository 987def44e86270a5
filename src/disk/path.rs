//! Key to path transforms

use std::path::PathBuf;
use std::sync::Arc;

/// Relative location of a blob: a directory and a file name inside it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathKey {
    pub dir: String,
    pub file_name: String,
}

impl PathKey {
    /// `dir/file_name`, relative to the store root
    pub fn full_path(&self) -> PathBuf {
        PathBuf::from(&self.dir).join(&self.file_name)
    }
}

/// Maps a logical key to its `PathKey`
pub type PathTransform = Arc<dyn Fn(&str) -> PathKey + Send + Sync>;

/// Directory and file name are both the key
pub fn identity_transform(key: &str) -> PathKey {
    PathKey {
        dir: key.to_string(),
        file_name: key.to_string(),
    }
}

/// First two characters as the directory, the rest as the file name
///
/// Keys of two characters or fewer fall back to `identity_transform`.
pub fn prefix_transform(key: &str) -> PathKey {
    match key.char_indices().nth(2) {
        Some((split, _)) => PathKey {
            dir: key[..split].to_string(),
            file_name: key[split..].to_string(),
        },
        None => identity_transform(key),
    }
}
