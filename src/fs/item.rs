//! Items published by the finders
//!
//! Both item kinds are immutable once built. The base directory is shared
//! through an `Arc<Path>` so thousands of items do not each carry their own
//! copy of it.

use serde::Serialize;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// Common view over a discovered filesystem entry
pub trait Entry: Send + Sync + 'static {
    /// Absolute path of the entry
    fn path(&self) -> &Path;

    /// Path relative to the search base
    fn relative_path(&self) -> &Path;

    /// Base directory of the search that found this entry
    fn base(&self) -> &Path;

    /// Final path component as UTF-8, lossily converted
    fn name(&self) -> std::borrow::Cow<'_, str> {
        self.path()
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default()
    }

    /// Depth below the base (direct children are depth 1)
    fn depth(&self) -> usize {
        self.relative_path().components().count()
    }
}

fn relative_to(path: &Path, base: &Path) -> PathBuf {
    path.strip_prefix(base).unwrap_or(path).to_path_buf()
}

/// A directory found beneath the search base
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryItem {
    /// Absolute path to the directory
    pub path: PathBuf,
    /// Path relative to the search base
    pub relative_path: PathBuf,
    #[serde(skip)]
    base: Arc<Path>,
}

impl DirectoryItem {
    /// Create an item for `path` found under `base`
    pub fn new(path: impl Into<PathBuf>, base: Arc<Path>) -> Self {
        let path = path.into();
        let relative_path = relative_to(&path, &base);
        Self {
            path,
            relative_path,
            base,
        }
    }
}

impl Entry for DirectoryItem {
    fn path(&self) -> &Path {
        &self.path
    }

    fn relative_path(&self) -> &Path {
        &self.relative_path
    }

    fn base(&self) -> &Path {
        &self.base
    }
}

impl PartialEq for DirectoryItem {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for DirectoryItem {}

impl Hash for DirectoryItem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

/// A file found beneath the search base
#[derive(Debug, Clone, Serialize)]
pub struct FileItem {
    /// Absolute path to the file
    pub path: PathBuf,
    /// Path relative to the search base
    pub relative_path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Modification time, when the platform reports one
    pub modified: Option<SystemTime>,
    #[serde(skip)]
    base: Arc<Path>,
}

impl FileItem {
    /// Create an item for `path` found under `base`
    pub fn new(path: impl Into<PathBuf>, base: Arc<Path>, size: u64, modified: Option<SystemTime>) -> Self {
        let path = path.into();
        let relative_path = relative_to(&path, &base);
        Self {
            path,
            relative_path,
            size,
            modified,
            base,
        }
    }

    /// File extension, if any
    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|e| e.to_str())
    }
}

impl Entry for FileItem {
    fn path(&self) -> &Path {
        &self.path
    }

    fn relative_path(&self) -> &Path {
        &self.relative_path
    }

    fn base(&self) -> &Path {
        &self.base
    }
}

impl PartialEq for FileItem {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for FileItem {}

impl Hash for FileItem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}
