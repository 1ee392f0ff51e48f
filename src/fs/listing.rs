//! Single-level directory listing
//!
//! The walkers never recurse through walkdir itself; they ask for one level
//! at a time so they can filter, publish and check for shutdown between
//! directories. Listing is buffered and sorted by file name.

use crate::error::{FindError, IoResultExt, Result};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::{DirEntry, WalkDir};

/// Entries read from one directory, plus per-entry failures
///
/// A failure to open the directory itself is returned as `Err` by the
/// listing functions instead.
#[derive(Debug)]
pub struct Listing<T> {
    /// Entries that were read successfully
    pub entries: Vec<T>,
    /// Failures for individual entries (e.g. a file vanished before stat)
    pub errors: Vec<FindError>,
}

impl<T> Default for Listing<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            errors: Vec::new(),
        }
    }
}

/// Metadata for a listed file
#[derive(Debug, Clone)]
pub struct ListedFile {
    /// Absolute path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Modification time
    pub modified: Option<SystemTime>,
}

/// Resolve and validate a search base directory
pub fn resolve_base(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        return Err(FindError::NotFound(path.to_path_buf()));
    }

    let resolved = path.canonicalize().with_path(path)?;
    if !resolved.is_dir() {
        return Err(FindError::NotADirectory(resolved));
    }

    Ok(resolved)
}

fn walk_children(dir: &Path, follow_links: bool) -> Result<Listing<DirEntry>> {
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(follow_links)
        .sort_by_file_name();

    let mut listing = Listing::default();
    for entry in walker {
        match entry {
            Ok(e) => listing.entries.push(e),
            // Depth 0 means the directory itself could not be opened
            Err(err) if err.depth() == 0 => {
                let path = err.path().unwrap_or(dir).to_path_buf();
                return Err(FindError::io(path, err.into()));
            }
            Err(err) => listing.errors.push(err.into()),
        }
    }

    Ok(listing)
}

/// List the immediate subdirectories of `dir`
pub fn list_subdirectories(dir: &Path, follow_links: bool) -> Result<Listing<PathBuf>> {
    let children = walk_children(dir, follow_links)?;

    Ok(Listing {
        entries: children
            .entries
            .into_iter()
            .filter(|e| e.file_type().is_dir())
            .map(DirEntry::into_path)
            .collect(),
        errors: children.errors,
    })
}

/// List the regular files directly inside `dir`
pub fn list_files(dir: &Path, follow_links: bool) -> Result<Listing<ListedFile>> {
    let children = walk_children(dir, follow_links)?;
    let mut listing = Listing {
        entries: Vec::with_capacity(children.entries.len()),
        errors: children.errors,
    };

    for entry in children.entries {
        let file_type = entry.file_type();
        let metadata = if file_type.is_file() {
            entry.metadata().map_err(FindError::from)
        } else if file_type.is_symlink() {
            // Unfollowed link: listed when it points at a regular file
            std::fs::metadata(entry.path()).with_path(entry.path())
        } else {
            continue;
        };

        match metadata {
            Ok(metadata) if metadata.is_file() => listing.entries.push(ListedFile {
                size: metadata.len(),
                modified: metadata.modified().ok(),
                path: entry.into_path(),
            }),
            Ok(_) => {}
            Err(err) => listing.errors.push(err),
        }
    }

    Ok(listing)
}
