//! Comparers decide whether a discovered entry is published
//!
//! A search holds an ordered set of comparers combined with AND semantics.
//! An empty set accepts everything.

use crate::error::{FindError, Result};
use crate::fs::item::{Entry, FileItem};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::fmt;
use std::sync::Arc;

/// Predicate consulted on the worker thread for every candidate entry
///
/// Implementations must be cheap and must not block: they run inline with
/// the traversal.
pub trait Comparer<T>: Send + Sync {
    /// Return `true` to accept `item`
    fn matches(&self, item: &T) -> bool;
}

impl<T, F> Comparer<T> for F
where
    F: Fn(&T) -> bool + Send + Sync,
{
    fn matches(&self, item: &T) -> bool {
        self(item)
    }
}

/// Frozen, ordered set of comparers
///
/// Cloning is cheap; clones share the same comparers.
pub struct ComparerSet<T> {
    comparers: Arc<[Arc<dyn Comparer<T>>]>,
}

impl<T> ComparerSet<T> {
    /// Freeze a list of comparers
    pub fn new(comparers: Vec<Arc<dyn Comparer<T>>>) -> Self {
        Self {
            comparers: comparers.into(),
        }
    }

    /// Check an item against every comparer
    pub fn matches(&self, item: &T) -> bool {
        self.comparers.iter().all(|c| c.matches(item))
    }

    /// Number of comparers in the set
    pub fn len(&self) -> usize {
        self.comparers.len()
    }

    /// Check if the set accepts everything
    pub fn is_empty(&self) -> bool {
        self.comparers.is_empty()
    }
}

impl<T> Clone for ComparerSet<T> {
    fn clone(&self) -> Self {
        Self {
            comparers: Arc::clone(&self.comparers),
        }
    }
}

impl<T> fmt::Debug for ComparerSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComparerSet")
            .field("len", &self.comparers.len())
            .finish()
    }
}

/// Glob match on the entry's file name
///
/// Several patterns may be given separated by `;` (e.g. `*.txt;*.md`); an
/// entry matching any of them is accepted. Matching is case-insensitive on
/// Windows.
#[derive(Debug, Clone)]
pub struct NameMask {
    pattern: String,
    matcher: GlobSet,
}

impl NameMask {
    /// Compile a name mask
    pub fn new(pattern: &str) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        let mut count = 0;

        for part in pattern.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let glob = GlobBuilder::new(part)
                .case_insensitive(cfg!(windows))
                .literal_separator(true)
                .build()
                .map_err(|e| FindError::config(format!("Invalid name mask '{}': {}", part, e)))?;
            builder.add(glob);
            count += 1;
        }

        if count == 0 {
            return Err(FindError::config(format!("Empty name mask '{}'", pattern)));
        }

        let matcher = builder
            .build()
            .map_err(|e| FindError::config(format!("Failed to build name mask: {}", e)))?;

        Ok(Self {
            pattern: pattern.to_string(),
            matcher,
        })
    }

    /// The mask as written
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Check a bare file name
    pub fn is_match(&self, name: &str) -> bool {
        self.matcher.is_match(name)
    }

    /// An empty or bare `*` mask accepts every name and needs no comparer
    pub fn accepts_all(pattern: &str) -> bool {
        matches!(pattern.trim(), "" | "*")
    }
}

impl<T: Entry> Comparer<T> for NameMask {
    fn matches(&self, item: &T) -> bool {
        self.is_match(&item.name())
    }
}

/// Rejects entries whose name starts with a dot
#[derive(Debug, Clone, Copy, Default)]
pub struct HiddenFilter;

impl<T: Entry> Comparer<T> for HiddenFilter {
    fn matches(&self, item: &T) -> bool {
        !item.name().starts_with('.')
    }
}

/// Accepts files whose extension is in an allow-list (case-insensitive)
#[derive(Debug, Clone)]
pub struct ExtensionFilter {
    extensions: Vec<String>,
}

impl ExtensionFilter {
    /// Build from extensions, with or without the leading dot
    pub fn new<I, S>(extensions: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized = Vec::new();
        for ext in extensions {
            let ext = ext.as_ref().trim().trim_start_matches('.').to_lowercase();
            if ext.is_empty() {
                return Err(FindError::config("Empty extension in extension filter"));
            }
            normalized.push(ext);
        }
        Ok(Self {
            extensions: normalized,
        })
    }
}

impl Comparer<FileItem> for ExtensionFilter {
    fn matches(&self, item: &FileItem) -> bool {
        item.extension()
            .map(|ext| {
                let ext = ext.to_lowercase();
                self.extensions.iter().any(|e| *e == ext)
            })
            .unwrap_or(false)
    }
}

/// Accepts files whose size lies within an inclusive range
#[derive(Debug, Clone, Copy)]
pub struct SizeRange {
    min: Option<u64>,
    max: Option<u64>,
}

impl SizeRange {
    /// Create a size range; either bound may be open
    pub fn new(min: Option<u64>, max: Option<u64>) -> Result<Self> {
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Err(FindError::config(format!(
                    "Minimum size {} exceeds maximum size {}",
                    humansize::format_size(lo, humansize::BINARY),
                    humansize::format_size(hi, humansize::BINARY)
                )));
            }
        }
        Ok(Self { min, max })
    }
}

impl Comparer<FileItem> for SizeRange {
    fn matches(&self, item: &FileItem) -> bool {
        self.min.map_or(true, |min| item.size >= min) && self.max.map_or(true, |max| item.size <= max)
    }
}
