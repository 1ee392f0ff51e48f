//! File finder
//!
//! Runs the two-stage file walk: a discovery worker feeds directories into an
//! internal directory queue and a listing worker turns them into files on the
//! output queue. Both queues are bounded independently.
//!
//! ```no_run
//! use treefind::FileFinder;
//!
//! let finder = FileFinder::builder("/var/log")
//!     .file_mask("*.log;*.gz")
//!     .file_capacity(256)
//!     .on_error(|e: &treefind::FindError| eprintln!("{}", e))
//!     .start()
//!     .unwrap();
//!
//! while let Some(file) = finder.get_next(None) {
//!     println!("{} ({} bytes)", file.path.display(), file.size);
//! }
//! ```

use crate::config::FileSearchConfig;
use crate::core::file_walker::{DirectoryDiscovery, FileLister};
use crate::core::hooks::{ErrorHook, ErrorSink, FoundHook, Publisher, SearchCounters};
use crate::core::queue::BoundedItemQueue;
use crate::core::runtime::{FinderState, SearchRuntime, SearchStats};
use crate::error::Result;
use crate::fs::{
    resolve_base, Comparer, ComparerSet, DirectoryItem, ExtensionFilter, FileItem, HiddenFilter, NameMask,
    SizeRange,
};
use crate::progress::ProgressEstimate;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

type DirectoryComparers = Vec<Arc<dyn Comparer<DirectoryItem>>>;
type FileComparers = Vec<Arc<dyn Comparer<FileItem>>>;

/// Configuration stage of a file search
pub struct FileFinderBuilder {
    config: FileSearchConfig,
    directory_comparers: DirectoryComparers,
    file_comparers: FileComparers,
    found_directory: Option<Arc<dyn FoundHook<DirectoryItem>>>,
    found_file: Option<Arc<dyn FoundHook<FileItem>>>,
    error: Option<Arc<dyn ErrorHook>>,
}

impl FileFinderBuilder {
    /// Start from defaults with the given base directory
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self::from_config(FileSearchConfig {
            base: base.into(),
            ..Default::default()
        })
    }

    /// Start from an existing configuration
    pub fn from_config(config: FileSearchConfig) -> Self {
        Self {
            config,
            directory_comparers: Vec::new(),
            file_comparers: Vec::new(),
            found_directory: None,
            found_file: None,
            error: None,
        }
    }

    /// File name mask (glob, `;`-separated)
    pub fn file_mask(mut self, mask: impl Into<String>) -> Self {
        self.config.file_mask = Some(mask.into());
        self
    }

    /// Directory name mask; non-matching directories are not descended
    pub fn directory_mask(mut self, mask: impl Into<String>) -> Self {
        self.config.directory_mask = Some(mask.into());
        self
    }

    /// Capacity of the internal directory queue (0 = unbounded)
    pub fn directory_capacity(mut self, capacity: usize) -> Self {
        self.config.directory_capacity = capacity;
        self
    }

    /// Capacity of the output file queue (0 = unbounded)
    pub fn file_capacity(mut self, capacity: usize) -> Self {
        self.config.file_capacity = capacity;
        self
    }

    /// Follow symbolic links
    pub fn follow_links(mut self, follow: bool) -> Self {
        self.config.follow_links = follow;
        self
    }

    /// Include entries whose name starts with a dot
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.config.include_hidden = include;
        self
    }

    /// Only accept files with one of these extensions
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Minimum file size in bytes
    pub fn min_size(mut self, bytes: u64) -> Self {
        self.config.min_size = Some(bytes);
        self
    }

    /// Maximum file size in bytes
    pub fn max_size(mut self, bytes: u64) -> Self {
        self.config.max_size = Some(bytes);
        self
    }

    /// Interval between poll callback invocations in `get_next`
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval_ms = interval.as_millis().max(1) as u64;
        self
    }

    /// Add a directory comparer
    pub fn directory_comparer(mut self, comparer: impl Comparer<DirectoryItem> + 'static) -> Self {
        self.directory_comparers.push(Arc::new(comparer));
        self
    }

    /// Add a file comparer
    pub fn file_comparer(mut self, comparer: impl Comparer<FileItem> + 'static) -> Self {
        self.file_comparers.push(Arc::new(comparer));
        self
    }

    /// Hook run for each accepted directory
    ///
    /// A directory claimed by the hook is still descended, but its own files
    /// are not listed.
    pub fn on_found_directory(mut self, hook: impl FoundHook<DirectoryItem> + 'static) -> Self {
        self.found_directory = Some(Arc::new(hook));
        self
    }

    /// Hook run before each accepted file is queued
    pub fn on_found_file(mut self, hook: impl FoundHook<FileItem> + 'static) -> Self {
        self.found_file = Some(Arc::new(hook));
        self
    }

    /// Hook run once for each path that cannot be read
    pub fn on_error(mut self, hook: impl ErrorHook + 'static) -> Self {
        self.error = Some(Arc::new(hook));
        self
    }

    /// Current configuration
    pub fn config(&self) -> &FileSearchConfig {
        &self.config
    }

    /// Always [`FinderState::Created`]
    pub fn state(&self) -> FinderState {
        FinderState::Created
    }

    fn build_directory_comparers(&mut self) -> Result<ComparerSet<DirectoryItem>> {
        let mut comparers: DirectoryComparers = Vec::new();
        if let Some(mask) = self.config.directory_mask.as_deref().filter(|m| !NameMask::accepts_all(m)) {
            comparers.push(Arc::new(NameMask::new(mask)?));
        }
        if !self.config.include_hidden {
            comparers.push(Arc::new(HiddenFilter));
        }
        comparers.append(&mut self.directory_comparers);
        Ok(ComparerSet::new(comparers))
    }

    fn build_file_comparers(&mut self) -> Result<ComparerSet<FileItem>> {
        let mut comparers: FileComparers = Vec::new();
        if let Some(mask) = self.config.file_mask.as_deref().filter(|m| !NameMask::accepts_all(m)) {
            comparers.push(Arc::new(NameMask::new(mask)?));
        }
        if !self.config.include_hidden {
            comparers.push(Arc::new(HiddenFilter));
        }
        if !self.config.extensions.is_empty() {
            comparers.push(Arc::new(ExtensionFilter::new(&self.config.extensions)?));
        }
        if self.config.min_size.is_some() || self.config.max_size.is_some() {
            comparers.push(Arc::new(SizeRange::new(self.config.min_size, self.config.max_size)?));
        }
        comparers.append(&mut self.file_comparers);
        Ok(ComparerSet::new(comparers))
    }

    /// Validate, freeze and launch both stages
    pub fn start(mut self) -> Result<FileFinder> {
        let base = resolve_base(&self.config.base)?;
        let directory_comparers = self.build_directory_comparers()?;
        let file_comparers = self.build_file_comparers()?;

        let shared_base: Arc<Path> = Arc::from(base.as_path());
        let counters = Arc::new(SearchCounters::default());
        let progress = Arc::new(ProgressEstimate::new());
        let errors = ErrorSink::new(self.error, Arc::clone(&counters));
        let poll_interval = self.config.poll_interval();

        let (directory_producer, directories) =
            BoundedItemQueue::new(self.config.directory_capacity, poll_interval);
        let directories = Arc::new(directories);
        let (file_producer, files) = BoundedItemQueue::new(self.config.file_capacity, poll_interval);

        let discovery = DirectoryDiscovery {
            base: Arc::clone(&shared_base),
            follow_links: self.config.follow_links,
            publisher: Publisher::new(
                directory_comparers,
                self.found_directory,
                directory_producer,
                Arc::clone(&counters),
            ),
            errors: errors.clone(),
            counters: Arc::clone(&counters),
        };
        let lister = FileLister {
            base: shared_base,
            follow_links: self.config.follow_links,
            directories: Arc::clone(&directories),
            publisher: Publisher::new(file_comparers, self.found_file, file_producer, Arc::clone(&counters)),
            errors,
            counters: Arc::clone(&counters),
            progress: Arc::clone(&progress),
        };

        let runtime = SearchRuntime::new(base, files, progress, counters).with_upstream(directories);
        runtime.spawn("treefind-discovery", move || discovery.run())?;
        runtime.spawn("treefind-files", move || lister.run())?;
        tracing::info!("File search started under {}", runtime.base().display());

        Ok(FileFinder {
            runtime,
            config: self.config,
        })
    }
}

/// A running file search
pub struct FileFinder {
    runtime: SearchRuntime<FileItem>,
    config: FileSearchConfig,
}

impl FileFinder {
    /// Begin configuring a search under `base`
    pub fn builder(base: impl Into<PathBuf>) -> FileFinderBuilder {
        FileFinderBuilder::new(base)
    }

    /// Resolved base directory
    pub fn base(&self) -> &Path {
        self.runtime.base()
    }

    /// Configuration the search was started with
    pub fn config(&self) -> &FileSearchConfig {
        &self.config
    }

    /// Current lifecycle state
    pub fn state(&self) -> FinderState {
        self.runtime.state()
    }

    /// Check if both stages finished and every file was retrieved
    pub fn is_completed(&self) -> bool {
        self.state() == FinderState::Completed
    }

    /// Retrieve up to `maximum` queued files (0 = all queued)
    ///
    /// With `wait`, blocks while the queue is empty and the walk is still
    /// running.
    pub fn get(&self, wait: bool, maximum: usize) -> Vec<FileItem> {
        self.runtime.get(wait, maximum)
    }

    /// Retrieve the next file, or `None` once the search is over
    ///
    /// `poll` runs periodically while waiting.
    pub fn get_next(&self, poll: Option<&mut dyn FnMut()>) -> Option<FileItem> {
        self.runtime.get_next(poll)
    }

    /// Iterate over results as they arrive
    pub fn iter(&self) -> impl Iterator<Item = FileItem> + '_ {
        std::iter::from_fn(move || self.get_next(None))
    }

    /// Rough completion estimate in `[0, 1]`; never decreases
    pub fn progress(&self) -> f64 {
        self.state();
        self.runtime.progress().get()
    }

    /// Counter snapshot covering both stages
    pub fn stats(&self) -> SearchStats {
        self.runtime.stats()
    }

    /// Stop both stages, discard queued results and join the workers
    ///
    /// Idempotent; also runs on drop.
    pub fn close(&self) {
        self.runtime.close();
    }
}
