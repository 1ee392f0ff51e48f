//! Directory finder
//!
//! [`DirectoryFinderBuilder`] collects configuration, comparers and hooks.
//! [`DirectoryFinderBuilder::start`] consumes it, validates the base
//! directory, freezes the comparers and launches one background walker. The
//! resulting [`DirectoryFinder`] only retrieves results and closes.
//!
//! ```no_run
//! use treefind::{DirectoryFinder, TraversalOrder};
//!
//! let finder = DirectoryFinder::builder("/data")
//!     .order(TraversalOrder::DeepestFirst)
//!     .capacity(64)
//!     .start()
//!     .unwrap();
//!
//! for dir in finder.iter() {
//!     println!("{}", dir.relative_path.display());
//! }
//! ```

use crate::config::{DirectorySearchConfig, TraversalOrder};
use crate::core::directory_walker::DirectoryWalker;
use crate::core::hooks::{ErrorHook, ErrorSink, FoundHook, Publisher, SearchCounters};
use crate::core::queue::BoundedItemQueue;
use crate::core::runtime::{FinderState, SearchRuntime, SearchStats};
use crate::error::Result;
use crate::fs::{resolve_base, Comparer, ComparerSet, DirectoryItem, HiddenFilter, NameMask};
use crate::progress::ProgressEstimate;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Configuration stage of a directory search
pub struct DirectoryFinderBuilder {
    config: DirectorySearchConfig,
    comparers: Vec<Arc<dyn Comparer<DirectoryItem>>>,
    found: Option<Arc<dyn FoundHook<DirectoryItem>>>,
    error: Option<Arc<dyn ErrorHook>>,
}

impl DirectoryFinderBuilder {
    /// Start from defaults with the given base directory
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self::from_config(DirectorySearchConfig {
            base: base.into(),
            ..Default::default()
        })
    }

    /// Start from an existing configuration
    pub fn from_config(config: DirectorySearchConfig) -> Self {
        Self {
            config,
            comparers: Vec::new(),
            found: None,
            error: None,
        }
    }

    /// Directory name mask (glob, `;`-separated)
    pub fn mask(mut self, mask: impl Into<String>) -> Self {
        self.config.mask = Some(mask.into());
        self
    }

    /// Publish order
    pub fn order(mut self, order: TraversalOrder) -> Self {
        self.config.order = order;
        self
    }

    /// Queue capacity (0 = unbounded)
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity;
        self
    }

    /// Follow symbolic links
    pub fn follow_links(mut self, follow: bool) -> Self {
        self.config.follow_links = follow;
        self
    }

    /// Include directories whose name starts with a dot
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.config.include_hidden = include;
        self
    }

    /// Interval between poll callback invocations in `get_next`
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval_ms = interval.as_millis().max(1) as u64;
        self
    }

    /// Add a comparer; every comparer must accept a directory
    pub fn comparer(mut self, comparer: impl Comparer<DirectoryItem> + 'static) -> Self {
        self.comparers.push(Arc::new(comparer));
        self
    }

    /// Hook run before each accepted directory is queued
    pub fn on_found(mut self, hook: impl FoundHook<DirectoryItem> + 'static) -> Self {
        self.found = Some(Arc::new(hook));
        self
    }

    /// Hook run for each directory that cannot be listed
    pub fn on_error(mut self, hook: impl ErrorHook + 'static) -> Self {
        self.error = Some(Arc::new(hook));
        self
    }

    /// Current configuration
    pub fn config(&self) -> &DirectorySearchConfig {
        &self.config
    }

    /// Always [`FinderState::Created`]
    pub fn state(&self) -> FinderState {
        FinderState::Created
    }

    /// Validate, freeze and launch the search
    pub fn start(self) -> Result<DirectoryFinder> {
        let base = resolve_base(&self.config.base)?;

        let mut comparers: Vec<Arc<dyn Comparer<DirectoryItem>>> = Vec::new();
        if let Some(mask) = self.config.mask.as_deref().filter(|m| !NameMask::accepts_all(m)) {
            comparers.push(Arc::new(NameMask::new(mask)?));
        }
        if !self.config.include_hidden {
            comparers.push(Arc::new(HiddenFilter));
        }
        comparers.extend(self.comparers);

        let shared_base: Arc<Path> = Arc::from(base.as_path());
        let counters = Arc::new(SearchCounters::default());
        let progress = Arc::new(ProgressEstimate::new());
        let (producer, queue) = BoundedItemQueue::new(self.config.capacity, self.config.poll_interval());

        let walker = DirectoryWalker {
            base: Arc::clone(&shared_base),
            order: self.config.order,
            follow_links: self.config.follow_links,
            publisher: Publisher::new(ComparerSet::new(comparers), self.found, producer, Arc::clone(&counters)),
            errors: ErrorSink::new(self.error, Arc::clone(&counters)),
            counters: Arc::clone(&counters),
            progress: Arc::clone(&progress),
            max_depth: 1,
        };

        let runtime = SearchRuntime::new(base, queue, progress, counters);
        runtime.spawn("treefind-dirs", move || walker.run())?;
        tracing::info!("Directory search started under {}", runtime.base().display());

        Ok(DirectoryFinder {
            runtime,
            config: self.config,
        })
    }
}

/// A running directory search
pub struct DirectoryFinder {
    runtime: SearchRuntime<DirectoryItem>,
    config: DirectorySearchConfig,
}

impl DirectoryFinder {
    /// Begin configuring a search under `base`
    pub fn builder(base: impl Into<PathBuf>) -> DirectoryFinderBuilder {
        DirectoryFinderBuilder::new(base)
    }

    /// Resolved base directory
    pub fn base(&self) -> &Path {
        self.runtime.base()
    }

    /// Configuration the search was started with
    pub fn config(&self) -> &DirectorySearchConfig {
        &self.config
    }

    /// Current lifecycle state
    pub fn state(&self) -> FinderState {
        self.runtime.state()
    }

    /// Check if the walk finished and every result was retrieved
    pub fn is_completed(&self) -> bool {
        self.state() == FinderState::Completed
    }

    /// Retrieve up to `maximum` queued directories (0 = all queued)
    ///
    /// With `wait`, blocks while the queue is empty and the walk is still
    /// running.
    pub fn get(&self, wait: bool, maximum: usize) -> Vec<DirectoryItem> {
        self.runtime.get(wait, maximum)
    }

    /// Retrieve the next directory, or `None` once the search is over
    ///
    /// `poll` runs periodically while waiting.
    pub fn get_next(&self, poll: Option<&mut dyn FnMut()>) -> Option<DirectoryItem> {
        self.runtime.get_next(poll)
    }

    /// Iterate over results as they arrive
    pub fn iter(&self) -> impl Iterator<Item = DirectoryItem> + '_ {
        std::iter::from_fn(move || self.get_next(None))
    }

    /// Rough completion estimate in `[0, 1]`; never decreases
    pub fn progress(&self) -> f64 {
        self.state();
        self.runtime.progress().get()
    }

    /// Counter snapshot
    pub fn stats(&self) -> SearchStats {
        self.runtime.stats()
    }

    /// Stop the walk, discard queued results and join the worker
    ///
    /// Idempotent; also runs on drop.
    pub fn close(&self) {
        self.runtime.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FindError;
    use crate::fs::Entry;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::thread;
    use std::time::Instant;
    use tempfile::TempDir;

    fn create_test_tree(dirs: &[&str]) -> TempDir {
        let root = TempDir::new().unwrap();
        for dir in dirs {
            std::fs::create_dir_all(root.path().join(dir)).unwrap();
        }
        root
    }

    fn collect_all(finder: &DirectoryFinder) -> Vec<PathBuf> {
        finder.iter().map(|d| d.relative_path).collect()
    }

    fn position(items: &[PathBuf], rel: &str) -> usize {
        items.iter().position(|p| p == Path::new(rel)).unwrap()
    }

    fn wait_for<F: Fn() -> bool>(what: &str, condition: F) {
        let start = Instant::now();
        while !condition() {
            assert!(start.elapsed() < Duration::from_secs(10), "timed out waiting for {}", what);
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn test_finds_every_directory_once() {
        let root = create_test_tree(&["a/b/c", "a/d", "e", "f/g"]);
        let finder = DirectoryFinder::builder(root.path()).start().unwrap();

        let found = collect_all(&finder);
        let unique: HashSet<_> = found.iter().collect();
        assert_eq!(found.len(), 7);
        assert_eq!(unique.len(), 7);
        assert!(finder.is_completed());
        assert_eq!(finder.progress(), 1.0);
    }

    #[test]
    fn test_root_first_order() {
        let root = create_test_tree(&["a/b", "c"]);
        let finder = DirectoryFinder::builder(root.path()).start().unwrap();

        let found = collect_all(&finder);
        assert!(position(&found, "a") < position(&found, "a/b"));
    }

    #[test]
    fn test_deepest_first_order() {
        let root = create_test_tree(&["A/B", "C"]);
        let finder = DirectoryFinder::builder(root.path())
            .order(TraversalOrder::DeepestFirst)
            .start()
            .unwrap();

        let found = collect_all(&finder);
        assert_eq!(found.len(), 3);
        assert!(position(&found, "A/B") < position(&found, "A"));
        assert!(position(&found, "A/B") < position(&found, "C"));
    }

    #[test]
    fn test_mask_prunes_non_matching_directories() {
        let root = create_test_tree(&["src/inner", "src-gen", "docs/src"]);
        let finder = DirectoryFinder::builder(root.path()).mask("src*").start().unwrap();

        let found: HashSet<_> = collect_all(&finder).into_iter().collect();
        let expected: HashSet<_> = ["src", "src-gen"].iter().map(PathBuf::from).collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_hidden_and_custom_comparers() {
        let root = create_test_tree(&[".git/objects", "keep", "skip"]);
        let finder = DirectoryFinder::builder(root.path())
            .include_hidden(false)
            .comparer(|d: &DirectoryItem| d.name() != "skip")
            .start()
            .unwrap();

        assert_eq!(collect_all(&finder), vec![PathBuf::from("keep")]);
    }

    #[test]
    fn test_found_hook_suppresses_queueing() {
        let root = create_test_tree(&["a/inner", "b"]);
        let claimed = Arc::new(Mutex::new(Vec::new()));
        let finder = {
            let claimed = Arc::clone(&claimed);
            DirectoryFinder::builder(root.path())
                .on_found(move |d: &DirectoryItem| {
                    if d.name() == "a" {
                        claimed.lock().unwrap().push(d.relative_path.clone());
                        return true;
                    }
                    false
                })
                .start()
                .unwrap()
        };

        let found: HashSet<_> = collect_all(&finder).into_iter().collect();
        let expected: HashSet<_> = ["a/inner", "b"].iter().map(PathBuf::from).collect();
        assert_eq!(found, expected);
        assert_eq!(claimed.lock().unwrap().as_slice(), [PathBuf::from("a")]);
        assert_eq!(finder.stats().handled_by_hook, 1);
    }

    #[test]
    fn test_missing_base_is_not_found() {
        let root = TempDir::new().unwrap();
        let result = DirectoryFinder::builder(root.path().join("missing")).start();
        assert!(matches!(result, Err(FindError::NotFound(_))));
    }

    #[test]
    fn test_invalid_mask_is_configuration_error() {
        let root = create_test_tree(&["a"]);
        let result = DirectoryFinder::builder(root.path()).mask("[oops").start();
        assert!(matches!(result, Err(FindError::Configuration(_))));
    }

    #[test]
    fn test_builder_state_is_created() {
        let builder = DirectoryFinder::builder("/nowhere").capacity(3);
        assert_eq!(builder.state(), FinderState::Created);
        assert_eq!(builder.config().capacity, 3);
    }

    #[test]
    fn test_capacity_one_blocks_walker_until_drained() {
        let root = create_test_tree(&["one", "two"]);
        let finder = DirectoryFinder::builder(root.path()).capacity(1).start().unwrap();

        wait_for("backpressure", || finder.stats().backpressure_events > 0);
        let stats = finder.stats();
        assert_eq!(stats.queued, 1);
        assert_eq!(finder.state(), FinderState::Started);

        let first = finder.get(false, 0);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].relative_path, PathBuf::from("one"));

        let rest = finder.get(true, 0);
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].relative_path, PathBuf::from("two"));
    }

    #[test]
    fn test_get_respects_maximum() {
        let root = create_test_tree(&["a", "b", "c", "d"]);
        let finder = DirectoryFinder::builder(root.path()).capacity(0).start().unwrap();

        wait_for("walk to finish", || finder.stats().directories_processed == 5);
        assert_eq!(finder.get(true, 2).len(), 2);
        assert_eq!(finder.get(false, 0).len(), 2);
        assert!(finder.get(true, 0).is_empty());
        assert!(finder.is_completed());
    }

    #[test]
    fn test_close_is_idempotent_and_concurrent() {
        let root = create_test_tree(&["a", "b"]);
        let finder = Arc::new(DirectoryFinder::builder(root.path()).capacity(1).start().unwrap());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let finder = Arc::clone(&finder);
                thread::spawn(move || finder.close())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        finder.close();

        assert_eq!(finder.state(), FinderState::Closed);
        assert!(finder.get(false, 0).is_empty());
        assert!(finder.get_next(None).is_none());
    }

    #[test]
    fn test_close_unblocks_get_next() {
        let root = create_test_tree(&["slow"]);
        let released = Arc::new(AtomicBool::new(false));

        // The hook stalls the walk with nothing queued
        let finder = {
            let released = Arc::clone(&released);
            Arc::new(
                DirectoryFinder::builder(root.path())
                    .on_found(move |_: &DirectoryItem| {
                        while !released.load(Ordering::Acquire) {
                            thread::sleep(Duration::from_millis(2));
                        }
                        true
                    })
                    .start()
                    .unwrap(),
            )
        };

        let waiter = {
            let finder = Arc::clone(&finder);
            thread::spawn(move || finder.get_next(None))
        };
        thread::sleep(Duration::from_millis(30));
        assert!(!waiter.is_finished());

        let releaser = {
            let released = Arc::clone(&released);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                released.store(true, Ordering::Release);
            })
        };
        finder.close();

        assert!(waiter.join().unwrap().is_none());
        releaser.join().unwrap();
        assert_eq!(finder.state(), FinderState::Closed);
        assert!(finder.get_next(None).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_reported_once() {
        use std::os::unix::fs::PermissionsExt;

        let root = create_test_tree(&["a/a1", "Z/hidden", "y"]);
        let locked = root.path().join("Z");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();
        if std::fs::read_dir(&locked).is_ok() {
            // Running with privileges that ignore permissions
            std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let errors = Arc::new(Mutex::new(Vec::new()));
        let finder = {
            let errors = Arc::clone(&errors);
            DirectoryFinder::builder(root.path())
                .on_error(move |e: &FindError| errors.lock().unwrap().push(e.path().cloned()))
                .start()
                .unwrap()
        };

        let found: HashSet<_> = collect_all(&finder).into_iter().collect();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        let expected: HashSet<_> = ["a", "a/a1", "Z", "y"].iter().map(PathBuf::from).collect();
        assert_eq!(found, expected);
        let errors = errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].as_ref().unwrap().ends_with("Z"));
        assert!(finder.is_completed());
    }

    #[test]
    fn test_progress_is_monotonic() {
        let root = create_test_tree(&["a/b/c/d", "e/f", "g", "h/i/j"]);
        let finder = DirectoryFinder::builder(root.path()).capacity(1).start().unwrap();

        let mut last = finder.progress();
        while finder.get_next(None).is_some() {
            let now = finder.progress();
            assert!(now >= last);
            last = now;
        }
        assert_eq!(finder.progress(), 1.0);
    }

    #[test]
    fn test_concurrent_close_waits_for_running_hook() {
        let root = create_test_tree(&["slow"]);
        let started = Arc::new(AtomicBool::new(false));
        let done = Arc::new(AtomicBool::new(false));

        let finder = {
            let started = Arc::clone(&started);
            let done = Arc::clone(&done);
            Arc::new(
                DirectoryFinder::builder(root.path())
                    .on_found(move |_: &DirectoryItem| {
                        started.store(true, Ordering::Release);
                        thread::sleep(Duration::from_millis(200));
                        done.store(true, Ordering::Release);
                        false
                    })
                    .start()
                    .unwrap(),
            )
        };
        wait_for("hook to start", || started.load(Ordering::Acquire));

        let first = {
            let finder = Arc::clone(&finder);
            thread::spawn(move || finder.close())
        };
        thread::sleep(Duration::from_millis(30));
        finder.close();

        // The second close must not return while the hook is still running
        assert!(done.load(Ordering::Acquire));
        first.join().unwrap();
        assert_eq!(finder.state(), FinderState::Closed);
    }

    #[test]
    fn test_panicking_hook_ends_search() {
        let root = create_test_tree(&["a", "b", "c"]);
        let finder = DirectoryFinder::builder(root.path())
            .on_found(|d: &DirectoryItem| {
                if d.name() == "b" {
                    panic!("hook failed on {}", d.path.display());
                }
                false
            })
            .start()
            .unwrap();

        assert_eq!(collect_all(&finder), vec![PathBuf::from("a")]);
        assert!(finder.get_next(None).is_none());
        assert!(finder.is_completed());

        finder.close();
        assert_eq!(finder.state(), FinderState::Closed);
    }
}
