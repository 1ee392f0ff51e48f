//! Two-stage file walk
//!
//! Stage one walks directories breadth-first and feeds every accepted one
//! into the directory queue. Stage two takes directories off that queue,
//! lists their files and publishes the accepted ones into the file queue.
//! File results therefore start flowing before the tree is fully known.
//!
//! Stage two ends only when the directory queue reports "no more items",
//! which happens once stage one has dropped its producer and the queue is
//! drained, or when the search is closed. A transiently empty directory
//! queue just blocks it.

use crate::core::hooks::{ErrorSink, Published, Publisher, SearchCounters};
use crate::core::queue::{BoundedItemQueue, QueueClosed};
use crate::fs::{list_files, list_subdirectories, DirectoryItem, FileItem};
use crate::progress::{pipeline_target, ProgressEstimate};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Stage one: breadth-first directory discovery
pub(crate) struct DirectoryDiscovery {
    pub(crate) base: Arc<Path>,
    pub(crate) follow_links: bool,
    pub(crate) publisher: Publisher<DirectoryItem>,
    pub(crate) errors: ErrorSink,
    pub(crate) counters: Arc<SearchCounters>,
}

impl DirectoryDiscovery {
    /// Worker body
    pub(crate) fn run(self) {
        tracing::debug!("Directory discovery under {} started", self.base.display());

        match self.discover() {
            Ok(()) => tracing::debug!(
                "Directory discovery under {} finished: {} directories",
                self.base.display(),
                self.counters.directories_seen.load(Ordering::Relaxed)
            ),
            Err(QueueClosed) => tracing::debug!("Directory discovery under {} closed early", self.base.display()),
        }
    }

    fn discover(&self) -> Result<(), QueueClosed> {
        // The base itself is always listed for files
        self.publisher
            .enqueue_unfiltered(DirectoryItem::new(self.base.to_path_buf(), Arc::clone(&self.base)))?;

        let mut pending: VecDeque<PathBuf> = VecDeque::from([self.base.to_path_buf()]);

        while let Some(dir) = pending.pop_front() {
            if self.publisher.is_closed() {
                return Err(QueueClosed);
            }

            let listing = match list_subdirectories(&dir, self.follow_links) {
                Ok(listing) => listing,
                Err(e) => {
                    self.errors.report(e);
                    continue;
                }
            };
            self.errors.report_all(listing.errors);

            for path in listing.entries {
                let item = DirectoryItem::new(path, Arc::clone(&self.base));
                if !self.publisher.accepts(&item) {
                    continue;
                }
                self.counters.directories_seen.fetch_add(1, Ordering::Relaxed);

                // A directory claimed by the hook is still descended, but its
                // own files are not listed
                let path = item.path.clone();
                if self.publisher.publish(item)? == Published::Handled {
                    tracing::trace!("Directory {} handled by hook", path.display());
                }
                pending.push_back(path);
            }
        }

        Ok(())
    }
}

/// Stage two: list files of each discovered directory
pub(crate) struct FileLister {
    pub(crate) base: Arc<Path>,
    pub(crate) follow_links: bool,
    pub(crate) directories: Arc<BoundedItemQueue<DirectoryItem>>,
    pub(crate) publisher: Publisher<FileItem>,
    pub(crate) errors: ErrorSink,
    pub(crate) counters: Arc<SearchCounters>,
    pub(crate) progress: Arc<ProgressEstimate>,
}

impl FileLister {
    /// Worker body
    pub(crate) fn run(self) {
        tracing::debug!("File listing under {} started", self.base.display());

        match self.list() {
            Ok(()) => tracing::debug!(
                "File listing under {} finished: {} files",
                self.base.display(),
                self.counters.files_seen.load(Ordering::Relaxed)
            ),
            Err(QueueClosed) => tracing::debug!("File listing under {} closed early", self.base.display()),
        }
    }

    fn list(&self) -> Result<(), QueueClosed> {
        loop {
            if self.publisher.is_closed() {
                return Err(QueueClosed);
            }
            let Some(dir) = self.directories.wait_next(None) else {
                return if self.directories.is_closed() { Err(QueueClosed) } else { Ok(()) };
            };

            self.list_directory(&dir.path)?;
            self.counters.directories_processed.fetch_add(1, Ordering::Relaxed);
            self.progress.advance(self.progress_target());
        }
    }

    fn list_directory(&self, dir: &Path) -> Result<(), QueueClosed> {
        let listing = match list_files(dir, self.follow_links) {
            Ok(listing) => listing,
            Err(e) => {
                self.errors.report(e);
                return Ok(());
            }
        };
        self.errors.report_all(listing.errors);

        for file in listing.entries {
            if self.publisher.is_closed() {
                return Err(QueueClosed);
            }

            let item = FileItem::new(file.path, Arc::clone(&self.base), file.size, file.modified);
            if !self.publisher.accepts(&item) {
                continue;
            }
            self.counters.files_seen.fetch_add(1, Ordering::Relaxed);

            self.publisher.publish(item)?;
        }

        Ok(())
    }

    fn progress_target(&self) -> f64 {
        let files = self.publisher.producer().stats();
        pipeline_target(
            self.counters.directories_processed.load(Ordering::Relaxed),
            self.directories.stats().enqueued(),
            files.dequeued(),
            files.enqueued(),
        )
    }
}
