//! Recursive directory-only walk
//!
//! One worker descends depth-first from the base directory, publishing each
//! accepted subdirectory either before (root-first) or after (deepest-first)
//! its own children. Publishing blocks under queue backpressure. A directory
//! that cannot be listed is reported and skipped; its siblings are still
//! visited.

use crate::config::TraversalOrder;
use crate::core::hooks::{ErrorSink, Published, Publisher, SearchCounters};
use crate::core::queue::QueueClosed;
use crate::fs::{list_subdirectories, DirectoryItem};
use crate::progress::{depth_target, ProgressEstimate};
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;

pub(crate) struct DirectoryWalker {
    pub(crate) base: Arc<Path>,
    pub(crate) order: TraversalOrder,
    pub(crate) follow_links: bool,
    pub(crate) publisher: Publisher<DirectoryItem>,
    pub(crate) errors: ErrorSink,
    pub(crate) counters: Arc<SearchCounters>,
    pub(crate) progress: Arc<ProgressEstimate>,
    pub(crate) max_depth: usize,
}

impl DirectoryWalker {
    /// Worker body
    pub(crate) fn run(mut self) {
        tracing::debug!("Directory walk of {} started ({:?})", self.base.display(), self.order);

        let base = Arc::clone(&self.base);
        match self.visit(&base, 1) {
            Ok(()) => tracing::debug!(
                "Directory walk of {} finished: {} directories",
                base.display(),
                self.counters.directories_seen.load(Ordering::Relaxed)
            ),
            Err(QueueClosed) => tracing::debug!("Directory walk of {} closed early", base.display()),
        }
    }

    /// List `dir` and handle its children, which sit at `depth`
    fn visit(&mut self, dir: &Path, depth: usize) -> Result<(), QueueClosed> {
        if self.publisher.is_closed() {
            return Err(QueueClosed);
        }

        let listing = match list_subdirectories(dir, self.follow_links) {
            Ok(listing) => listing,
            Err(e) => {
                self.errors.report(e);
                return Ok(());
            }
        };
        self.errors.report_all(listing.errors);
        self.counters.directories_processed.fetch_add(1, Ordering::Relaxed);

        if !listing.entries.is_empty() {
            self.max_depth = self.max_depth.max(depth);
        }
        self.progress.advance(depth_target(depth, self.max_depth));

        for path in listing.entries {
            if self.publisher.is_closed() {
                return Err(QueueClosed);
            }

            let item = DirectoryItem::new(path, Arc::clone(&self.base));
            if !self.publisher.accepts(&item) {
                continue;
            }
            self.counters.directories_seen.fetch_add(1, Ordering::Relaxed);

            match self.order {
                TraversalOrder::RootFirst => {
                    let path = item.path.clone();
                    self.publish(item)?;
                    self.visit(&path, depth + 1)?;
                }
                TraversalOrder::DeepestFirst => {
                    self.visit(&item.path, depth + 1)?;
                    self.publish(item)?;
                }
            }
        }

        Ok(())
    }

    fn publish(&self, item: DirectoryItem) -> Result<(), QueueClosed> {
        let path = item.path.clone();
        match self.publisher.publish(item)? {
            Published::Queued => tracing::trace!("Queued directory {}", path.display()),
            Published::Handled => tracing::trace!("Directory {} handled by hook", path.display()),
        }
        Ok(())
    }
}
