//! Caller-facing side of a running search
//!
//! Both finders wrap a [`SearchRuntime`]: the output queue, the worker
//! threads, the lifecycle state and the shared counters. Every method takes
//! `&self`, so a finder can be shared between caller threads.

use crate::core::hooks::SearchCounters;
use crate::core::queue::BoundedItemQueue;
use crate::core::worker::WorkerSet;
use crate::error::Result;
use crate::progress::ProgressEstimate;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, PoisonError};

/// Lifecycle state of a finder
///
/// `Created` belongs to the builders; a started finder moves from `Started`
/// to `Completed` on its own, and to `Closed` when closed from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FinderState {
    /// Configured, not yet started
    Created,
    /// Workers are running or results are still queued
    Started,
    /// Every worker finished and every result was retrieved
    Completed,
    /// Closed by the caller; terminal
    Closed,
}

/// Point-in-time snapshot of a search's counters
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchStats {
    /// Directories accepted by the directory comparers
    pub directories_seen: u64,
    /// Directories whose listing has been processed
    pub directories_processed: u64,
    /// Files accepted by the file comparers
    pub files_seen: u64,
    /// Items claimed by a found hook instead of being queued
    pub handled_by_hook: u64,
    /// Results handed to callers
    pub retrieved: u64,
    /// Results waiting in the output queue
    pub queued: usize,
    /// Failures reported through the error hook
    pub errors: u64,
    /// Times a worker had to wait for queue space
    pub backpressure_events: u64,
}

/// Something that can be closed alongside the output queue
pub(crate) trait Upstream: Send + Sync {
    fn close(&self);
    fn backpressure_count(&self) -> u64;
}

impl<T: Send> Upstream for BoundedItemQueue<T> {
    fn close(&self) {
        BoundedItemQueue::close(self)
    }

    fn backpressure_count(&self) -> u64 {
        self.stats().backpressure_count()
    }
}

pub(crate) struct SearchRuntime<T> {
    base: PathBuf,
    queue: BoundedItemQueue<T>,
    upstream: Vec<Arc<dyn Upstream>>,
    workers: WorkerSet,
    state: Mutex<FinderState>,
    progress: Arc<ProgressEstimate>,
    counters: Arc<SearchCounters>,
}

impl<T> SearchRuntime<T> {
    pub(crate) fn new(
        base: PathBuf,
        queue: BoundedItemQueue<T>,
        progress: Arc<ProgressEstimate>,
        counters: Arc<SearchCounters>,
    ) -> Self {
        Self {
            base,
            queue,
            upstream: Vec::new(),
            workers: WorkerSet::new(),
            state: Mutex::new(FinderState::Started),
            progress,
            counters,
        }
    }

    /// Close `queue` together with the output queue
    pub(crate) fn with_upstream(mut self, queue: Arc<dyn Upstream>) -> Self {
        self.upstream.push(queue);
        self
    }

    /// Start a worker; the search is closed again if the thread cannot start
    pub(crate) fn spawn<F>(&self, name: &str, body: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        if let Err(e) = self.workers.spawn(name, body) {
            self.close();
            return Err(e);
        }
        Ok(())
    }

    pub(crate) fn base(&self) -> &Path {
        &self.base
    }

    /// Current state; completion is latched the first time it is observed
    pub(crate) fn state(&self) -> FinderState {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        // Once the last producer is gone nothing can be queued any more, even
        // if the worker thread has not cleared its running flag yet
        let finished = self.queue.is_orphaned() || !self.workers.any_running();
        if *state == FinderState::Started && finished && self.queue.is_empty() {
            *state = FinderState::Completed;
            self.progress.complete();
            tracing::info!("Search under {} completed", self.base.display());
        }
        *state
    }

    pub(crate) fn progress(&self) -> &ProgressEstimate {
        &self.progress
    }

    /// Retrieve queued results
    pub(crate) fn get(&self, wait: bool, maximum: usize) -> Vec<T> {
        let mut items = Vec::new();

        if wait && self.queue.is_empty() {
            match self.queue.wait_next(None) {
                Some(item) => items.push(item),
                None => return items,
            }
        }

        let remaining = match maximum {
            0 => 0,
            max if max > items.len() => max - items.len(),
            _ => return items,
        };
        items.extend(self.queue.drain_all(remaining));
        items
    }

    /// Retrieve the next result, blocking until one arrives or the search ends
    pub(crate) fn get_next(&self, poll: Option<&mut dyn FnMut()>) -> Option<T> {
        self.queue.wait_next(poll)
    }

    /// Close the queues and join the workers
    pub(crate) fn close(&self) {
        let previous = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *state, FinderState::Closed)
        };

        self.queue.close();
        for upstream in &self.upstream {
            upstream.close();
        }

        let failures = self.workers.join_all();
        if previous != FinderState::Closed {
            tracing::debug!(
                "Search under {} closed ({} worker failures)",
                self.base.display(),
                failures.len()
            );
        }
    }

    pub(crate) fn stats(&self) -> SearchStats {
        let counters = &self.counters;
        SearchStats {
            directories_seen: counters.directories_seen.load(Ordering::Relaxed),
            directories_processed: counters.directories_processed.load(Ordering::Relaxed),
            files_seen: counters.files_seen.load(Ordering::Relaxed),
            handled_by_hook: counters.handled_by_hook.load(Ordering::Relaxed),
            retrieved: self.queue.stats().dequeued(),
            queued: self.queue.len(),
            errors: counters.errors.load(Ordering::Relaxed),
            backpressure_events: self.queue.stats().backpressure_count()
                + self.upstream.iter().map(|u| u.backpressure_count()).sum::<u64>(),
        }
    }
}

impl<T> Drop for SearchRuntime<T> {
    fn drop(&mut self) {
        self.close();
    }
}
