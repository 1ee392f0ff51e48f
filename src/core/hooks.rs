//! Callbacks invoked on the worker threads
//!
//! Hooks run synchronously, inline with the traversal. They must not block
//! for long. A panic inside a hook unwinds out of the worker and ends that
//! worker; the finder reports it when it is closed.

use crate::core::queue::{QueueClosed, QueueProducer};
use crate::error::FindError;
use crate::fs::ComparerSet;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Called for every accepted item just before it would be queued
pub trait FoundHook<T>: Send + Sync {
    /// Return `true` if the item was handled and must not be queued
    fn on_found(&self, item: &T) -> bool;
}

impl<T, F> FoundHook<T> for F
where
    F: Fn(&T) -> bool + Send + Sync,
{
    fn on_found(&self, item: &T) -> bool {
        self(item)
    }
}

/// Called once per traversal failure
pub trait ErrorHook: Send + Sync {
    /// Report a failure; traversal continues after this returns
    fn on_error(&self, error: &FindError);
}

impl<F> ErrorHook for F
where
    F: Fn(&FindError) + Send + Sync,
{
    fn on_error(&self, error: &FindError) {
        self(error)
    }
}

/// Counters shared between the workers of one search and its finder
#[derive(Debug, Default)]
pub struct SearchCounters {
    /// Directories accepted by the directory comparers
    pub directories_seen: AtomicU64,
    /// Directories whose listing has been processed
    pub directories_processed: AtomicU64,
    /// Files accepted by the file comparers
    pub files_seen: AtomicU64,
    /// Items claimed by a found hook instead of being queued
    pub handled_by_hook: AtomicU64,
    /// Failures reported through the error hook
    pub errors: AtomicU64,
}

/// Routes traversal failures to the error hook and the log
///
/// Each path is reported at most once per search: both stages of a file
/// walk list the same directories and would otherwise report an unreadable
/// directory twice.
#[derive(Clone)]
pub(crate) struct ErrorSink {
    hook: Option<Arc<dyn ErrorHook>>,
    counters: Arc<SearchCounters>,
    reported: Arc<Mutex<HashSet<PathBuf>>>,
}

impl ErrorSink {
    pub(crate) fn new(hook: Option<Arc<dyn ErrorHook>>, counters: Arc<SearchCounters>) -> Self {
        Self {
            hook,
            counters,
            reported: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub(crate) fn report(&self, error: FindError) {
        // Errors without a usable path are never de-duplicated
        if let Some(path) = error.path().filter(|p| !p.as_os_str().is_empty()) {
            let first = self
                .reported
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(path.clone());
            if !first {
                return;
            }
        }

        tracing::warn!("{}", error);
        self.counters.errors.fetch_add(1, Ordering::Relaxed);
        if let Some(hook) = &self.hook {
            hook.on_error(&error);
        }
    }

    pub(crate) fn report_all(&self, errors: Vec<FindError>) {
        for error in errors {
            self.report(error);
        }
    }
}

/// Outcome of offering an item to a [`Publisher`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Published {
    /// Item went into the queue
    Queued,
    /// Found hook claimed the item
    Handled,
}

/// Comparer chain + found hook + queue, as seen by one worker stage
pub(crate) struct Publisher<T> {
    comparers: ComparerSet<T>,
    found: Option<Arc<dyn FoundHook<T>>>,
    producer: QueueProducer<T>,
    counters: Arc<SearchCounters>,
}

impl<T> Publisher<T> {
    pub(crate) fn new(
        comparers: ComparerSet<T>,
        found: Option<Arc<dyn FoundHook<T>>>,
        producer: QueueProducer<T>,
        counters: Arc<SearchCounters>,
    ) -> Self {
        Self {
            comparers,
            found,
            producer,
            counters,
        }
    }

    pub(crate) fn accepts(&self, item: &T) -> bool {
        self.comparers.matches(item)
    }

    /// Run the found hook, then queue the item unless the hook claimed it
    pub(crate) fn publish(&self, item: T) -> Result<Published, QueueClosed> {
        if let Some(hook) = &self.found {
            if hook.on_found(&item) {
                self.counters.handled_by_hook.fetch_add(1, Ordering::Relaxed);
                return Ok(Published::Handled);
            }
        }
        self.producer.enqueue(item)?;
        Ok(Published::Queued)
    }

    /// Queue an item without comparers or hooks
    pub(crate) fn enqueue_unfiltered(&self, item: T) -> Result<(), QueueClosed> {
        self.producer.enqueue(item)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.producer.is_closed()
    }

    pub(crate) fn producer(&self) -> &QueueProducer<T> {
        &self.producer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::queue::BoundedItemQueue;
    use crate::fs::Comparer;
    use std::time::Duration;

    fn publisher(
        found: Option<Arc<dyn FoundHook<u32>>>,
    ) -> (Publisher<u32>, BoundedItemQueue<u32>, Arc<SearchCounters>) {
        let even: Arc<dyn Comparer<u32>> = Arc::new(|n: &u32| n % 2 == 0);
        let (producer, queue) = BoundedItemQueue::new(0, Duration::from_millis(5));
        let counters = Arc::new(SearchCounters::default());
        let publisher = Publisher::new(ComparerSet::new(vec![even]), found, producer, Arc::clone(&counters));
        (publisher, queue, counters)
    }

    #[test]
    fn test_publish_queues_item() {
        let (publisher, queue, _) = publisher(None);
        assert!(publisher.accepts(&2));
        assert!(!publisher.accepts(&3));
        assert_eq!(publisher.publish(2), Ok(Published::Queued));
        assert_eq!(queue.drain_all(0), vec![2]);
    }

    #[test]
    fn test_handled_item_is_not_queued() {
        let hook: Arc<dyn FoundHook<u32>> = Arc::new(|n: &u32| *n == 4);
        let (publisher, queue, counters) = publisher(Some(hook));

        assert_eq!(publisher.publish(4), Ok(Published::Handled));
        assert_eq!(publisher.publish(6), Ok(Published::Queued));
        assert_eq!(queue.drain_all(0), vec![6]);
        assert_eq!(counters.handled_by_hook.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_publish_after_close() {
        let (publisher, queue, _) = publisher(None);
        queue.close();
        assert!(publisher.is_closed());
        assert_eq!(publisher.publish(2), Err(QueueClosed));
    }

    #[test]
    fn test_error_sink_counts_and_forwards() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let hook: Arc<dyn ErrorHook> = {
            let seen = Arc::clone(&seen);
            Arc::new(move |e: &FindError| seen.lock().unwrap().push(e.to_string()))
        };
        let counters = Arc::new(SearchCounters::default());
        let sink = ErrorSink::new(Some(hook), Arc::clone(&counters));

        sink.report(FindError::NotFound("/gone".into()));
        sink.clone().report(FindError::NotFound("/gone".into()));
        assert_eq!(counters.errors.load(Ordering::Relaxed), 1);
        assert_eq!(seen.lock().unwrap().as_slice(), ["Path not found: /gone"]);
    }

    #[test]
    fn test_error_sink_reports_every_pathless_error() {
        let counters = Arc::new(SearchCounters::default());
        let sink = ErrorSink::new(None, Arc::clone(&counters));

        let pathless = || FindError::io("", std::io::Error::new(std::io::ErrorKind::Other, "loop detected"));
        sink.report(pathless());
        sink.report(pathless());
        sink.report(FindError::config("not a path error"));
        sink.report(FindError::config("not a path error"));
        assert_eq!(counters.errors.load(Ordering::Relaxed), 4);
    }
}
