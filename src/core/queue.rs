//! Bounded item queue with backpressure and broadcast close
//!
//! Built on a crossbeam channel (bounded, or unbounded for capacity 0). A
//! second, never-written channel acts as the shutdown signal: dropping its
//! only sender disconnects it, which wakes every producer and consumer that
//! is selecting on it at once.
//!
//! The queue also ends on its own once every [`QueueProducer`] is dropped:
//! consumers drain what is left and then see "no more items".

use crossbeam::channel::{self, select, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

/// Returned by [`QueueProducer::enqueue`] once the queue is closed
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Queue closed")]
pub struct QueueClosed;

/// Statistics for a queue
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Total items enqueued
    pub enqueued: AtomicU64,
    /// Total items handed to consumers
    pub dequeued: AtomicU64,
    /// Number of times a producer found the queue full and had to wait
    pub backpressure_events: AtomicU64,
}

impl QueueStats {
    /// Items enqueued so far
    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    /// Items dequeued so far
    pub fn dequeued(&self) -> u64 {
        self.dequeued.load(Ordering::Relaxed)
    }

    /// Backpressure event count
    pub fn backpressure_count(&self) -> u64 {
        self.backpressure_events.load(Ordering::Relaxed)
    }
}

struct Shared {
    closed: AtomicBool,
    producers: AtomicUsize,
    stats: QueueStats,
}

impl Shared {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Consumer side of a bounded FIFO shared between threads
///
/// Any number of threads may consume concurrently; each item is delivered
/// to exactly one of them.
pub struct BoundedItemQueue<T> {
    receiver: Receiver<T>,
    shutdown_tx: Mutex<Option<Sender<()>>>,
    shutdown_rx: Receiver<()>,
    capacity: usize,
    poll_interval: Duration,
    shared: Arc<Shared>,
}

/// Producer side of a [`BoundedItemQueue`]
///
/// Clone it for additional producer threads.
pub struct QueueProducer<T> {
    sender: Sender<T>,
    shutdown: Receiver<()>,
    shared: Arc<Shared>,
}

impl<T> Clone for QueueProducer<T> {
    fn clone(&self) -> Self {
        self.shared.producers.fetch_add(1, Ordering::AcqRel);
        Self {
            sender: self.sender.clone(),
            shutdown: self.shutdown.clone(),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Drop for QueueProducer<T> {
    fn drop(&mut self) {
        // Runs before the sender field disconnects the channel
        self.shared.producers.fetch_sub(1, Ordering::AcqRel);
    }
}

impl<T> BoundedItemQueue<T> {
    /// Create a queue holding at most `capacity` items (0 = unbounded)
    pub fn new(capacity: usize, poll_interval: Duration) -> (QueueProducer<T>, Self) {
        let (sender, receiver) = if capacity == 0 {
            channel::unbounded()
        } else {
            channel::bounded(capacity)
        };
        let (shutdown_tx, shutdown_rx) = channel::bounded(0);
        let shared = Arc::new(Shared {
            closed: AtomicBool::new(false),
            producers: AtomicUsize::new(1),
            stats: QueueStats::default(),
        });

        let producer = QueueProducer {
            sender,
            shutdown: shutdown_rx.clone(),
            shared: Arc::clone(&shared),
        };

        let queue = Self {
            receiver,
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            shutdown_rx,
            capacity,
            poll_interval,
            shared,
        };

        (producer, queue)
    }

    /// Configured capacity, `None` when unbounded
    pub fn capacity(&self) -> Option<usize> {
        (self.capacity > 0).then_some(self.capacity)
    }

    /// Number of items currently queued
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Check if no items are queued
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Check if [`close`](Self::close) has been called
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Check if every producer has been dropped
    pub fn is_orphaned(&self) -> bool {
        self.shared.producers.load(Ordering::Acquire) == 0
    }

    /// Queue statistics
    pub fn stats(&self) -> &QueueStats {
        &self.shared.stats
    }

    /// Close the queue and wake every blocked producer and consumer
    ///
    /// Idempotent. Items still queued are discarded.
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        // Dropping the only sender disconnects the shutdown channel for everyone
        let sender = self
            .shutdown_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(sender);

        let discarded = self.receiver.try_iter().count();
        if discarded > 0 {
            tracing::debug!("Queue closed, discarded {} pending items", discarded);
        }
    }

    /// Remove up to `max_count` items without blocking (0 = all available)
    pub fn drain_all(&self, max_count: usize) -> Vec<T> {
        if self.is_closed() {
            return Vec::new();
        }

        let limit = if max_count == 0 { usize::MAX } else { max_count };
        let items: Vec<T> = self.receiver.try_iter().take(limit).collect();
        self.shared
            .stats
            .dequeued
            .fetch_add(items.len() as u64, Ordering::Relaxed);
        items
    }

    /// Block until the next item is available
    ///
    /// Returns `None` once the queue is closed, or once every producer is
    /// gone and the queue is drained. With a `poll` callback the wait is
    /// split into slices of the queue's poll interval and the callback runs
    /// between slices.
    pub fn wait_next(&self, poll: Option<&mut dyn FnMut()>) -> Option<T> {
        match poll {
            None => {
                if self.is_closed() {
                    return None;
                }
                select! {
                    recv(self.receiver) -> msg => self.deliver(msg.ok()),
                    recv(self.shutdown_rx) -> _ => None,
                }
            }
            Some(poll) => loop {
                if self.is_closed() {
                    return None;
                }
                select! {
                    recv(self.receiver) -> msg => return self.deliver(msg.ok()),
                    recv(self.shutdown_rx) -> _ => return None,
                    default(self.poll_interval) => poll(),
                }
            },
        }
    }

    fn deliver(&self, item: Option<T>) -> Option<T> {
        // Lost the race against close(): the item counts as discarded
        if self.is_closed() {
            return None;
        }
        if item.is_some() {
            self.shared.stats.dequeued.fetch_add(1, Ordering::Relaxed);
        }
        item
    }
}

impl<T> QueueProducer<T> {
    /// Append an item, blocking while the queue is full
    ///
    /// Fails fast once the queue is closed, and wakes with an error if it is
    /// closed while waiting for space.
    pub fn enqueue(&self, item: T) -> Result<(), QueueClosed> {
        if self.shared.is_closed() {
            return Err(QueueClosed);
        }

        let item = match self.sender.try_send(item) {
            Ok(()) => {
                self.shared.stats.enqueued.fetch_add(1, Ordering::Relaxed);
                return Ok(());
            }
            Err(TrySendError::Disconnected(_)) => return Err(QueueClosed),
            Err(TrySendError::Full(item)) => item,
        };

        self.shared
            .stats
            .backpressure_events
            .fetch_add(1, Ordering::Relaxed);
        tracing::trace!("Queue full, producer waiting for space");

        select! {
            send(self.sender, item) -> res => {
                res.map_err(|_| QueueClosed)?;
                // close() may have drained the queue and made room for us
                if self.shared.is_closed() {
                    return Err(QueueClosed);
                }
                self.shared.stats.enqueued.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            recv(self.shutdown) -> _ => Err(QueueClosed),
        }
    }

    /// Check if the consumer side closed the queue
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Statistics of the queue this producer feeds
    pub fn stats(&self) -> &QueueStats {
        &self.shared.stats
    }
}
