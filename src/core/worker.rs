//! Background worker threads owned by a finder
//!
//! Each worker is a named OS thread. Its running flag is cleared by a drop
//! guard that outlives the worker body, so the flag only goes down after
//! everything the body owned (in particular its queue producer) has been
//! dropped, including when a hook panics.

use crate::error::{FindError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};

/// Running flag of one worker
#[derive(Debug, Clone, Default)]
pub struct RunningFlag(Arc<AtomicBool>);

impl RunningFlag {
    /// Check if the worker is still running
    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Woken every time a worker stops running
#[derive(Default)]
struct IdleSignal {
    lock: Mutex<()>,
    changed: Condvar,
}

struct RunningGuard {
    flag: RunningFlag,
    idle: Arc<IdleSignal>,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        // Store under the lock so a waiter cannot miss the notification
        let _lock = self.idle.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.flag.0.store(false, Ordering::Release);
        self.idle.changed.notify_all();
    }
}

struct Worker {
    name: String,
    handle: JoinHandle<()>,
}

/// The set of threads belonging to one search
#[derive(Default)]
pub(crate) struct WorkerSet {
    workers: Mutex<Vec<Worker>>,
    flags: Mutex<Vec<(ThreadId, RunningFlag)>>,
    idle: Arc<IdleSignal>,
}

impl WorkerSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Spawn a named worker running `body`
    pub(crate) fn spawn<F>(&self, name: &str, body: F) -> Result<RunningFlag>
    where
        F: FnOnce() + Send + 'static,
    {
        let flag = RunningFlag(Arc::new(AtomicBool::new(true)));
        let guard = RunningGuard {
            flag: flag.clone(),
            idle: Arc::clone(&self.idle),
        };

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let _guard = guard;
                body();
            })
            .map_err(|source| FindError::ThreadSpawn {
                name: name.to_string(),
                source,
            })?;

        self.flags
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((handle.thread().id(), flag.clone()));
        self.workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Worker {
                name: name.to_string(),
                handle,
            });

        Ok(flag)
    }

    /// Check if any worker is still running
    pub(crate) fn any_running(&self) -> bool {
        self.flags
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|(_, flag)| flag.is_running())
    }

    fn is_worker_thread(&self) -> bool {
        let current = thread::current().id();
        self.flags
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|(id, _)| *id == current)
    }

    /// Join every worker not yet joined
    ///
    /// Safe to call repeatedly and from several threads. Each handle is
    /// joined by exactly one caller; every other caller outside the workers
    /// blocks until all workers have stopped running. Called from a worker
    /// (a hook closing its own finder), it neither joins nor waits for
    /// itself or its siblings. Returns one error per worker that panicked.
    pub(crate) fn join_all(&self) -> Vec<FindError> {
        let workers: Vec<Worker> = self
            .workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        let on_worker = self.is_worker_thread();

        let mut failures = Vec::new();
        for worker in workers {
            if worker.handle.thread().id() == thread::current().id() {
                continue;
            }
            match worker.handle.join() {
                Ok(()) => tracing::debug!("Worker {} joined", worker.name),
                Err(_) => {
                    tracing::error!("Worker {} panicked", worker.name);
                    failures.push(FindError::WorkerPanicked(worker.name));
                }
            }
        }

        if !on_worker {
            self.wait_idle();
        }
        failures
    }

    /// Block until no worker is running
    fn wait_idle(&self) {
        let mut lock = self.idle.lock.lock().unwrap_or_else(PoisonError::into_inner);
        while self.any_running() {
            lock = self
                .idle
                .changed
                .wait(lock)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_flag_clears_after_body() {
        let workers = WorkerSet::new();
        let flag = workers.spawn("test-worker", || thread::sleep(Duration::from_millis(10))).unwrap();

        assert!(workers.join_all().is_empty());
        assert!(!flag.is_running());
        assert!(!workers.any_running());
    }

    #[test]
    fn test_panic_is_reported_once() {
        let workers = WorkerSet::new();
        let flag = workers.spawn("panicky", || panic!("hook failed")).unwrap();

        let failures = workers.join_all();
        assert_eq!(failures.len(), 1);
        assert!(matches!(&failures[0], FindError::WorkerPanicked(name) if name == "panicky"));
        assert!(!flag.is_running());

        // Second join is a no-op
        assert!(workers.join_all().is_empty());
    }

    #[test]
    fn test_every_concurrent_join_waits_for_workers() {
        let workers = Arc::new(WorkerSet::new());
        let flag = workers.spawn("slow-worker", || thread::sleep(Duration::from_millis(200))).unwrap();

        let joiners: Vec<_> = (0..3)
            .map(|_| {
                let workers = Arc::clone(&workers);
                let flag = flag.clone();
                thread::spawn(move || {
                    workers.join_all();
                    flag.is_running()
                })
            })
            .collect();

        for joiner in joiners {
            assert!(!joiner.join().unwrap());
        }
    }

    #[test]
    fn test_worker_can_join_its_own_set() {
        let workers = Arc::new(WorkerSet::new());
        let (tx, rx) = std::sync::mpsc::channel();

        let inner = Arc::clone(&workers);
        workers
            .spawn("self-closing", move || {
                // Wait until the handle is registered
                thread::sleep(Duration::from_millis(20));
                tx.send(inner.join_all().len()).unwrap();
            })
            .unwrap();

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 0);
        workers.join_all();
        assert!(!workers.any_running());
    }
}
