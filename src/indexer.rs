//! Build-job scheduler of one graph.
//!
//! Jobs run round-robin, one batch per turn, each batch under the store's read
//! lock. In `BuildMode::Background` a named worker thread drives the queue and
//! parks when it is empty; in `BuildMode::Manual` nothing moves until the
//! caller invokes [`Indexer::step`].
//!
//! The worker holds a `Weak<Graph>`: once the graph is gone or its
//! cancellation token is raised, the worker exits at its next turn.

use crate::builder::{BatchOutcome, BuildJob};
use crate::catalog::IndexEntry;
use crate::config::{BuildMode, IndexerConfig};
use crate::graph::Graph;
use crate::store::EntityStore;
use crate::types::EntityKind;
use parking_lot::{Condvar, Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Wake-up flag for the worker
#[derive(Default)]
struct Signal {
    pending: Mutex<bool>,
    cv: Condvar,
}

impl Signal {
    fn notify(&self) {
        *self.pending.lock() = true;
        self.cv.notify_all();
    }

    fn wait(&self, timeout: Duration) {
        let mut pending = self.pending.lock();
        if !*pending {
            self.cv.wait_for(&mut pending, timeout);
        }
        *pending = false;
    }
}

pub struct Indexer {
    config: IndexerConfig,
    jobs: Mutex<VecDeque<Arc<BuildJob>>>,
    signal: Arc<Signal>,
    cancel: Arc<AtomicBool>,
    graph: Weak<Graph>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Indexer {
    pub(crate) fn new(config: IndexerConfig, cancel: Arc<AtomicBool>, graph: Weak<Graph>) -> Self {
        Self {
            config,
            jobs: Mutex::new(VecDeque::new()),
            signal: Arc::new(Signal::default()),
            cancel,
            graph,
            worker: Mutex::new(None),
        }
    }

    pub fn mode(&self) -> BuildMode {
        self.config.mode
    }

    /// Jobs not yet finished
    pub fn pending(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    /// Snapshot of queued jobs
    pub fn jobs(&self) -> Vec<Arc<BuildJob>> {
        self.jobs.lock().iter().cloned().collect()
    }

    /// Queue new entries of one label. They join a running job of the same
    /// label when there is one, so the label is enumerated once.
    pub(crate) fn schedule(&self, owner: EntityKind, label: &str, entries: Vec<Arc<IndexEntry>>) {
        if entries.is_empty() {
            return;
        }
        {
            let mut jobs = self.jobs.lock();
            let joined = jobs
                .iter()
                .filter(|j| j.owner() == owner && j.label() == label)
                .any(|j| j.try_join(&entries));
            if !joined {
                jobs.push_back(Arc::new(BuildJob::new(owner, label, entries)));
            }
        }
        if self.config.mode == BuildMode::Background {
            self.ensure_worker();
            self.signal.notify();
        }
    }

    /// Run one batch of the job at the head of the queue.
    /// Returns false when there was nothing to do.
    pub fn step(&self, store: &RwLock<EntityStore>) -> bool {
        if self.cancel.load(Ordering::Acquire) {
            self.clear();
            return false;
        }

        // rotate so jobs take turns; the job stays queued while it runs so
        // new entries of its label can still join it
        let job = {
            let mut jobs = self.jobs.lock();
            let Some(job) = jobs.pop_front() else {
                return false;
            };
            jobs.push_back(job.clone());
            job
        };

        let outcome = {
            let guard = store.read();
            job.run_batch(&guard, self.config.batch_size, &self.cancel)
        };

        match outcome {
            BatchOutcome::Progress => {}
            BatchOutcome::Finished => {
                self.jobs.lock().retain(|j| !Arc::ptr_eq(j, &job));
                tracing::debug!(label = %job.label(), batches = job.batches(), "build job finished");
            }
            BatchOutcome::Cancelled => {
                tracing::warn!(label = %job.label(), batches = job.batches(), "build job cancelled");
                self.clear();
            }
        }
        true
    }

    /// Drive every job to completion on the calling thread
    pub fn run_until_idle(&self, store: &RwLock<EntityStore>) -> usize {
        let mut batches = 0;
        while self.step(store) {
            batches += 1;
        }
        batches
    }

    /// Block until no job is pending or `timeout` elapses. Returns true when idle.
    ///
    /// Manual mode drives the jobs itself; Background mode polls.
    pub fn wait_until_idle(&self, store: &RwLock<EntityStore>, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.is_idle() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            match self.config.mode {
                BuildMode::Manual => {
                    self.step(store);
                }
                BuildMode::Background => std::thread::sleep(Duration::from_millis(1)),
            }
        }
    }

    /// Drop all jobs and wake the worker so it can observe cancellation
    pub(crate) fn clear(&self) {
        let drained: Vec<Arc<BuildJob>> = self.jobs.lock().drain(..).collect();
        for job in drained {
            job.close();
        }
        self.signal.notify();
    }

    fn ensure_worker(&self) {
        let mut worker = self.worker.lock();
        if worker.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        let graph = self.graph.clone();
        let signal = self.signal.clone();
        let cancel = self.cancel.clone();
        let park = self.config.idle_park();
        let name = match self.graph.upgrade() {
            Some(g) => format!("idx-build-{}", g.name()),
            None => return,
        };

        match std::thread::Builder::new()
            .name(name)
            .spawn(move || worker_loop(graph, signal, cancel, park))
        {
            Ok(handle) => *worker = Some(handle),
            Err(e) => tracing::warn!(error = %e, "failed to spawn index build worker"),
        }
    }
}

fn worker_loop(graph: Weak<Graph>, signal: Arc<Signal>, cancel: Arc<AtomicBool>, park: Duration) {
    tracing::debug!("index build worker started");
    loop {
        if cancel.load(Ordering::Acquire) {
            break;
        }
        let progressed = match graph.upgrade() {
            Some(g) => g.indexer().step(g.store_lock()),
            None => break,
        };
        if !progressed {
            signal.wait(park);
        }
    }
    tracing::debug!("index build worker stopped");
}
