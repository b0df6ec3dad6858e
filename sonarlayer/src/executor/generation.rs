//! Per-layer generation queue.
//!
//! A [`GenerationQueue`] is one layer's view over the shared [`WorkerPool`]:
//! it owns the layer's pending jobs and a dispatcher task on the pool
//! runtime, while the fill slots themselves are shared with every other
//! layer.
//!
//! # Job Lifecycle
//!
//! ```text
//! push ──► pending ──► (permit) ──► in flight ──► fill ──► store ──► redraw
//!             │                         │
//!             └── push_end / params ──► dropped
//! ```
//!
//! A worker reads the layer's generation counter *before* calling the
//! filler, so the stored tile never claims to include changes it could not
//! have seen.
//!
//! # Shutdown
//!
//! [`GenerationQueue::shutdown`] stops accepting work, discards pending jobs,
//! cancels the fill token and waits until every in-flight fill has returned.
//! A queue must be shut down before it is dropped; dropping a live queue is
//! a lifecycle violation that fails a debug assertion.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, instrument, trace, warn};

use super::policy::Priority;
use super::pool::WorkerPool;
use super::queue::{PendingQueue, PushOutcome, QueuedJob};
use crate::cache::TileCache;
use crate::layer::GenerationCounter;
use crate::redraw::RedrawSignal;
use crate::tile::{FillError, TileFiller, TileIdentity};

/// Collaborators a worker needs to complete a job.
#[derive(Clone)]
pub struct FillContext {
    /// Destination of filled tiles.
    pub cache: Arc<TileCache>,
    /// Pixel producer.
    pub filler: Arc<dyn TileFiller>,
    /// The layer's upstream data generation.
    pub generation: GenerationCounter,
    /// Raised after every successful store.
    pub redraw: RedrawSignal,
}

/// Point-in-time snapshot of queue activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Jobs waiting for a worker.
    pub pending: usize,
    /// Jobs currently being filled.
    pub in_flight: usize,
    /// Fills that produced pixels and were stored.
    pub completed: u64,
    /// Fills that produced nothing to draw.
    pub empty_fills: u64,
    /// Fills or stores that failed.
    pub failed: u64,
    /// Jobs discarded before running, or cancelled while running.
    pub dropped: u64,
}

impl QueueStats {
    /// Nothing pending and nothing in flight.
    pub fn is_idle(&self) -> bool {
        self.pending == 0 && self.in_flight == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobOutcome {
    Stored,
    Empty,
    Failed,
    Dropped,
}

#[derive(Debug, Default)]
struct Counters {
    completed: AtomicU64,
    empty_fills: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

/// State shared between the queue handle, its dispatcher and its jobs.
struct Shared {
    owner: String,
    pending: Mutex<PendingQueue>,
    work_ready: Notify,
    accepting: AtomicBool,
    cancel: CancellationToken,
    context: FillContext,
    counters: Counters,
}

impl Shared {
    #[instrument(level = "debug", skip(self, job), fields(owner = %self.owner, tile = %job.tile))]
    fn execute(&self, job: &QueuedJob) -> JobOutcome {
        let tile = &job.tile;
        if self.cancel.is_cancelled() {
            return JobOutcome::Dropped;
        }
        if self.pending.lock().param_generation() != tile.param_generation {
            debug!("Skipping fill for superseded parameters");
            return JobOutcome::Dropped;
        }

        let generation = self.context.generation.current();
        trace!(
            generation,
            priority = job.priority.value(),
            wait_ms = job.wait_time().as_millis() as u64,
            "Filling tile"
        );

        match self.context.filler.fill(tile, &self.cancel) {
            Ok(pixels) if pixels.is_empty() => JobOutcome::Empty,
            Ok(pixels) => {
                if self.context.cache.store(tile, &pixels, generation) {
                    JobOutcome::Stored
                } else {
                    JobOutcome::Failed
                }
            }
            Err(FillError::Cancelled) => JobOutcome::Dropped,
            Err(FillError::NoData) => JobOutcome::Empty,
            Err(e) => {
                warn!(error = %e, "Tile fill failed");
                JobOutcome::Failed
            }
        }
    }

    fn record(&self, outcome: JobOutcome) {
        let counter = match outcome {
            JobOutcome::Stored => &self.counters.completed,
            JobOutcome::Empty => &self.counters.empty_fills,
            JobOutcome::Failed => &self.counters.failed,
            JobOutcome::Dropped => &self.counters.dropped,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// One layer's fill queue over the shared worker pool.
pub struct GenerationQueue {
    shared: Arc<Shared>,
    pool: Arc<WorkerPool>,
    tracker: TaskTracker,
    joined: AtomicBool,
}

impl GenerationQueue {
    /// Create the queue and start its dispatcher on the pool runtime.
    ///
    /// # Arguments
    ///
    /// * `owner` - Tag identifying the layer in logs
    /// * `pool` - Shared worker pool
    /// * `param_generation` - Parameter generation accepted initially
    /// * `context` - Cache, filler, counter and redraw signal used by workers
    pub fn start(
        owner: impl Into<String>,
        pool: Arc<WorkerPool>,
        param_generation: u32,
        context: FillContext,
    ) -> Self {
        let shared = Arc::new(Shared {
            owner: owner.into(),
            pending: Mutex::new(PendingQueue::new(param_generation)),
            work_ready: Notify::new(),
            accepting: AtomicBool::new(true),
            cancel: CancellationToken::new(),
            context,
            counters: Counters::default(),
        });

        let tracker = TaskTracker::new();
        tracker.spawn_on(
            dispatch(Arc::clone(&shared), pool.permits(), tracker.clone()),
            pool.handle(),
        );

        debug!(owner = %shared.owner, param_generation, "Generation queue started");

        Self {
            shared,
            pool,
            tracker,
            joined: AtomicBool::new(false),
        }
    }

    /// Owner tag of this queue.
    pub fn owner(&self) -> &str {
        &self.shared.owner
    }

    /// The pool this queue runs on.
    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    /// Request a fill of `tile`.
    pub fn push(&self, tile: TileIdentity, priority: Priority) -> PushOutcome {
        let outcome = {
            let mut pending = self.shared.pending.lock();
            if !self.shared.accepting.load(Ordering::Acquire) {
                return PushOutcome::ShutDown;
            }
            pending.push(tile, priority)
        };

        if outcome.is_scheduled() {
            self.shared.work_ready.notify_one();
        }
        trace!(owner = %self.shared.owner, tile = %tile, ?outcome, "Pushed fill job");
        outcome
    }

    /// Close the current enumeration pass.
    ///
    /// Pending jobs that were not pushed again during the pass are dropped.
    /// Returns how many were dropped.
    pub fn push_end(&self) -> usize {
        let dropped = self.shared.pending.lock().end_pass();
        if dropped > 0 {
            self.shared
                .counters
                .dropped
                .fetch_add(dropped as u64, Ordering::Relaxed);
            debug!(owner = %self.shared.owner, dropped, "Dropped jobs from previous pass");
        }
        dropped
    }

    /// Switch to a new parameter generation, discarding pending jobs of
    /// older ones. Returns how many were discarded.
    pub fn set_param_generation(&self, param_generation: u32) -> usize {
        let dropped = self
            .shared
            .pending
            .lock()
            .retain_param_generation(param_generation);
        self.shared
            .counters
            .dropped
            .fetch_add(dropped as u64, Ordering::Relaxed);
        debug!(
            owner = %self.shared.owner,
            param_generation,
            dropped,
            "Parameter generation changed"
        );
        dropped
    }

    /// Parameter generation currently accepted.
    pub fn param_generation(&self) -> u32 {
        self.shared.pending.lock().param_generation()
    }

    /// Snapshot of queue activity.
    pub fn stats(&self) -> QueueStats {
        let (pending, in_flight) = {
            let queue = self.shared.pending.lock();
            (queue.len(), queue.in_flight())
        };
        let counters = &self.shared.counters;
        QueueStats {
            pending,
            in_flight,
            completed: counters.completed.load(Ordering::Relaxed),
            empty_fills: counters.empty_fills.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            dropped: counters.dropped.load(Ordering::Relaxed),
        }
    }

    /// Whether the queue has been shut down and joined.
    pub fn is_shut_down(&self) -> bool {
        self.joined.load(Ordering::Acquire)
    }

    /// Stop accepting work and wait for every in-flight fill to return.
    ///
    /// Pending jobs are discarded. In-flight fills see their cancellation
    /// token fire and may finish early. Calling this more than once is
    /// harmless.
    pub async fn shutdown(&self) {
        if self.is_shut_down() {
            return;
        }

        let discarded = {
            let mut pending = self.shared.pending.lock();
            self.shared.accepting.store(false, Ordering::Release);
            pending.clear()
        };
        self.shared
            .counters
            .dropped
            .fetch_add(discarded as u64, Ordering::Relaxed);

        self.shared.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        self.joined.store(true, Ordering::Release);

        info!(owner = %self.shared.owner, discarded, "Generation queue shut down");
    }

    /// Blocking variant of [`shutdown`](Self::shutdown) for callers without
    /// an async runtime.
    pub fn shutdown_blocking(&self) {
        futures::executor::block_on(self.shutdown());
    }
}

impl Drop for GenerationQueue {
    fn drop(&mut self) {
        let joined = self.joined.load(Ordering::Acquire);
        if joined {
            return;
        }

        self.shared.accepting.store(false, Ordering::Release);
        self.shared.cancel.cancel();
        error!(
            owner = %self.shared.owner,
            "Generation queue dropped without shutdown; in-flight fills may outlive the layer"
        );
        if !std::thread::panicking() {
            debug_assert!(
                joined,
                "GenerationQueue `{}` dropped without shutdown",
                self.shared.owner
            );
        }
    }
}

/// Hand pending jobs to workers as fill slots become free.
async fn dispatch(shared: Arc<Shared>, permits: Arc<Semaphore>, tracker: TaskTracker) {
    loop {
        let idle = shared.pending.lock().is_empty();
        if idle {
            tokio::select! {
                _ = shared.cancel.cancelled() => break,
                _ = shared.work_ready.notified() => continue,
            }
        }

        let permit = tokio::select! {
            _ = shared.cancel.cancelled() => break,
            permit = Arc::clone(&permits).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        // The pass may have ended while waiting for a slot.
        let job = shared.pending.lock().pop();
        if let Some(job) = job {
            tracker.spawn(run_job(Arc::clone(&shared), job, permit));
        }
    }

    trace!(owner = %shared.owner, "Dispatcher stopped");
}

async fn run_job(shared: Arc<Shared>, job: QueuedJob, permit: OwnedSemaphorePermit) {
    let tile = job.tile;
    let worker = Arc::clone(&shared);

    let outcome = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        worker.execute(&job)
    })
    .await
    .unwrap_or_else(|e| {
        error!(owner = %shared.owner, tile = %tile, error = %e, "Fill task panicked");
        JobOutcome::Failed
    });

    // Leave the in-flight set before signalling, so the repaint can push
    // the tile again if it is already outdated.
    shared.pending.lock().complete(&tile);
    if outcome == JobOutcome::Stored {
        shared.context.redraw.request_redraw();
    }
    shared.record(outcome);
}
