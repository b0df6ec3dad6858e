//! Shared worker pool for tile fills.
//!
//! One pool serves every layer in the process. It owns a dedicated tokio
//! runtime (so the rendering thread never needs one) plus a semaphore that
//! bounds how many fills run at once across all layers.
//!
//! ```text
//!   layer A queue ─┐
//!   layer B queue ─┼──► permits (N) ──► spawn_blocking(fill) ──► store
//!   layer C queue ─┘
//! ```

use std::io;
use std::sync::Arc;

use thiserror::Error;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::Semaphore;
use tracing::info;

/// Default thread name prefix for pool threads.
pub const DEFAULT_THREAD_NAME: &str = "sonarlayer-worker";

/// Fallback worker count when the hardware parallelism is unknown.
pub const FALLBACK_WORKERS: usize = 4;

/// Errors raised while building the pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Worker count must be at least one.
    #[error("Worker count must be greater than zero")]
    NoWorkers,

    /// The runtime could not be started.
    #[error("Failed to start worker runtime: {0}")]
    Runtime(#[from] io::Error),
}

/// Worker pool configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerPoolConfig {
    /// Maximum number of concurrent fills.
    pub workers: usize,
    /// Thread name prefix.
    pub thread_name: String,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}

impl WorkerPoolConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}

/// Number of workers matching the available hardware parallelism.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(FALLBACK_WORKERS)
}

/// Process-wide pool executing fills for every layer.
///
/// Share it with `Arc`; each layer's `GenerationQueue` is a logical view
/// over the same permits.
pub struct WorkerPool {
    runtime: Option<Runtime>,
    handle: Handle,
    permits: Arc<Semaphore>,
    workers: usize,
}

impl WorkerPool {
    /// Start a pool.
    pub fn new(config: WorkerPoolConfig) -> Result<Self, PoolError> {
        if config.workers == 0 {
            return Err(PoolError::NoWorkers);
        }

        // Dispatchers are light; fills run on the blocking pool, capped by
        // the semaphore rather than by the thread count.
        let runtime = Builder::new_multi_thread()
            .worker_threads(config.workers.min(2))
            .max_blocking_threads(config.workers)
            .thread_name(config.thread_name.clone())
            .enable_all()
            .build()?;

        info!(
            workers = config.workers,
            thread_name = %config.thread_name,
            "Started tile worker pool"
        );

        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
            permits: Arc::new(Semaphore::new(config.workers)),
            workers: config.workers,
        })
    }

    /// Start a pool sized to the available hardware parallelism.
    pub fn with_defaults() -> Result<Self, PoolError> {
        Self::new(WorkerPoolConfig::default())
    }

    /// Handle of the pool runtime.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Semaphore bounding concurrent fills.
    pub fn permits(&self) -> Arc<Semaphore> {
        Arc::clone(&self.permits)
    }

    /// Configured number of concurrent fills.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Fill slots currently free.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers)
            .field("available", &self.available())
            .finish()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Queues join their work before the pool goes away, so nothing is
        // left to wait for. shutdown_background is safe inside async contexts.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
