//! Asynchronous tile generation.
//!
//! - [`WorkerPool`]: process-wide pool bounding concurrent fills
//! - [`GenerationQueue`]: one layer's de-duplicating view over the pool
//! - [`PendingQueue`]: the priority-ordered job bookkeeping behind a queue
//! - [`Priority`]: scheduling priority of a fill job
//!
//! # Example
//!
//! ```ignore
//! use sonarlayer::executor::{FillContext, GenerationQueue, Priority, WorkerPool};
//!
//! let pool = Arc::new(WorkerPool::with_defaults()?);
//! let queue = GenerationQueue::start("track", pool, 0, context);
//!
//! queue.push(tile, Priority::CENTER);
//! queue.push_end();
//!
//! queue.shutdown_blocking();
//! ```

mod generation;
mod policy;
mod pool;
mod queue;

pub use generation::{FillContext, GenerationQueue, QueueStats};
pub use policy::{Priority, PRIORITY_CENTER, PRIORITY_STEPS_PER_TILE};
pub use pool::{default_workers, PoolError, WorkerPool, WorkerPoolConfig, DEFAULT_THREAD_NAME};
pub use queue::{PendingQueue, PushOutcome, QueuedJob};
