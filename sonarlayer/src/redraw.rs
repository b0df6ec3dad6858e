//! Redraw coalescing.
//!
//! Workers finish tiles far faster than a screen can usefully repaint. Each
//! finished tile only raises a shared dirty flag; a periodic tick on the
//! rendering side checks and clears the flag and triggers at most one
//! repaint per interval, however many tiles completed in between.
//!
//! ```text
//! worker ─┐
//! worker ─┼─ request_redraw() ─► [dirty] ─► tick() every 40ms ─► repaint()
//! worker ─┘
//! ```
//!
//! The flag is written with release ordering and consumed with acquire
//! ordering, so every cache store a worker made before its request is
//! visible to the repaint the request causes.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Default interval between dirty-flag checks.
pub const DEFAULT_REDRAW_INTERVAL: Duration = Duration::from_millis(40);

/// Cloneable handle raising the dirty flag.
#[derive(Clone, Default)]
pub struct RedrawSignal {
    dirty: Arc<AtomicBool>,
}

impl RedrawSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the view dirty. Non-blocking and idempotent.
    pub fn request_redraw(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// Whether a redraw is pending.
    pub fn is_pending(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Check and clear the flag.
    fn take(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }
}

impl fmt::Debug for RedrawSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedrawSignal")
            .field("pending", &self.is_pending())
            .finish()
    }
}

type RepaintFn = dyn Fn() + Send + Sync;

/// Rate-limits repaints triggered through a [`RedrawSignal`].
pub struct RedrawCoordinator {
    signal: RedrawSignal,
    interval: Duration,
    repaint: Box<RepaintFn>,
    repaints: AtomicU64,
}

impl RedrawCoordinator {
    /// Create a coordinator calling `repaint` at most once per `interval`.
    pub fn new<F>(interval: Duration, repaint: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            signal: RedrawSignal::new(),
            interval,
            repaint: Box::new(repaint),
            repaints: AtomicU64::new(0),
        }
    }

    /// Coordinator with the default 40 ms interval.
    pub fn with_default_interval<F>(repaint: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::new(DEFAULT_REDRAW_INTERVAL, repaint)
    }

    /// Handle for workers.
    pub fn signal(&self) -> RedrawSignal {
        self.signal.clone()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of repaints triggered so far.
    pub fn repaints(&self) -> u64 {
        self.repaints.load(Ordering::Relaxed)
    }

    /// One timer tick: repaint once if any redraw was requested since the
    /// previous tick.
    pub fn tick(&self) -> bool {
        if !self.signal.take() {
            return false;
        }
        self.repaints.fetch_add(1, Ordering::Relaxed);
        trace!("Redraw triggered");
        (self.repaint)();
        true
    }

    /// Drive `tick` on a fixed interval until `shutdown` is cancelled.
    ///
    /// Late ticks are skipped rather than replayed in a burst.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        debug!(interval_ms = self.interval.as_millis() as u64, "Redraw timer started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.tick();
                }
            }
        }

        debug!(repaints = self.repaints(), "Redraw timer stopped");
    }
}

impl fmt::Debug for RedrawCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedrawCoordinator")
            .field("interval", &self.interval)
            .field("signal", &self.signal)
            .field("repaints", &self.repaints())
            .finish()
    }
}
