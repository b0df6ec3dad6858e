//! Pending fill jobs of one layer.
//!
//! Jobs are ordered by priority (higher values first), then by push order
//! (FIFO within the same priority level). On top of the ordering the queue
//! keeps the bookkeeping a tile pipeline needs:
//!
//! 1. A tile is never pending twice, and never pending while in flight
//! 2. Each render pass re-requests the tiles it still wants; jobs that were
//!    not re-requested when the pass ends are dropped
//! 3. Jobs for a superseded parameter generation are never handed out
//!
//! Re-prioritised and dropped jobs leave their old heap entry behind; the
//! entry is skipped on pop because its sequence number no longer matches the
//! live job.
//!
//! The queue is not thread-safe; the generation queue wraps it in a Mutex.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, Instant};

use super::policy::Priority;
use crate::tile::TileIdentity;

// =============================================================================
// Sequence Number Generator
// =============================================================================

/// Global sequence counter for FIFO ordering within priority levels.
static SEQUENCE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generates a unique sequence number for queue ordering.
fn next_sequence() -> u64 {
    SEQUENCE_COUNTER.fetch_add(1, AtomicOrdering::Relaxed)
}

// =============================================================================
// Push Outcome
// =============================================================================

/// What happened to a pushed tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The tile was not known and is now pending.
    Queued,
    /// The tile was already pending and is carried into the current pass.
    Requeued,
    /// The tile is already pending in this pass, or being filled.
    Duplicate,
    /// The tile belongs to an older parameter generation.
    StaleParameters,
    /// The queue no longer accepts work.
    ShutDown,
}

impl PushOutcome {
    /// Whether the tile will be filled as a result of this push.
    pub fn is_scheduled(&self) -> bool {
        matches!(self, PushOutcome::Queued | PushOutcome::Requeued)
    }
}

// =============================================================================
// Queued Job
// =============================================================================

/// A fill job waiting for a worker.
#[derive(Debug, Clone)]
pub struct QueuedJob {
    /// The tile to fill.
    pub tile: TileIdentity,

    /// Job priority (higher = more important).
    pub priority: Priority,

    /// Sequence number for FIFO ordering within priority level.
    sequence: u64,

    /// When the job was first enqueued.
    pub enqueued_at: Instant,
}

impl QueuedJob {
    fn new(tile: TileIdentity, priority: Priority, enqueued_at: Instant) -> Self {
        Self {
            tile,
            priority,
            sequence: next_sequence(),
            enqueued_at,
        }
    }

    /// Returns how long this job has been waiting in the queue.
    pub fn wait_time(&self) -> Duration {
        self.enqueued_at.elapsed()
    }
}

// Ordering for BinaryHeap: higher priority first, then lower sequence (older) first
impl PartialEq for QueuedJob {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}

impl Eq for QueuedJob {}

impl PartialOrd for QueuedJob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedJob {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.priority.cmp(&other.priority) {
            Ordering::Equal => other.sequence.cmp(&self.sequence),
            other_ordering => other_ordering,
        }
    }
}

/// Live state of a pending tile.
#[derive(Debug, Clone, Copy)]
struct PendingEntry {
    priority: Priority,
    sequence: u64,
    pass: u64,
    enqueued_at: Instant,
}

// =============================================================================
// Pending Queue
// =============================================================================

/// De-duplicating priority queue of fill jobs.
#[derive(Debug)]
pub struct PendingQueue {
    heap: BinaryHeap<QueuedJob>,
    pending: HashMap<TileIdentity, PendingEntry>,
    in_flight: HashSet<TileIdentity>,
    pass: u64,
    param_generation: u32,
}

impl PendingQueue {
    /// Creates an empty queue accepting `param_generation`.
    pub fn new(param_generation: u32) -> Self {
        Self {
            heap: BinaryHeap::new(),
            pending: HashMap::new(),
            in_flight: HashSet::new(),
            pass: 0,
            param_generation,
        }
    }

    /// Request a fill of `tile` in the current pass.
    pub fn push(&mut self, tile: TileIdentity, priority: Priority) -> PushOutcome {
        if tile.param_generation != self.param_generation {
            return PushOutcome::StaleParameters;
        }
        if self.in_flight.contains(&tile) {
            return PushOutcome::Duplicate;
        }

        let pass = self.pass;
        if let Some(entry) = self.pending.get_mut(&tile) {
            let carried = entry.pass != pass;
            entry.pass = pass;
            if entry.priority != priority {
                let job = QueuedJob::new(tile, priority, entry.enqueued_at);
                entry.priority = priority;
                entry.sequence = job.sequence;
                self.heap.push(job);
            }
            return if carried {
                PushOutcome::Requeued
            } else {
                PushOutcome::Duplicate
            };
        }

        let job = QueuedJob::new(tile, priority, Instant::now());
        self.pending.insert(
            tile,
            PendingEntry {
                priority,
                sequence: job.sequence,
                pass,
                enqueued_at: job.enqueued_at,
            },
        );
        self.heap.push(job);
        PushOutcome::Queued
    }

    /// Close the current pass.
    ///
    /// Drops pending jobs that were not pushed during the pass and returns
    /// how many were dropped.
    pub fn end_pass(&mut self) -> usize {
        let pass = self.pass;
        let before = self.pending.len();
        self.pending.retain(|_, entry| entry.pass == pass);
        self.pass += 1;
        let dropped = before - self.pending.len();
        self.compact();
        dropped
    }

    /// Switch to `param_generation`, dropping pending jobs of any other
    /// generation. Returns how many were dropped.
    pub fn retain_param_generation(&mut self, param_generation: u32) -> usize {
        self.param_generation = param_generation;
        let before = self.pending.len();
        self.pending
            .retain(|tile, _| tile.param_generation == param_generation);
        let dropped = before - self.pending.len();
        self.compact();
        dropped
    }

    /// Take the highest-priority live job and mark it in flight.
    pub fn pop(&mut self) -> Option<QueuedJob> {
        while let Some(job) = self.heap.pop() {
            let live = self
                .pending
                .get(&job.tile)
                .is_some_and(|entry| entry.sequence == job.sequence);
            if !live {
                continue;
            }
            self.pending.remove(&job.tile);
            if job.tile.param_generation != self.param_generation {
                continue;
            }
            self.in_flight.insert(job.tile);
            return Some(job);
        }
        None
    }

    /// Mark a popped job as finished.
    pub fn complete(&mut self, tile: &TileIdentity) -> bool {
        self.in_flight.remove(tile)
    }

    /// Drop every pending job. In-flight jobs are unaffected.
    pub fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        self.heap.clear();
        dropped
    }

    /// Whether `tile` is pending or in flight.
    pub fn contains(&self, tile: &TileIdentity) -> bool {
        self.pending.contains_key(tile) || self.in_flight.contains(tile)
    }

    /// Returns the number of pending jobs.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if no job is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Returns the number of jobs handed out and not yet completed.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn param_generation(&self) -> u32 {
        self.param_generation
    }

    /// Rebuild the heap once dead entries dominate it.
    fn compact(&mut self) {
        if self.pending.is_empty() {
            self.heap.clear();
            return;
        }
        if self.heap.len() <= 2 * self.pending.len() + 64 {
            return;
        }
        let pending = &self.pending;
        let live: Vec<_> = self
            .heap
            .drain()
            .filter(|job| {
                pending
                    .get(&job.tile)
                    .is_some_and(|entry| entry.sequence == job.sequence)
            })
            .collect();
        self.heap = BinaryHeap::from(live);
    }
}

impl Default for PendingQueue {
    fn default() -> Self {
        Self::new(0)
    }
}

// =============================================================================
// Tests
// =============================================================================
