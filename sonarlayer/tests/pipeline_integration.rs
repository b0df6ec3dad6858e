//! Integration tests for the tile pipeline.
//!
//! These tests drive the public API end to end:
//! - Tile cache freshness as the modification ledger advances
//! - Draw passes scheduling fills on the shared worker pool
//! - De-duplication, empty fills, parameter changes and abandoned views
//! - Shutdown and redraw coalescing
//!
//! Run with: `cargo test --test pipeline_integration`

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use sonarlayer::cache::{
    Cache, KeySpace, MemoryCacheProvider, ModificationLedger, Staleness, StalenessPolicy,
    TileCache,
};
use sonarlayer::config::LayerConfig;
use sonarlayer::executor::{WorkerPool, WorkerPoolConfig};
use sonarlayer::layer::{CompositeSink, TileOrchestrator};
use sonarlayer::redraw::{RedrawCoordinator, RedrawSignal};
use sonarlayer::tile::{FillError, Point, TileFiller, TileIdentity, UniformGrid, ViewBounds};

// ============================================================================
// Helper Functions
// ============================================================================

/// Pixels of a full 256x256 RGBA tile.
fn full_tile() -> Vec<u8> {
    vec![0x7f; 256 * 256 * 4]
}

/// View covering the 2x2 block of zoom-0 tiles at the origin.
fn two_by_two() -> ViewBounds {
    ViewBounds::new(0.0, 0.0, 512.0, 512.0)
}

/// View covering only tile (0, 0) at zoom 0.
fn single() -> ViewBounds {
    ViewBounds::new(0.0, 0.0, 256.0, 256.0)
}

fn pool(workers: usize) -> Arc<WorkerPool> {
    Arc::new(
        WorkerPool::new(WorkerPoolConfig::default().with_workers(workers))
            .expect("pool should start"),
    )
}

fn grid() -> Arc<UniformGrid> {
    Arc::new(UniformGrid::new(256, vec![256.0, 512.0, 1024.0]))
}

fn orchestrator(
    cache: Arc<MemoryCacheProvider>,
    filler: Arc<dyn TileFiller>,
    workers: usize,
    redraw: RedrawSignal,
) -> TileOrchestrator {
    TileOrchestrator::new(
        LayerConfig::new("depth"),
        grid(),
        cache,
        filler,
        pool(workers),
        redraw,
    )
    .expect("valid layer")
}

/// Filler producing one byte per tile column.
fn column_filler() -> Arc<dyn TileFiller> {
    Arc::new(
        |tile: &TileIdentity, _: &CancellationToken| -> Result<Vec<u8>, FillError> {
            Ok(vec![tile.column as u8; 16])
        },
    )
}

/// Filler that blocks until `gate` opens or the job is cancelled.
fn gated_filler(gate: Arc<AtomicBool>, calls: Arc<AtomicUsize>) -> Arc<dyn TileFiller> {
    Arc::new(
        move |_: &TileIdentity, cancel: &CancellationToken| -> Result<Vec<u8>, FillError> {
            calls.fetch_add(1, Ordering::SeqCst);
            while !gate.load(Ordering::Acquire) {
                if cancel.is_cancelled() {
                    return Err(FillError::Cancelled);
                }
                std::thread::sleep(Duration::from_millis(1));
            }
            Ok(vec![1; 16])
        },
    )
}

/// Filler that records every tile it is asked for, then blocks on `gate`.
fn logging_gated_filler(
    gate: Arc<AtomicBool>,
    seen: Arc<Mutex<Vec<TileIdentity>>>,
) -> Arc<dyn TileFiller> {
    Arc::new(
        move |tile: &TileIdentity, cancel: &CancellationToken| -> Result<Vec<u8>, FillError> {
            seen.lock().push(*tile);
            while !gate.load(Ordering::Acquire) {
                if cancel.is_cancelled() {
                    return Err(FillError::Cancelled);
                }
                std::thread::sleep(Duration::from_millis(1));
            }
            Ok(vec![1; 16])
        },
    )
}

fn wait_until(description: &str, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", description);
        std::thread::sleep(Duration::from_millis(2));
    }
}

/// Sink recording which tiles were drawn.
#[derive(Default)]
struct RecordingSink {
    drawn: Vec<(TileIdentity, (f64, f64), Vec<u8>)>,
}

impl CompositeSink for RecordingSink {
    fn draw_tile(&mut self, tile: &TileIdentity, offset: (f64, f64), pixels: &[u8]) {
        self.drawn.push((*tile, offset, pixels.to_vec()));
    }
}

// ============================================================================
// Tile Cache Scenarios
// ============================================================================

/// A stored tile stays displayable while the ledger lags within the
/// tolerance window, and stops being displayable beyond it.
#[test]
fn test_tile_cache_freshness_scenarios() {
    let cache = Arc::new(MemoryCacheProvider::new(10_000_000));
    let keys = KeySpace::new("depth");
    let ledger = Arc::new(ModificationLedger::new(
        cache.clone(),
        keys.clone(),
        StalenessPolicy::default(),
    ));
    let tiles = TileCache::new(cache, keys, Arc::clone(&ledger));
    let grid = UniformGrid::new(256, vec![256.0, 128.0, 64.0]);
    let identity = TileIdentity::new(3, 5, 2, 1);

    // Segment inside cell (3, 5) at zoom 2, which spans x 192..256, y 320..384.
    let start = Point::new(200.0, 330.0);
    let end = Point::new(210.0, 340.0);

    // Scenario A: no prior entry, then a store at generation 10.
    let lookup = tiles.lookup(&identity);
    assert!(!lookup.found);
    assert!(lookup.refill_needed);

    assert!(tiles.store(&identity, &full_tile(), 10));
    let lookup = tiles.lookup(&identity);
    assert!(lookup.found);
    assert!(!lookup.refill_needed);
    assert_eq!(lookup.staleness, Some(Staleness::Actual));
    assert_eq!(lookup.pixels.map(|p| p.len()), Some(256 * 256 * 4));

    // Scenario B: ledger at 14, four generations behind.
    ledger.record_region_touched(&grid, start, end, 1, 14);
    let lookup = tiles.lookup(&identity);
    assert!(lookup.found);
    assert!(lookup.refill_needed);
    assert_eq!(lookup.staleness, Some(Staleness::Outdated));

    // Scenario C: ledger at 20, ten generations behind.
    ledger.record_region_touched(&grid, start, end, 1, 20);
    let lookup = tiles.lookup(&identity);
    assert!(!lookup.found);
    assert!(lookup.refill_needed);
    assert_eq!(lookup.staleness, Some(Staleness::Irrelevant));
}

/// Scenario D: a segment crossing two cells marks exactly those cells.
#[test]
fn test_region_change_marks_crossed_cells_only() {
    let cache = Arc::new(MemoryCacheProvider::new(10_000_000));
    let layer = orchestrator(cache, column_filler(), 1, RedrawSignal::new());

    let generation = layer.notify_region_changed(Point::new(100.0, 100.0), Point::new(400.0, 100.0));
    assert_eq!(generation, 1);

    let ledger = layer.ledger();
    assert_eq!(ledger.latest_generation(&TileIdentity::new(0, 0, 0, 0)), Some(1));
    assert_eq!(ledger.latest_generation(&TileIdentity::new(1, 0, 0, 0)), Some(1));
    assert_eq!(ledger.latest_generation(&TileIdentity::new(0, 1, 0, 0)), None);
    assert_eq!(ledger.latest_generation(&TileIdentity::new(2, 0, 0, 0)), None);

    // Coarser zooms are marked too.
    assert_eq!(ledger.latest_generation(&TileIdentity::new(0, 0, 1, 0)), Some(1));
    assert_eq!(ledger.latest_generation(&TileIdentity::new(0, 0, 2, 0)), Some(1));

    layer.shutdown_blocking();
}

// ============================================================================
// Draw Pass Integration
// ============================================================================

/// Misses are scheduled, filled by workers, and drawn on the next pass;
/// a region change refills only the touched tile.
#[test]
fn test_draw_fill_redraw_cycle() {
    let cache = Arc::new(MemoryCacheProvider::new(10_000_000));
    let redraw = RedrawSignal::new();
    let layer = orchestrator(cache, column_filler(), 2, redraw.clone());

    // First pass: nothing cached, everything scheduled.
    let mut sink = RecordingSink::default();
    let summary = layer.render_visible_region(&two_by_two(), 0, &mut sink);
    assert_eq!(summary.tiles, 4);
    assert_eq!(summary.found, 0);
    assert_eq!(summary.queued, 4);
    assert!(sink.drawn.is_empty());

    wait_until("four fills", || layer.queue_stats().completed == 4);
    assert!(redraw.is_pending());

    // Second pass: everything drawn at its world offset.
    let mut sink = RecordingSink::default();
    let summary = layer.render_visible_region(&two_by_two(), 0, &mut sink);
    assert_eq!(summary.found, 4);
    assert_eq!(summary.queued, 0);

    let (_, offset, pixels) = sink
        .drawn
        .iter()
        .find(|(tile, _, _)| tile.column == 1 && tile.row == 1)
        .expect("tile (1, 1) drawn");
    assert_eq!(*offset, (256.0, 256.0));
    assert_eq!(pixels, &vec![1u8; 16]);

    // Touching tile (0, 0) makes it outdated: still drawn, refilled once.
    layer.notify_region_changed(Point::new(10.0, 10.0), Point::new(20.0, 20.0));
    let summary = layer.render_visible_region(&two_by_two(), 0, &mut RecordingSink::default());
    assert_eq!(summary.found, 4);
    assert_eq!(summary.outdated, 1);
    assert_eq!(summary.queued, 1);

    wait_until("refill", || layer.queue_stats().completed == 5);
    let summary = layer.render_visible_region(&two_by_two(), 0, &mut RecordingSink::default());
    assert_eq!(summary.outdated, 0);
    assert_eq!(summary.queued, 0);

    // Far beyond the tolerance window the tile is hidden until refilled.
    for _ in 0..6 {
        layer.notify_region_changed(Point::new(10.0, 10.0), Point::new(20.0, 20.0));
    }
    let summary = layer.render_visible_region(&two_by_two(), 0, &mut RecordingSink::default());
    assert_eq!(summary.found, 3);
    assert_eq!(summary.queued, 1);

    wait_until("second refill", || layer.queue_stats().completed == 6);
    layer.shutdown_blocking();
}

/// Requesting a tile again while it is being filled does not fill it twice.
#[test]
fn test_repeated_draws_fill_once() {
    let gate = Arc::new(AtomicBool::new(false));
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = Arc::new(MemoryCacheProvider::new(10_000_000));
    let layer = orchestrator(
        cache,
        gated_filler(Arc::clone(&gate), Arc::clone(&calls)),
        2,
        RedrawSignal::new(),
    );

    let summary = layer.render_visible_region(&single(), 0, &mut RecordingSink::default());
    assert_eq!(summary.queued, 1);
    wait_until("fill to start", || layer.queue_stats().in_flight == 1);

    for _ in 0..5 {
        let summary = layer.render_visible_region(&single(), 0, &mut RecordingSink::default());
        assert_eq!(summary.queued, 0);
    }

    gate.store(true, Ordering::Release);
    wait_until("fill to finish", || layer.queue_stats().completed == 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    layer.shutdown_blocking();
}

/// An empty fill is never cached; the tile is retried on the next pass.
#[test]
fn test_empty_fill_not_cached() {
    let cache = Arc::new(MemoryCacheProvider::new(10_000_000));
    let empty: Arc<dyn TileFiller> = Arc::new(
        |_: &TileIdentity, _: &CancellationToken| -> Result<Vec<u8>, FillError> { Ok(Vec::new()) },
    );
    let layer = orchestrator(cache.clone(), empty, 1, RedrawSignal::new());

    layer.render_visible_region(&single(), 0, &mut RecordingSink::default());
    wait_until("empty fill", || layer.queue_stats().empty_fills == 1);

    let lookup = layer.tile_cache().lookup(&TileIdentity::new(0, 0, 0, 0));
    assert!(!lookup.found);
    assert_eq!(cache.entry_count(), 0);

    let summary = layer.render_visible_region(&single(), 0, &mut RecordingSink::default());
    assert_eq!(summary.found, 0);
    assert_eq!(summary.queued, 1);
    wait_until("retry", || layer.queue_stats().empty_fills == 2);

    layer.shutdown_blocking();
}

/// Changing parameters makes old tiles unreachable without deleting them.
#[test]
fn test_parameter_change_isolates_keys() {
    let cache = Arc::new(MemoryCacheProvider::new(10_000_000));
    let layer = orchestrator(cache.clone(), column_filler(), 1, RedrawSignal::new());
    let old = TileIdentity::new(0, 0, 0, 0);

    layer.render_visible_region(&single(), 0, &mut RecordingSink::default());
    wait_until("fill", || layer.queue_stats().completed == 1);
    assert!(layer.tile_cache().lookup(&old).found);

    assert_eq!(layer.notify_parameters_changed(), 1);

    let new = old.with_param_generation(1);
    assert!(!layer.tile_cache().lookup(&new).found);
    let old_key = layer.tile_cache().keys().tile_key(&old);
    assert!(cache.get(&old_key).unwrap().is_some());

    let mut sink = RecordingSink::default();
    let summary = layer.render_visible_region(&single(), 0, &mut sink);
    assert_eq!(summary.found, 0);
    assert_eq!(summary.queued, 1);
    assert!(sink.drawn.is_empty());

    wait_until("refill under new parameters", || {
        layer.queue_stats().completed == 2
    });
    assert!(layer.tile_cache().lookup(&new).found);

    layer.shutdown_blocking();
}

/// Moving the view away drops the jobs the new pass no longer asks for; the
/// running fill finishes and the abandoned tiles are never filled.
#[test]
fn test_view_jump_drops_abandoned_jobs() {
    let gate = Arc::new(AtomicBool::new(false));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let cache = Arc::new(MemoryCacheProvider::new(10_000_000));
    let layer = orchestrator(
        cache,
        logging_gated_filler(Arc::clone(&gate), Arc::clone(&seen)),
        1,
        RedrawSignal::new(),
    );

    let summary = layer.render_visible_region(&two_by_two(), 0, &mut RecordingSink::default());
    assert_eq!(summary.queued, 4);
    assert_eq!(summary.dropped, 0);
    wait_until("first fill to start", || layer.queue_stats().in_flight == 1);
    assert_eq!(layer.queue_stats().pending, 3);

    // Tile (8, 8) at zoom 0, far from the first view.
    let far = ViewBounds::new(2048.0, 2048.0, 2304.0, 2304.0);
    let summary = layer.render_visible_region(&far, 0, &mut RecordingSink::default());
    assert_eq!(summary.tiles, 1);
    assert_eq!(summary.queued, 1);
    assert_eq!(summary.dropped, 3);

    let stats = layer.queue_stats();
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.in_flight, 1);
    assert_eq!(stats.dropped, 3);

    gate.store(true, Ordering::Release);
    wait_until("running and new fills", || {
        let stats = layer.queue_stats();
        stats.completed == 2 && stats.is_idle()
    });

    let seen = seen.lock().clone();
    assert_eq!(seen.len(), 2);
    assert!(seen[0].column < 2 && seen[0].row < 2);
    assert_eq!((seen[1].column, seen[1].row), (8, 8));
    assert_eq!(layer.queue_stats().dropped, 3);

    layer.shutdown_blocking();
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Shutdown discards queued jobs, cancels the running one and joins it.
#[test]
fn test_shutdown_discards_and_joins() {
    let gate = Arc::new(AtomicBool::new(false));
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = Arc::new(MemoryCacheProvider::new(10_000_000));
    let layer = orchestrator(
        cache.clone(),
        gated_filler(gate, Arc::clone(&calls)),
        1,
        RedrawSignal::new(),
    );

    let summary = layer.render_visible_region(&two_by_two(), 0, &mut RecordingSink::default());
    assert_eq!(summary.queued, 4);
    wait_until("first fill to start", || layer.queue_stats().in_flight == 1);

    layer.shutdown_blocking();
    assert!(layer.is_shut_down());

    let stats = layer.queue_stats();
    assert!(stats.is_idle());
    assert_eq!(stats.completed, 0);
    assert_eq!(stats.dropped, 4);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.entry_count(), 0);

    // Draws after shutdown still composite but schedule nothing.
    let summary = layer.render_visible_region(&two_by_two(), 0, &mut RecordingSink::default());
    assert_eq!(summary.tiles, 4);
    assert_eq!(summary.queued, 0);

    // Idempotent.
    layer.shutdown_blocking();
}

/// Many completed tiles between two ticks cause a single repaint.
#[test]
fn test_completed_tiles_coalesce_into_one_repaint() {
    let repaints = Arc::new(AtomicUsize::new(0));
    let coordinator = {
        let repaints = Arc::clone(&repaints);
        RedrawCoordinator::with_default_interval(move || {
            repaints.fetch_add(1, Ordering::SeqCst);
        })
    };
    let cache = Arc::new(MemoryCacheProvider::new(10_000_000));
    let layer = orchestrator(cache, column_filler(), 4, coordinator.signal());

    layer.render_visible_region(&two_by_two(), 0, &mut RecordingSink::default());
    wait_until("four fills", || layer.queue_stats().completed == 4);

    assert!(coordinator.tick());
    assert!(!coordinator.tick());
    assert_eq!(repaints.load(Ordering::SeqCst), 1);

    layer.shutdown_blocking();
}
