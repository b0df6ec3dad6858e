//! Per-layer tile orchestration.
//!
//! The [`TileOrchestrator`] is the façade a presentation layer talks to. On
//! every draw it walks the visible tiles, composites whatever the cache can
//! show, and schedules fills for the rest. Upstream data changes and styling
//! changes enter through [`notify_region_changed`] and
//! [`notify_parameters_changed`].
//!
//! # Draw Pass
//!
//! ```text
//! view bounds ──► tile range ──► for each tile:
//!                                  lookup ──► refill? ──► queue.push
//!                                         └─► found?  ──► sink.draw_tile
//!                                queue.push_end
//! ```
//!
//! The pass never blocks on a worker: tiles that are not ready are simply
//! skipped and show up on a later pass, triggered by the redraw signal.
//!
//! [`notify_region_changed`]: TileOrchestrator::notify_region_changed
//! [`notify_parameters_changed`]: TileOrchestrator::notify_parameters_changed

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, trace};

use super::composite::CompositeSink;
use super::counter::GenerationCounter;
use super::error::LayerError;
use crate::cache::{
    Cache, KeySpace, ModificationLedger, Staleness, StalenessPolicy, TileCache, TileCacheStats,
};
use crate::config::LayerConfig;
use crate::executor::{FillContext, GenerationQueue, Priority, QueueStats, WorkerPool};
use crate::redraw::RedrawSignal;
use crate::tile::{Point, TileFiller, TileGrid, TileIdentity, ViewBounds};

/// What one draw pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RenderSummary {
    /// Tiles covering the view.
    pub tiles: usize,
    /// Tiles handed to the sink.
    pub found: usize,
    /// Of the found tiles, how many were outdated.
    pub outdated: usize,
    /// Fill jobs newly scheduled or carried into this pass.
    pub queued: usize,
    /// Jobs from earlier passes dropped at the end of this one.
    pub dropped: usize,
}

/// Tile pipeline of one layer.
pub struct TileOrchestrator {
    config: LayerConfig,
    grid: Arc<dyn TileGrid>,
    tiles: Arc<TileCache>,
    queue: GenerationQueue,
    generation: GenerationCounter,
    param_generation: AtomicU32,
}

impl TileOrchestrator {
    /// Assemble a layer pipeline.
    ///
    /// # Arguments
    ///
    /// * `config` - Layer namespace, tile format and staleness window
    /// * `grid` - Maps view bounds to tiles
    /// * `cache` - Persistent cache shared with other layers
    /// * `filler` - Produces tile pixels on worker threads
    /// * `pool` - Shared worker pool
    /// * `redraw` - Raised whenever a tile becomes ready
    pub fn new(
        config: LayerConfig,
        grid: Arc<dyn TileGrid>,
        cache: Arc<dyn Cache>,
        filler: Arc<dyn TileFiller>,
        pool: Arc<WorkerPool>,
        redraw: RedrawSignal,
    ) -> Result<Self, LayerError> {
        config.validate().map_err(LayerError::InvalidConfig)?;
        if grid.zoom_levels() == 0 {
            return Err(LayerError::InvalidConfig(
                "grid has no zoom levels".to_string(),
            ));
        }

        let keys = KeySpace::new(config.namespace.clone());
        let ledger = Arc::new(ModificationLedger::new(
            Arc::clone(&cache),
            keys.clone(),
            StalenessPolicy::new(config.staleness_tolerance),
        ));
        let tiles = Arc::new(TileCache::new(cache, keys, ledger));
        let generation = GenerationCounter::default();

        let queue = GenerationQueue::start(
            config.namespace.clone(),
            pool,
            0,
            FillContext {
                cache: Arc::clone(&tiles),
                filler,
                generation: generation.clone(),
                redraw,
            },
        );

        info!(
            namespace = %config.namespace,
            tile_size = config.tile_size,
            staleness_tolerance = config.staleness_tolerance,
            zoom_levels = grid.zoom_levels(),
            "Tile layer created"
        );

        Ok(Self {
            config,
            grid,
            tiles,
            queue,
            generation,
            param_generation: AtomicU32::new(0),
        })
    }

    /// Composite the cached tiles covering `view` and schedule the rest.
    pub fn render_visible_region(
        &self,
        view: &ViewBounds,
        scale_index: u32,
        sink: &mut dyn CompositeSink,
    ) -> RenderSummary {
        let param_generation = self.param_generation();
        let mut summary = RenderSummary::default();

        let Some(range) = self.grid.tile_range(view, scale_index) else {
            debug!(scale_index, "No tiles for view");
            summary.dropped = self.queue.push_end();
            return summary;
        };

        let center = view.center();
        for (column, row) in range.cells() {
            let tile = TileIdentity::new(column, row, scale_index, param_generation);
            let bounds = self.grid.tile_bounds(column, row, scale_index);
            summary.tiles += 1;

            let lookup = self.tiles.lookup(&tile);
            if lookup.refill_needed {
                let priority = priority_for(&bounds, center);
                if self.queue.push(tile, priority).is_scheduled() {
                    summary.queued += 1;
                }
            }

            if lookup.found {
                if let Some(pixels) = lookup.pixels {
                    sink.draw_tile(&tile, (bounds.min_x, bounds.min_y), &pixels);
                    summary.found += 1;
                    if lookup.staleness == Some(Staleness::Outdated) {
                        summary.outdated += 1;
                    }
                }
            }
        }

        summary.dropped = self.queue.push_end();
        trace!(
            namespace = %self.config.namespace,
            scale_index,
            tiles = summary.tiles,
            found = summary.found,
            queued = summary.queued,
            "Render pass complete"
        );
        summary
    }

    /// Record that upstream data along `start..end` changed.
    ///
    /// Advances the generation counter, then stamps every cell the segment
    /// crosses, at every zoom level. Returns the new generation.
    pub fn notify_region_changed(&self, start: Point, end: Point) -> u64 {
        let generation = self.generation.advance();
        let records = self.tiles.ledger().record_region_touched(
            self.grid.as_ref(),
            start,
            end,
            self.param_generation(),
            generation,
        );
        trace!(generation, records, "Region changed");
        generation
    }

    /// Invalidate every tile rendered under the current styling.
    ///
    /// Existing records stay in the cache but become unreachable, because
    /// the parameter generation is part of every key. Returns the new
    /// parameter generation.
    pub fn notify_parameters_changed(&self) -> u32 {
        let next = self.param_generation.fetch_add(1, Ordering::AcqRel) + 1;
        let dropped = self.queue.set_param_generation(next);
        info!(
            namespace = %self.config.namespace,
            param_generation = next,
            dropped,
            "Layer parameters changed"
        );
        next
    }

    /// Current data generation.
    pub fn generation(&self) -> u64 {
        self.generation.current()
    }

    /// Current parameter generation.
    pub fn param_generation(&self) -> u32 {
        self.param_generation.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    pub fn grid(&self) -> &Arc<dyn TileGrid> {
        &self.grid
    }

    /// The layer's tile cache client.
    pub fn tile_cache(&self) -> &Arc<TileCache> {
        &self.tiles
    }

    pub fn ledger(&self) -> &Arc<ModificationLedger> {
        self.tiles.ledger()
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.queue.stats()
    }

    pub fn cache_stats(&self) -> TileCacheStats {
        self.tiles.stats()
    }

    /// Stop the layer's queue and wait for in-flight fills.
    pub async fn shutdown(&self) {
        self.queue.shutdown().await;
    }

    /// Blocking variant of [`shutdown`](Self::shutdown).
    pub fn shutdown_blocking(&self) {
        self.queue.shutdown_blocking();
    }

    pub fn is_shut_down(&self) -> bool {
        self.queue.is_shut_down()
    }
}

/// Tiles nearer the view centre fill first.
fn priority_for(bounds: &ViewBounds, center: Point) -> Priority {
    let tile_center = bounds.center();
    let extent = bounds.width().max(f64::MIN_POSITIVE);
    let distance = (tile_center.x - center.x).hypot(tile_center.y - center.y);
    Priority::from_distance(distance / extent)
}
