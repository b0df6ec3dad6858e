//! Simulate command - drive a synthetic survey through the tile pipeline.
//!
//! A lawnmower survey track is appended in batches, exactly as a live sonar
//! feed would be. After each batch the touched region is reported to the
//! layer and a draw pass runs; workers fill tiles in the background and the
//! redraw coordinator triggers further passes until the pipeline settles.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use image::{imageops, RgbaImage};
use parking_lot::RwLock;
use serde::Serialize;
use sonarlayer::cache::{open_cache, TileCacheStats};
use sonarlayer::executor::{QueueStats, WorkerPool};
use sonarlayer::layer::{CompositeSink, NullSink, RenderSummary, TileOrchestrator};
use sonarlayer::redraw::RedrawCoordinator;
use sonarlayer::tile::{
    FillError, Point, TileFiller, TileGrid, TileIdentity, UniformGrid, ViewBounds,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Spacing between survey lines, in world units.
const LINE_SPACING: f64 = 48.0;

/// Distance between consecutive pings along a line.
const PING_STEP: f64 = 6.0;

/// Length of one survey line.
const LINE_LENGTH: f64 = 900.0;

/// Upper bound on how long the pipeline may take to settle.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Largest image the command will write, per side.
const MAX_IMAGE_SIDE: u32 = 16_384;

/// Arguments for the simulate command.
pub struct SimulateArgs {
    pub points: usize,
    pub batch: usize,
    pub zoom: u32,
    pub workers: Option<usize>,
    pub cache_dir: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub json: bool,
}

/// Final statistics of a simulation run.
#[derive(Debug, Serialize)]
struct SimulationReport {
    points: usize,
    passes: u64,
    generation: u64,
    elapsed_ms: u64,
    last_pass: RenderSummary,
    queue: QueueStats,
    cache: TileCacheStats,
    output: Option<PathBuf>,
}

/// Run the simulate command.
pub fn run(mut runner: CliRunner, args: SimulateArgs) -> Result<(), CliError> {
    runner.log_startup("simulate");
    if let Some(workers) = args.workers {
        runner.config_mut().workers.workers = workers;
    }
    if let Some(dir) = args.cache_dir.clone() {
        runner.config_mut().cache.directory = Some(dir);
    }
    let config = runner.config();

    if args.zoom as usize >= config.grid.zoom_levels {
        return Err(CliError::Config(format!(
            "Zoom index {} is outside the {} configured levels",
            args.zoom, config.grid.zoom_levels
        )));
    }

    let grid: Arc<UniformGrid> = Arc::new(UniformGrid::new(
        config.layer.tile_size,
        config.grid.zoom_scales(),
    ));
    let track = Arc::new(RwLock::new(Vec::with_capacity(args.points)));
    let filler = Arc::new(TrackFiller {
        track: Arc::clone(&track),
        grid: grid.clone(),
        tile_size: config.layer.tile_size,
        bytes_per_pixel: config.layer.bytes_per_pixel,
    });

    let pool = Arc::new(WorkerPool::new(config.workers.clone())?);
    let cache = open_cache(&config.cache)?;
    let coordinator = RedrawCoordinator::new(config.layer.redraw_interval, || {
        debug!("Redraw requested by workers")
    });
    let layer = TileOrchestrator::new(
        config.layer.clone(),
        grid.clone(),
        cache,
        filler,
        pool,
        coordinator.signal(),
    )?;

    let started = Instant::now();
    let mut passes = 0u64;
    let mut last_pass = RenderSummary::default();
    let mut view = None;

    // Feed the track in batches, one draw pass per batch.
    let pings = survey_track(args.points);
    for batch in pings.chunks(args.batch.max(1)) {
        let previous = track.read().last().copied();
        track.write().extend_from_slice(batch);

        let mut from = previous.unwrap_or(batch[0]);
        for &ping in batch {
            layer.notify_region_changed(from, ping);
            from = ping;
        }

        let current = view_of(&track.read());
        view = current;
        if let Some(bounds) = current {
            last_pass = layer.render_visible_region(&bounds, args.zoom, &mut NullSink);
            passes += 1;
        }
        if coordinator.tick() {
            debug!("Repaint coalesced into the next batch");
        }
    }

    // Let redraws drive further passes until nothing is left to fill.
    if let Some(bounds) = view {
        let deadline = Instant::now() + SETTLE_TIMEOUT;
        loop {
            std::thread::sleep(coordinator.interval());
            if coordinator.tick() {
                last_pass = layer.render_visible_region(&bounds, args.zoom, &mut NullSink);
                passes += 1;
            }
            if layer.queue_stats().is_idle() && !coordinator.signal().is_pending() {
                break;
            }
            if Instant::now() > deadline {
                warn!(timeout_secs = SETTLE_TIMEOUT.as_secs(), "Pipeline did not settle");
                break;
            }
        }
    }

    let written = match (&args.output, view) {
        (Some(path), Some(bounds)) => write_image(&layer, grid.as_ref(), &bounds, args.zoom, path),
        _ => Ok(None),
    };

    // The queue is joined on every path, including a failed image write.
    layer.shutdown_blocking();

    let output = match written? {
        Some(pass) => {
            last_pass = pass;
            passes += 1;
            args.output.clone()
        }
        None => None,
    };

    let report = SimulationReport {
        points: args.points,
        passes,
        generation: layer.generation(),
        elapsed_ms: started.elapsed().as_millis() as u64,
        last_pass,
        queue: layer.queue_stats(),
        cache: layer.cache_stats(),
        output,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

/// Composite the cached tiles covering `bounds` into a PNG at `path`.
fn write_image(
    layer: &TileOrchestrator,
    grid: &dyn TileGrid,
    bounds: &ViewBounds,
    zoom: u32,
    path: &Path,
) -> Result<Option<RenderSummary>, CliError> {
    let mut canvas = Canvas::new(grid, bounds, zoom)?;
    let pass = layer.render_visible_region(bounds, zoom, &mut canvas);
    canvas.image.save(path)?;
    info!(path = %path.display(), tiles = pass.found, "Wrote survey image");
    Ok(Some(pass))
}

fn print_report(report: &SimulationReport) {
    println!("Simulated {} pings in {} ms", report.points, report.elapsed_ms);
    println!("  Draw passes:   {}", report.passes);
    println!("  Generation:    {}", report.generation);
    println!(
        "  Last pass:     {} tiles, {} drawn, {} outdated, {} queued",
        report.last_pass.tiles,
        report.last_pass.found,
        report.last_pass.outdated,
        report.last_pass.queued
    );
    println!(
        "  Fills:         {} stored, {} empty, {} failed, {} dropped",
        report.queue.completed, report.queue.empty_fills, report.queue.failed, report.queue.dropped
    );
    println!(
        "  Cache lookups: {} hits, {} outdated, {} irrelevant, {} misses ({:.1}% displayable)",
        report.cache.hits,
        report.cache.outdated,
        report.cache.irrelevant,
        report.cache.misses,
        report.cache.hit_rate() * 100.0
    );
    if let Some(path) = &report.output {
        println!("  Image:         {}", path.display());
    }
}

/// Pings of a lawnmower survey: parallel lines run in alternating directions.
fn survey_track(count: usize) -> Vec<Point> {
    let per_line = (LINE_LENGTH / PING_STEP) as usize + 1;
    (0..count)
        .map(|i| {
            let line = i / per_line;
            let along = (i % per_line) as f64 * PING_STEP;
            let x = if line % 2 == 0 {
                along
            } else {
                LINE_LENGTH - along
            };
            Point::new(x + 16.0, line as f64 * LINE_SPACING + 16.0)
        })
        .collect()
}

/// Bounds of every ping so far, or `None` for an empty track.
fn view_of(track: &[Point]) -> Option<ViewBounds> {
    let first = track.first()?;
    let bounds = track.iter().fold(
        ViewBounds::around(*first, *first),
        |b, p| ViewBounds::new(b.min_x.min(p.x), b.min_y.min(p.y), b.max_x.max(p.x), b.max_y.max(p.y)),
    );
    Some(bounds)
}

/// Synthetic depth in metres at a world position.
fn depth_at(p: Point) -> f64 {
    30.0 + 12.0 * (p.x / 140.0).sin() + 8.0 * (p.y / 95.0).cos()
}

/// Renders the pings inside a tile as depth-coloured dots.
struct TrackFiller {
    track: Arc<RwLock<Vec<Point>>>,
    grid: Arc<UniformGrid>,
    tile_size: u32,
    bytes_per_pixel: u32,
}

impl TileFiller for TrackFiller {
    fn fill(&self, tile: &TileIdentity, cancel: &CancellationToken) -> Result<Vec<u8>, FillError> {
        let bounds = self.grid.tile_bounds(tile.column, tile.row, tile.zoom_index);
        if bounds.width() <= 0.0 {
            return Err(FillError::Failed(format!("no extent for {}", tile)));
        }

        let size = self.tile_size as usize;
        let bpp = self.bytes_per_pixel as usize;
        let scale = size as f64 / bounds.width();
        let mut pixels = vec![0u8; size * size * bpp];
        let mut drawn = 0usize;

        let track = self.track.read();
        for (i, ping) in track.iter().enumerate() {
            if i % 1024 == 0 && cancel.is_cancelled() {
                return Err(FillError::Cancelled);
            }
            if ping.x < bounds.min_x
                || ping.x >= bounds.max_x
                || ping.y < bounds.min_y
                || ping.y >= bounds.max_y
            {
                continue;
            }

            let px = ((ping.x - bounds.min_x) * scale) as usize;
            let py = ((ping.y - bounds.min_y) * scale) as usize;
            let color = depth_color(depth_at(*ping));
            for y in py.saturating_sub(1)..(py + 2).min(size) {
                for x in px.saturating_sub(1)..(px + 2).min(size) {
                    let offset = (y * size + x) * bpp;
                    for (c, value) in color.iter().take(bpp).enumerate() {
                        pixels[offset + c] = *value;
                    }
                }
            }
            drawn += 1;
        }

        if drawn == 0 {
            return Err(FillError::NoData);
        }
        Ok(pixels)
    }
}

/// Shallow water light, deep water dark.
fn depth_color(depth: f64) -> [u8; 4] {
    let t = ((depth - 10.0) / 40.0).clamp(0.0, 1.0);
    [
        (40.0 * (1.0 - t)) as u8,
        (220.0 - 160.0 * t) as u8,
        (255.0 - 90.0 * t) as u8,
        255,
    ]
}

/// Sink compositing RGBA tiles into one image.
struct Canvas {
    image: RgbaImage,
    origin: Point,
    scale: f64,
    tile_size: u32,
}

impl Canvas {
    fn new(grid: &dyn TileGrid, view: &ViewBounds, zoom: u32) -> Result<Self, CliError> {
        let range = grid
            .tile_range(view, zoom)
            .ok_or_else(|| CliError::Output("view has no tiles".to_string()))?;
        let first = grid.tile_bounds(range.col_min, range.row_min, zoom);
        let tile_size = grid.tile_size_px();

        let columns = (range.col_max - range.col_min + 1) as u32;
        let rows = (range.row_max - range.row_min + 1) as u32;
        let width = columns.saturating_mul(tile_size);
        let height = rows.saturating_mul(tile_size);
        if width > MAX_IMAGE_SIDE || height > MAX_IMAGE_SIDE {
            return Err(CliError::Output(format!(
                "image would be {}x{} pixels; use a coarser --zoom",
                width, height
            )));
        }

        Ok(Self {
            image: RgbaImage::new(width, height),
            origin: Point::new(first.min_x, first.min_y),
            scale: tile_size as f64 / first.width(),
            tile_size,
        })
    }
}

impl CompositeSink for Canvas {
    fn draw_tile(&mut self, tile: &TileIdentity, offset: (f64, f64), pixels: &[u8]) {
        let Some(top) = RgbaImage::from_raw(self.tile_size, self.tile_size, pixels.to_vec()) else {
            warn!(tile = %tile, len = pixels.len(), "Tile is not RGBA; skipped");
            return;
        };
        let x = ((offset.0 - self.origin.x) * self.scale).round() as i64;
        let y = ((offset.1 - self.origin.y) * self.scale).round() as i64;
        imageops::overlay(&mut self.image, &top, x, y);
    }
}
