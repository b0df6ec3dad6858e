//! Tile grid abstraction.
//!
//! The grid maps world coordinates (the projected plane the survey data is
//! drawn in) onto tile cells at each level of a fixed zoom-level table. The
//! layer code never does projection math itself; it asks a [`TileGrid`] which
//! cells cover a view and which cells a modified track segment crosses.
//!
//! [`UniformGrid`] is a planar reference implementation with a constant origin
//! and a per-zoom tile extent.

use std::ops::RangeInclusive;

/// A point in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl ViewBounds {
    /// Create bounds from two corners, in any order.
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            min_x: x0.min(x1),
            min_y: y0.min(y1),
            max_x: x0.max(x1),
            max_y: y0.max(y1),
        }
    }

    /// Smallest bounds containing both points.
    pub fn around(a: Point, b: Point) -> Self {
        Self::new(a.x, a.y, b.x, b.y)
    }

    /// Centre of the bounds.
    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Returns true if the bounds contain no finite area or are malformed.
    pub fn is_degenerate(&self) -> bool {
        !(self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite())
            || self.max_x < self.min_x
            || self.max_y < self.min_y
    }
}

/// Inclusive rectangular range of tile cells at one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub zoom_index: u32,
    pub col_min: i32,
    pub col_max: i32,
    pub row_min: i32,
    pub row_max: i32,
}

impl TileRange {
    pub fn columns(&self) -> RangeInclusive<i32> {
        self.col_min..=self.col_max
    }

    pub fn rows(&self) -> RangeInclusive<i32> {
        self.row_min..=self.row_max
    }

    /// Number of cells in the range.
    pub fn len(&self) -> usize {
        let cols = (self.col_max as i64 - self.col_min as i64 + 1).max(0) as usize;
        let rows = (self.row_max as i64 - self.row_min as i64 + 1).max(0) as usize;
        cols * rows
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over `(column, row)` pairs, row-major.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.rows()
            .flat_map(move |row| self.columns().map(move |col| (col, row)))
    }
}

/// Maps world coordinates onto tile cells.
///
/// Implementations must be `Send + Sync`: the ledger walks the grid while
/// workers are filling tiles.
pub trait TileGrid: Send + Sync {
    /// Number of entries in the fixed zoom-level table.
    fn zoom_levels(&self) -> usize;

    /// Edge length of a tile in pixels.
    fn tile_size_px(&self) -> u32;

    /// World extent of a single cell.
    fn tile_bounds(&self, column: i32, row: i32, zoom_index: u32) -> ViewBounds;

    /// The cells covering `bounds` at `zoom_index`.
    ///
    /// Returns `None` for an unknown zoom index or degenerate bounds.
    fn tile_range(&self, bounds: &ViewBounds, zoom_index: u32) -> Option<TileRange>;

    /// Every cell at `zoom_index` whose extent intersects the segment.
    ///
    /// The default implementation clips the segment against each candidate
    /// cell in the segment's bounding range.
    fn cells_on_segment(&self, start: Point, end: Point, zoom_index: u32) -> Vec<(i32, i32)> {
        let Some(range) = self.tile_range(&ViewBounds::around(start, end), zoom_index) else {
            return Vec::new();
        };

        range
            .cells()
            .filter(|&(col, row)| {
                segment_intersects(start, end, &self.tile_bounds(col, row, zoom_index))
            })
            .collect()
    }
}

/// Liang–Barsky test of a segment against a closed rectangle.
pub fn segment_intersects(a: Point, b: Point, rect: &ViewBounds) -> bool {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let mut t_enter = 0.0_f64;
    let mut t_exit = 1.0_f64;

    let edges = [
        (-dx, a.x - rect.min_x),
        (dx, rect.max_x - a.x),
        (-dy, a.y - rect.min_y),
        (dy, rect.max_y - a.y),
    ];

    for (p, q) in edges {
        if p == 0.0 {
            // Parallel to this edge: reject if outside it.
            if q < 0.0 {
                return false;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            if t > t_exit {
                return false;
            }
            t_enter = t_enter.max(t);
        } else {
            if t < t_enter {
                return false;
            }
            t_exit = t_exit.min(t);
        }
    }

    t_enter <= t_exit
}

/// Planar grid with a fixed origin and a per-zoom tile extent.
///
/// Column `c` at zoom `z` spans `origin.x + c * scale[z] .. origin.x + (c + 1) * scale[z]`,
/// rows likewise along Y.
///
/// # Example
///
/// ```
/// use sonarlayer::tile::{TileGrid, UniformGrid, ViewBounds};
///
/// let grid = UniformGrid::new(256, vec![100.0, 50.0, 25.0]);
/// let range = grid.tile_range(&ViewBounds::new(0.0, 0.0, 99.0, 99.0), 1).unwrap();
/// assert_eq!(range.len(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct UniformGrid {
    origin: Point,
    tile_size_px: u32,
    zoom_scales: Vec<f64>,
}

impl UniformGrid {
    /// Create a grid anchored at the world origin.
    ///
    /// # Arguments
    ///
    /// * `tile_size_px` - Tile edge length in pixels
    /// * `zoom_scales` - World extent of one tile at each zoom index
    pub fn new(tile_size_px: u32, zoom_scales: Vec<f64>) -> Self {
        Self {
            origin: Point::new(0.0, 0.0),
            tile_size_px,
            zoom_scales,
        }
    }

    /// Move the grid origin.
    pub fn with_origin(mut self, origin: Point) -> Self {
        self.origin = origin;
        self
    }

    /// World extent of one tile at `zoom_index`.
    pub fn scale(&self, zoom_index: u32) -> Option<f64> {
        self.zoom_scales
            .get(zoom_index as usize)
            .copied()
            .filter(|s| s.is_finite() && *s > 0.0)
    }
}

impl TileGrid for UniformGrid {
    fn zoom_levels(&self) -> usize {
        self.zoom_scales.len()
    }

    fn tile_size_px(&self) -> u32 {
        self.tile_size_px
    }

    fn tile_bounds(&self, column: i32, row: i32, zoom_index: u32) -> ViewBounds {
        let scale = self.scale(zoom_index).unwrap_or(0.0);
        let x = self.origin.x + column as f64 * scale;
        let y = self.origin.y + row as f64 * scale;
        ViewBounds::new(x, y, x + scale, y + scale)
    }

    fn tile_range(&self, bounds: &ViewBounds, zoom_index: u32) -> Option<TileRange> {
        if bounds.is_degenerate() {
            return None;
        }
        let scale = self.scale(zoom_index)?;

        let col_min = ((bounds.min_x - self.origin.x) / scale).floor() as i32;
        let row_min = ((bounds.min_y - self.origin.y) / scale).floor() as i32;
        // A max edge lying exactly on a cell boundary does not pull in the next cell.
        let col_max = (((bounds.max_x - self.origin.x) / scale).ceil() as i32 - 1).max(col_min);
        let row_max = (((bounds.max_y - self.origin.y) / scale).ceil() as i32 - 1).max(row_min);

        Some(TileRange {
            zoom_index,
            col_min,
            col_max,
            row_min,
            row_max,
        })
    }
}
