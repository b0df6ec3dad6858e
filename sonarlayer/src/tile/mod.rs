//! Tile identity, grid and filler abstractions.
//!
//! - [`TileIdentity`]: names a rendered tile (cell + zoom + parameter generation)
//! - [`TileGrid`]: maps world coordinates onto cells of the fixed zoom table
//! - [`TileFiller`]: produces a tile's pixels off the rendering thread

mod filler;
mod grid;
mod identity;

pub use filler::{FillError, TileFiller};
pub use grid::{segment_intersects, Point, TileGrid, TileRange, UniformGrid, ViewBounds};
pub use identity::TileIdentity;
