//! Tile identity types.
//!
//! Provides the `TileIdentity` value type that names one rendered tile: its
//! grid position, the zoom level it was rendered at, and the layer parameter
//! generation that produced its styling.

use std::fmt;

/// Identity of a single rendered tile.
///
/// Two identities are equal only if every field matches. In particular the
/// `param_generation` is part of the identity, so tiles rendered under an
/// older layer configuration are distinct tiles and never satisfy a lookup
/// made under the current one.
///
/// # Example
///
/// ```
/// use sonarlayer::tile::TileIdentity;
///
/// let tile = TileIdentity::new(3, 5, 2, 1);
/// assert_eq!(tile.column, 3);
/// assert_eq!(tile.row, 5);
/// assert_eq!(tile.to_string(), "3/5@2#1");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileIdentity {
    /// Grid column (X index, may be negative).
    pub column: i32,
    /// Grid row (Y index, may be negative).
    pub row: i32,
    /// Index into the grid's fixed zoom-level table.
    pub zoom_index: u32,
    /// Layer parameter generation the tile is styled for.
    pub param_generation: u32,
}

impl TileIdentity {
    /// Create a new tile identity.
    pub fn new(column: i32, row: i32, zoom_index: u32, param_generation: u32) -> Self {
        Self {
            column,
            row,
            zoom_index,
            param_generation,
        }
    }

    /// The same spatial cell under a different parameter generation.
    pub fn with_param_generation(self, param_generation: u32) -> Self {
        Self {
            param_generation,
            ..self
        }
    }

    /// The spatial cell of this tile, without the parameter generation.
    pub fn cell(&self) -> (i32, i32, u32) {
        (self.column, self.row, self.zoom_index)
    }
}

impl fmt::Display for TileIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}@{}#{}",
            self.column, self.row, self.zoom_index, self.param_generation
        )
    }
}
