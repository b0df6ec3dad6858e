//! Cache key derivation.
//!
//! Keys are printable strings so they stay readable in logs and on disk.
//!
//! # Key Format
//!
//! - Tiles: `{namespace}.{param_generation}.{column}.{row}.{zoom_index}`
//!   (e.g., `track-a.1.3.5.2`)
//! - Modification records: `{namespace}.mc.{param_generation}.{column}.{row}.{zoom_index}`
//!   (e.g., `track-a.mc.1.3.5.2`)
//!
//! The namespace is scoped to one layer instance, so two layers sharing a
//! cache never collide. The parameter generation is part of every key:
//! bumping it moves the layer to a fresh key space and leaves older records
//! unreachable.

use crate::tile::TileIdentity;

/// Layer-scoped key derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    namespace: String,
}

impl KeySpace {
    /// Create a key space for the given layer namespace.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Key of the tile record for `tile`.
    pub fn tile_key(&self, tile: &TileIdentity) -> String {
        format!(
            "{}.{}.{}.{}.{}",
            self.namespace, tile.param_generation, tile.column, tile.row, tile.zoom_index
        )
    }

    /// Key of the modification record for the cell of `tile`.
    pub fn mod_key(&self, tile: &TileIdentity) -> String {
        format!(
            "{}.mc.{}.{}.{}.{}",
            self.namespace, tile.param_generation, tile.column, tile.row, tile.zoom_index
        )
    }
}
