//! Destination of composited tiles.

use crate::tile::TileIdentity;

/// Drawing surface receiving displayable tiles.
///
/// `offset` is the world position of the tile's minimum corner; the sink
/// maps it to its own pixel space. `pixels` is only borrowed for the call.
pub trait CompositeSink {
    fn draw_tile(&mut self, tile: &TileIdentity, offset: (f64, f64), pixels: &[u8]);
}

impl<F> CompositeSink for F
where
    F: FnMut(&TileIdentity, (f64, f64), &[u8]),
{
    fn draw_tile(&mut self, tile: &TileIdentity, offset: (f64, f64), pixels: &[u8]) {
        self(tile, offset, pixels)
    }
}

/// Sink that drops everything, for passes that only schedule fills.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl CompositeSink for NullSink {
    fn draw_tile(&mut self, _tile: &TileIdentity, _offset: (f64, f64), _pixels: &[u8]) {}
}
