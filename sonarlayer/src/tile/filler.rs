//! TileFiller trait for abstracting pixel generation strategies.
//!
//! The generation queue knows nothing about sonar tracks, waterfall imagery
//! or vessel paths. It hands a [`TileIdentity`] to a [`TileFiller`] and stores
//! whatever pixels come back.
//!
//! # Example
//!
//! ```
//! use sonarlayer::tile::{FillError, TileFiller, TileIdentity};
//! use tokio_util::sync::CancellationToken;
//!
//! struct Solid;
//!
//! impl TileFiller for Solid {
//!     fn fill(&self, _tile: &TileIdentity, _cancel: &CancellationToken) -> Result<Vec<u8>, FillError> {
//!         Ok(vec![0xFF; 4 * 16 * 16])
//!     }
//! }
//!
//! let pixels = Solid.fill(&TileIdentity::new(0, 0, 0, 0), &CancellationToken::new()).unwrap();
//! assert_eq!(pixels.len(), 1024);
//! ```

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::tile::TileIdentity;

/// Errors a filler may report.
///
/// None of these reach the caller of the layer; a failed fill simply leaves
/// the tile uncached so the next enumeration pass retries it.
#[derive(Debug, Error)]
pub enum FillError {
    /// The fill observed the cancellation token and gave up.
    #[error("Fill cancelled")]
    Cancelled,

    /// There is no upstream data for this tile.
    #[error("No data for tile")]
    NoData,

    /// The fill failed for another reason.
    #[error("Fill failed: {0}")]
    Failed(String),
}

/// Strategy that renders the pixels of one tile.
///
/// Implementations are invoked on worker threads, never on the rendering
/// thread. They must not touch rendering-thread state and should poll
/// `cancel` during long decodes so that layer shutdown stays prompt.
///
/// # Implementors
///
/// - Track rasterisers (sonar swath, vessel path) living in the host application
/// - Test fillers counting invocations
pub trait TileFiller: Send + Sync {
    /// Produce the pixel payload for `tile`.
    ///
    /// # Returns
    ///
    /// Row-major pixel bytes. An empty vector is treated as "nothing to draw"
    /// and is never cached.
    fn fill(&self, tile: &TileIdentity, cancel: &CancellationToken) -> Result<Vec<u8>, FillError>;
}

impl<F> TileFiller for F
where
    F: Fn(&TileIdentity, &CancellationToken) -> Result<Vec<u8>, FillError> + Send + Sync,
{
    fn fill(&self, tile: &TileIdentity, cancel: &CancellationToken) -> Result<Vec<u8>, FillError> {
        self(tile, cancel)
    }
}
