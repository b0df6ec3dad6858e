//! Per-layer façade over the tile pipeline.
//!
//! - [`TileOrchestrator`]: enumerates visible tiles, composites cached ones
//!   and schedules fills
//! - [`GenerationCounter`]: the layer's data generation, shared with workers
//! - [`Layer`] / [`TileLayer`]: the calls a map view makes on a layer

mod composite;
mod counter;
mod error;
mod orchestrator;
mod tile_layer;

pub use composite::{CompositeSink, NullSink};
pub use counter::GenerationCounter;
pub use error::LayerError;
pub use orchestrator::{RenderSummary, TileOrchestrator};
pub use tile_layer::{Layer, TileLayer};
