//! SonarLayer - Tile cache and asynchronous generation pipeline for
//! hydroacoustic survey layers
//!
//! A survey map draws depth, backscatter and track layers as square tiles.
//! This library keeps those tiles in a persistent cache, decides which
//! cached tiles are still good enough to show, and regenerates the rest on a
//! shared worker pool without ever blocking the rendering thread.
//!
//! ```text
//! draw ──► TileOrchestrator ──► TileCache ──► ModificationLedger
//!               │ miss/stale
//!               ▼
//!          GenerationQueue ──► WorkerPool ──► TileFiller
//!               │ stored
//!               ▼
//!          RedrawSignal ──► RedrawCoordinator ──► draw
//! ```

pub mod cache;
pub mod config;
pub mod executor;
pub mod layer;
pub mod logging;
pub mod redraw;
pub mod tile;
