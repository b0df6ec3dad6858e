//! Domain-specific cache clients.
//!
//! These clients wrap the generic `Cache` trait with key translation, record
//! framing and staleness classification.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐     ┌──────────────────────┐
//! │  TileCache          │────▶│  ModificationLedger  │
//! │                     │     │                      │
//! │ identity → key      │     │ cell → ModRecord     │
//! │ TileHeader framing  │     │ staleness policy     │
//! └──────────┬──────────┘     └──────────┬───────────┘
//!            │                           │
//!            ▼                           ▼
//! ┌─────────────────────────────────────────────────┐
//! │              Arc<dyn Cache>                     │
//! │                                                 │
//! │  Generic key-value store (string → Vec<u8>)    │
//! └─────────────────────────────────────────────────┘
//! ```

mod ledger;
mod tile;

pub use ledger::ModificationLedger;
pub use tile::{TileCache, TileCacheStats, TileLookup};
