//! Persistent cache surface and the tile records stored in it.
//!
//! - [`Cache`]: the key-value store shared by every layer and worker
//! - [`providers`]: memory (moka) and disk backends
//! - [`TileCache`] and [`ModificationLedger`]: typed clients over a `Cache`
//! - [`StalenessPolicy`]: generation-based freshness rules

mod clients;
mod keys;
pub mod providers;
mod record;
mod staleness;
mod traits;

pub use clients::{ModificationLedger, TileCache, TileCacheStats, TileLookup};
pub use keys::KeySpace;
pub use providers::{
    open_cache, DiskCacheProvider, GcResult, MemoryCacheProvider, MAX_DISK_KEY_LEN,
};
pub use record::{ModRecord, TileHeader, MOD_MAGIC, MOD_RECORD_SIZE, TILE_HEADER_SIZE, TILE_MAGIC};
pub use staleness::{Staleness, StalenessPolicy, DEFAULT_STALENESS_TOLERANCE};
pub use traits::{Cache, CacheError};
