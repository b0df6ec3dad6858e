//! Tile cache client for rendered tile storage.
//!
//! This client wraps a generic `Cache` with:
//! - Key translation: `TileIdentity` → `"{ns}.{param}.{col}.{row}.{zoom}"`
//! - Record framing: a validating [`TileHeader`] in front of the pixels
//! - Staleness: every hit is classified against the [`ModificationLedger`]
//! - Statistics: lock-free counters for hits, misses and corruption
//!
//! Internal failures never reach the caller. A cache I/O error, a foreign
//! magic number or a size mismatch all behave like a plain miss, which
//! schedules a refill that overwrites the bad record.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::cache::clients::ledger::ModificationLedger;
use crate::cache::keys::KeySpace;
use crate::cache::record::{TileHeader, TILE_HEADER_SIZE};
use crate::cache::staleness::Staleness;
use crate::cache::traits::Cache;
use crate::tile::TileIdentity;

/// Result of a tile lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileLookup {
    /// The pixels may be composited.
    pub found: bool,
    /// A fill job should be scheduled.
    pub refill_needed: bool,
    /// Cached pixel payload, present whenever the record was valid and
    /// displayable.
    pub pixels: Option<Vec<u8>>,
    /// Ledger classification, present whenever a valid record was read.
    pub staleness: Option<Staleness>,
}

impl TileLookup {
    /// Nothing usable was cached.
    pub fn miss() -> Self {
        Self {
            found: false,
            refill_needed: true,
            pixels: None,
            staleness: None,
        }
    }

    /// Up to date, no refill.
    pub fn actual(pixels: Vec<u8>) -> Self {
        Self {
            found: true,
            refill_needed: false,
            pixels: Some(pixels),
            staleness: Some(Staleness::Actual),
        }
    }

    /// Displayable but lagging behind the ledger.
    pub fn outdated(pixels: Vec<u8>) -> Self {
        Self {
            found: true,
            refill_needed: true,
            pixels: Some(pixels),
            staleness: Some(Staleness::Outdated),
        }
    }

    /// Valid record that lags too far to be shown.
    pub fn irrelevant() -> Self {
        Self {
            staleness: Some(Staleness::Irrelevant),
            ..Self::miss()
        }
    }
}

/// Point-in-time snapshot of tile cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct TileCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub outdated: u64,
    pub irrelevant: u64,
    pub corrupt: u64,
    pub stores: u64,
}

impl TileCacheStats {
    /// Fraction of lookups that produced displayable pixels.
    pub fn hit_rate(&self) -> f64 {
        let displayable = self.hits + self.outdated;
        let total = displayable + self.misses + self.irrelevant + self.corrupt;
        if total == 0 {
            0.0
        } else {
            displayable as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    outdated: AtomicU64,
    irrelevant: AtomicU64,
    corrupt: AtomicU64,
    stores: AtomicU64,
}

/// Cache client for rendered tiles of one layer.
pub struct TileCache {
    cache: Arc<dyn Cache>,
    keys: KeySpace,
    ledger: Arc<ModificationLedger>,
    counters: Counters,
}

impl TileCache {
    /// Create a new tile cache client.
    ///
    /// # Arguments
    ///
    /// * `cache` - The underlying cache implementation
    /// * `keys` - Layer-scoped key derivation
    /// * `ledger` - Modification ledger used to classify hits
    pub fn new(cache: Arc<dyn Cache>, keys: KeySpace, ledger: Arc<ModificationLedger>) -> Self {
        Self {
            cache,
            keys,
            ledger,
            counters: Counters::default(),
        }
    }

    pub fn ledger(&self) -> &Arc<ModificationLedger> {
        &self.ledger
    }

    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }

    /// Look up a tile and classify it.
    pub fn lookup(&self, tile: &TileIdentity) -> TileLookup {
        let key = self.keys.tile_key(tile);

        let (header, payload) = match self.cache.get2(&key, TILE_HEADER_SIZE) {
            Ok(Some(parts)) => parts,
            Ok(None) => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                return TileLookup::miss();
            }
            Err(e) => {
                warn!(error = %e, key = %key, "Tile cache get failed");
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                return TileLookup::miss();
            }
        };

        let header = match TileHeader::decode(&header) {
            Some(h) if h.is_valid_for(&payload) => h,
            other => {
                debug!(
                    key = %key,
                    magic = other.map(|h| h.magic),
                    payload_len = payload.len(),
                    "Discarding corrupt tile record"
                );
                self.counters.corrupt.fetch_add(1, Ordering::Relaxed);
                return TileLookup::miss();
            }
        };

        let staleness = self.ledger.query_staleness(tile, header.generation);
        trace!(tile = %tile, generation = header.generation, %staleness, "Tile cache hit");

        match staleness {
            Staleness::Actual => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                TileLookup::actual(payload)
            }
            Staleness::Outdated => {
                self.counters.outdated.fetch_add(1, Ordering::Relaxed);
                TileLookup::outdated(payload)
            }
            Staleness::Irrelevant => {
                self.counters.irrelevant.fetch_add(1, Ordering::Relaxed);
                TileLookup::irrelevant()
            }
        }
    }

    /// Store freshly produced pixels stamped with `generation`.
    ///
    /// Returns `false` without touching the cache when `pixels` is empty, so
    /// an empty fill is never mistaken for a valid tile.
    pub fn store(&self, tile: &TileIdentity, pixels: &[u8], generation: u64) -> bool {
        if pixels.is_empty() {
            trace!(tile = %tile, "Skipping store of empty tile");
            return false;
        }

        // The header carries the low 32 bits; lookups compare modulo 2^32.
        let header = TileHeader::new(generation as u32, pixels.len());
        let key = self.keys.tile_key(tile);
        match self.cache.set2(&key, &header.encode(), pixels) {
            Ok(()) => {
                self.counters.stores.fetch_add(1, Ordering::Relaxed);
                trace!(tile = %tile, generation, bytes = pixels.len(), "Stored tile");
                true
            }
            Err(e) => {
                warn!(error = %e, key = %key, "Tile cache set failed");
                false
            }
        }
    }

    /// Snapshot of the lookup and store counters.
    pub fn stats(&self) -> TileCacheStats {
        TileCacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            outdated: self.counters.outdated.load(Ordering::Relaxed),
            irrelevant: self.counters.irrelevant.load(Ordering::Relaxed),
            corrupt: self.counters.corrupt.load(Ordering::Relaxed),
            stores: self.counters.stores.load(Ordering::Relaxed),
        }
    }

    /// Get the current cache size in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.cache.size_bytes()
    }

    /// Get the current number of entries in the cache.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}
