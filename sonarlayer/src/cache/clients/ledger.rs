//! Modification ledger.
//!
//! Tracks, per spatial cell, the most recent generation known to have
//! touched it. Records live in the shared persistent cache under
//! `{ns}.mc.{param}.{col}.{row}.{zoom}` keys; every write fully replaces the
//! previous record, so concurrent writers resolve by last-write-wins without
//! any read-modify-write.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::cache::keys::KeySpace;
use crate::cache::record::ModRecord;
use crate::cache::staleness::{Staleness, StalenessPolicy};
use crate::cache::traits::Cache;
use crate::tile::{Point, TileGrid, TileIdentity};

/// Per-cell record of the latest upstream modification.
pub struct ModificationLedger {
    cache: Arc<dyn Cache>,
    keys: KeySpace,
    policy: StalenessPolicy,
}

impl ModificationLedger {
    pub fn new(cache: Arc<dyn Cache>, keys: KeySpace, policy: StalenessPolicy) -> Self {
        Self {
            cache,
            keys,
            policy,
        }
    }

    pub fn policy(&self) -> StalenessPolicy {
        self.policy
    }

    /// Stamp every cell the segment crosses, at every zoom level, with
    /// `new_generation`.
    ///
    /// Returns the number of records written. Write failures are logged and
    /// skipped; a missed record only delays staleness detection for that cell.
    pub fn record_region_touched(
        &self,
        grid: &dyn TileGrid,
        start: Point,
        end: Point,
        param_generation: u32,
        new_generation: u64,
    ) -> usize {
        let record = ModRecord::new(new_generation).encode();
        let mut written = 0;

        for zoom_index in 0..grid.zoom_levels() as u32 {
            for (column, row) in grid.cells_on_segment(start, end, zoom_index) {
                let cell = TileIdentity::new(column, row, zoom_index, param_generation);
                let key = self.keys.mod_key(&cell);
                match self.cache.set(&key, record.clone()) {
                    Ok(()) => written += 1,
                    Err(e) => warn!(error = %e, key = %key, "Modification record write failed"),
                }
            }
        }

        debug!(
            generation = new_generation,
            param_generation,
            records = written,
            "Recorded region change"
        );
        written
    }

    /// Classify a tile whose header carries `cached_generation`.
    ///
    /// The header holds the low 32 bits of the generation, so the comparison
    /// runs modulo 2^32. An absent or unreadable record is initialised to
    /// `cached_generation`, so the first query for a cell never reports
    /// staleness.
    pub fn query_staleness(&self, tile: &TileIdentity, cached_generation: u32) -> Staleness {
        match self.read_record(tile) {
            Some(record) => self.policy.classify_stamp(cached_generation, record.generation),
            None => {
                let key = self.keys.mod_key(tile);
                trace!(tile = %tile, generation = cached_generation, "Initialising modification record");
                if let Err(e) = self
                    .cache
                    .set(&key, ModRecord::new(u64::from(cached_generation)).encode())
                {
                    warn!(error = %e, key = %key, "Modification record init failed");
                }
                Staleness::Actual
            }
        }
    }

    /// Latest generation recorded for the cell of `tile`, if any.
    pub fn latest_generation(&self, tile: &TileIdentity) -> Option<u64> {
        self.read_record(tile).map(|record| record.generation)
    }

    fn read_record(&self, tile: &TileIdentity) -> Option<ModRecord> {
        let key = self.keys.mod_key(tile);
        match self.cache.get(&key) {
            Ok(Some(bytes)) => {
                let record = ModRecord::decode(&bytes);
                if record.is_none() {
                    debug!(key = %key, len = bytes.len(), "Discarding corrupt modification record");
                }
                record
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, key = %key, "Modification record read failed");
                None
            }
        }
    }
}
