//! Settings structs for every configuration section.
//!
//! Each struct represents one concern. [`ConfigFile`] groups them the way
//! they appear as `[section]`s of the INI file.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::cache::DEFAULT_STALENESS_TOLERANCE;
use crate::executor::WorkerPoolConfig;
use crate::redraw::DEFAULT_REDRAW_INTERVAL;

/// Default tile edge length in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Default bytes per pixel (RGBA8).
pub const DEFAULT_BYTES_PER_PIXEL: u32 = 4;

/// Default memory cache budget.
pub const DEFAULT_MEMORY_CACHE_SIZE: u64 = 256 * 1024 * 1024;

/// Default number of zoom levels in the simulation grid.
pub const DEFAULT_ZOOM_LEVELS: usize = 4;

/// Default world extent of one tile at zoom index 0.
pub const DEFAULT_BASE_EXTENT: f64 = 256.0;

/// Longest accepted layer namespace. Keeps the longest derived cache key well
/// inside the disk provider's file name limit.
pub const MAX_NAMESPACE_LEN: usize = 64;

/// Per-layer configuration.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use sonarlayer::config::LayerConfig;
///
/// let config = LayerConfig::new("waterfall")
///     .with_staleness_tolerance(3)
///     .with_redraw_interval(Duration::from_millis(100));
///
/// assert_eq!(config.tile_bytes(), 256 * 256 * 4);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerConfig {
    /// Cache key prefix; unique per layer instance.
    pub namespace: String,
    /// Tile edge length in pixels.
    pub tile_size: u32,
    /// Bytes per pixel of the tile payload.
    pub bytes_per_pixel: u32,
    /// Generations a cached tile may lag and still be shown.
    pub staleness_tolerance: u64,
    /// Interval between redraw checks.
    #[serde(serialize_with = "serialize_millis")]
    pub redraw_interval: Duration,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            namespace: "layer".to_string(),
            tile_size: DEFAULT_TILE_SIZE,
            bytes_per_pixel: DEFAULT_BYTES_PER_PIXEL,
            staleness_tolerance: DEFAULT_STALENESS_TOLERANCE,
            redraw_interval: DEFAULT_REDRAW_INTERVAL,
        }
    }
}

impl LayerConfig {
    /// Defaults under the given namespace.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    pub fn with_bytes_per_pixel(mut self, bytes_per_pixel: u32) -> Self {
        self.bytes_per_pixel = bytes_per_pixel;
        self
    }

    pub fn with_staleness_tolerance(mut self, tolerance: u64) -> Self {
        self.staleness_tolerance = tolerance;
        self
    }

    pub fn with_redraw_interval(mut self, interval: Duration) -> Self {
        self.redraw_interval = interval;
        self
    }

    /// Payload size of one fully rendered tile.
    pub fn tile_bytes(&self) -> usize {
        self.tile_size as usize * self.tile_size as usize * self.bytes_per_pixel as usize
    }

    /// Check the values a layer cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        if !is_valid_namespace(&self.namespace) {
            return Err(format!(
                "namespace '{}' must be 1 to {} letters, digits, '-' or '_'",
                self.namespace, MAX_NAMESPACE_LEN
            ));
        }
        if self.tile_size == 0 {
            return Err("tile_size must be greater than zero".to_string());
        }
        if self.bytes_per_pixel == 0 {
            return Err("bytes_per_pixel must be greater than zero".to_string());
        }
        if self.redraw_interval.is_zero() {
            return Err("redraw interval must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Namespaces become the first component of dot-separated cache keys.
pub fn is_valid_namespace(namespace: &str) -> bool {
    !namespace.is_empty()
        && namespace.len() <= MAX_NAMESPACE_LEN
        && namespace
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Persistent cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheConfig {
    /// Memory cache budget in bytes.
    pub memory_size: u64,
    /// Directory of the disk cache; memory only when `None`.
    pub directory: Option<PathBuf>,
    /// Disk budget enforced by garbage collection; unbounded when `None`.
    pub disk_size: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_size: DEFAULT_MEMORY_CACHE_SIZE,
            directory: None,
            disk_size: None,
        }
    }
}

/// Uniform grid used by the CLI simulation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridConfig {
    /// Number of zoom levels.
    pub zoom_levels: usize,
    /// World extent of a tile at zoom index 0; doubles per level.
    pub base_extent: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            zoom_levels: DEFAULT_ZOOM_LEVELS,
            base_extent: DEFAULT_BASE_EXTENT,
        }
    }
}

impl GridConfig {
    /// Tile extent per zoom index.
    pub fn zoom_scales(&self) -> Vec<f64> {
        (0..self.zoom_levels)
            .map(|z| self.base_extent * (1u64 << z.min(62)) as f64)
            .collect()
    }
}

/// Complete configuration loaded from an INI file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigFile {
    /// `[layer]` and `[redraw]`
    pub layer: LayerConfig,
    /// `[workers]`
    pub workers: WorkerPoolConfig,
    /// `[cache]`
    pub cache: CacheConfig,
    /// `[grid]`
    pub grid: GridConfig,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}
