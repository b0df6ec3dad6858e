//! Configuration for layers, the worker pool and the persistent cache.
//!
//! - [`LayerConfig`]: per-layer namespace, tile format and staleness window
//! - [`ConfigFile`]: everything above plus workers, cache and grid, loaded
//!   from an INI file
//!
//! # Example
//!
//! ```
//! use sonarlayer::config::ConfigFile;
//!
//! let config = ConfigFile::from_ini_str("[layer]\nnamespace = track\n").unwrap();
//! assert_eq!(config.layer.namespace, "track");
//! assert_eq!(config.layer.staleness_tolerance, 5);
//! ```

mod file;
mod parser;
mod settings;
mod size;
mod writer;

pub use file::{config_directory, config_file_path, default_cache_directory, ConfigFileError};
pub use settings::{
    is_valid_namespace, CacheConfig, ConfigFile, GridConfig, LayerConfig, DEFAULT_BASE_EXTENT,
    DEFAULT_BYTES_PER_PIXEL, DEFAULT_MEMORY_CACHE_SIZE, DEFAULT_TILE_SIZE, DEFAULT_ZOOM_LEVELS,
    MAX_NAMESPACE_LEN,
};
pub use size::{format_size, parse_size, SizeParseError};
