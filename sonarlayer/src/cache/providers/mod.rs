//! Cache provider implementations.
//!
//! Each provider implements the `Cache` trait. The tile pipeline treats the
//! persistent cache as an external collaborator; these providers are the
//! reference backends used by the CLI and the tests.
//!
//! # Available Providers
//!
//! - [`MemoryCacheProvider`]: In-memory LRU cache using moka
//! - [`DiskCacheProvider`]: One file per key with explicit GC

mod disk;
mod memory;

pub use disk::{DiskCacheProvider, GcResult, MAX_DISK_KEY_LEN};
pub use memory::{MemoryCacheProvider, MAX_KEY_LEN};

use std::sync::Arc;

use tracing::info;

use super::traits::{Cache, CacheError};
use crate::config::CacheConfig;

/// Open the provider described by `config`.
///
/// A configured directory selects the disk provider; otherwise entries live
/// in memory for the lifetime of the process.
pub fn open_cache(config: &CacheConfig) -> Result<Arc<dyn Cache>, CacheError> {
    match &config.directory {
        Some(directory) => {
            let provider = DiskCacheProvider::open(directory)?;
            info!(directory = %directory.display(), "Using disk cache");
            Ok(Arc::new(provider))
        }
        None => {
            info!(memory_size = config.memory_size, "Using memory cache");
            Ok(Arc::new(MemoryCacheProvider::new(config.memory_size)))
        }
    }
}
