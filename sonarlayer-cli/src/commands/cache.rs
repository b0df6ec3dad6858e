//! Disk cache management CLI commands.

use std::path::PathBuf;

use clap::Subcommand;
use sonarlayer::cache::{Cache, DiskCacheProvider};
use sonarlayer::config::{default_cache_directory, format_size, parse_size, ConfigFile};

use crate::error::CliError;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Show disk cache statistics
    Stats,

    /// Delete the oldest entries until the cache fits its budget
    Gc {
        /// Size budget (e.g. 512MB); defaults to `disk_size` from the config
        #[arg(long)]
        max_size: Option<String>,
    },
}

/// Run a cache subcommand.
pub fn run(
    action: CacheAction,
    config: &ConfigFile,
    cache_dir: Option<PathBuf>,
) -> Result<(), CliError> {
    let directory = cache_dir
        .or_else(|| config.cache.directory.clone())
        .unwrap_or_else(default_cache_directory);
    let cache = DiskCacheProvider::open(&directory)?;

    match action {
        CacheAction::Stats => {
            println!("Disk cache: {}", directory.display());
            println!("  Entries: {}", cache.entry_count());
            println!("  Size:    {}", format_size(cache.size_bytes()));
            Ok(())
        }
        CacheAction::Gc { max_size } => {
            let budget = match max_size {
                Some(text) => parse_size(&text)
                    .map_err(|e| CliError::Config(format!("Invalid --max-size: {}", e)))?,
                None => config.cache.disk_size.ok_or_else(|| {
                    CliError::Config(
                        "No size budget. Set disk_size in [cache] or use --max-size.".to_string(),
                    )
                })?,
            };

            let result = cache.gc(budget)?;
            println!(
                "Removed {} entries, freed {} (cache now {})",
                result.entries_removed,
                format_size(result.bytes_freed),
                format_size(cache.size_bytes())
            );
            Ok(())
        }
    }
}
