//! On-disk cache provider.
//!
//! Stores one file per key directly under a root directory. Writes go to a
//! hidden temporary file first and are renamed into place, so a reader never
//! observes a half-written record; at worst it sees the previous value.
//!
//! # Garbage Collection
//!
//! The provider does not evict on its own. Call [`DiskCacheProvider::gc`]
//! with a byte budget to delete the least recently written entries.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime};

use tracing::{debug, info, warn};

use crate::cache::traits::{Cache, CacheError};

/// Longest key the disk provider accepts. Keys are used verbatim as file
/// names and must stay below `NAME_MAX` (255 bytes on common filesystems).
pub const MAX_DISK_KEY_LEN: usize = 200;

/// Sequence for unique temporary file names.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Result of a garbage collection operation.
#[derive(Debug, Clone, Default)]
pub struct GcResult {
    /// Number of entries removed during GC.
    pub entries_removed: usize,
    /// Total bytes freed during GC.
    pub bytes_freed: u64,
    /// Duration of the GC operation in milliseconds.
    pub duration_ms: u64,
}

impl fmt::Display for GcResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GC: removed {} entries, freed {} bytes in {}ms",
            self.entries_removed, self.bytes_freed, self.duration_ms
        )
    }
}

/// Cache provider persisting each entry as a file.
pub struct DiskCacheProvider {
    root: PathBuf,
    entries: AtomicU64,
    bytes: AtomicU64,
}

impl DiskCacheProvider {
    /// Open (creating if needed) a disk cache rooted at `root`.
    ///
    /// Existing entries are counted so that `entry_count` and `size_bytes`
    /// reflect what is already on disk.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        let mut entries = 0u64;
        let mut bytes = 0u64;
        for entry in fs::read_dir(&root)? {
            let entry = entry?;
            if is_temp_name(&entry.file_name().to_string_lossy()) {
                continue;
            }
            let meta = entry.metadata()?;
            if meta.is_file() {
                entries += 1;
                bytes += meta.len();
            }
        }

        info!(
            root = %root.display(),
            entries,
            bytes,
            "Opened disk cache"
        );

        Ok(Self {
            root,
            entries: AtomicU64::new(entries),
            bytes: AtomicU64::new(bytes),
        })
    }

    /// Root directory of the cache.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Delete the oldest entries until the cache fits in `max_size_bytes`.
    pub fn gc(&self, max_size_bytes: u64) -> Result<GcResult, CacheError> {
        let start = Instant::now();
        let mut files = Vec::new();
        let mut total = 0u64;

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if is_temp_name(&entry.file_name().to_string_lossy()) {
                continue;
            }
            let meta = entry.metadata()?;
            if !meta.is_file() {
                continue;
            }
            let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            total += meta.len();
            files.push((modified, meta.len(), entry.path()));
        }

        files.sort_by_key(|(modified, _, _)| *modified);

        let mut remaining = files.len() as u64;
        let mut result = GcResult::default();
        for (_, len, path) in files {
            if total <= max_size_bytes {
                break;
            }
            match fs::remove_file(&path) {
                Ok(()) => {
                    result.entries_removed += 1;
                    result.bytes_freed += len;
                }
                // Another process or a concurrent gc got there first.
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            total -= len;
            remaining -= 1;
        }

        // The scan is authoritative; drop whatever drift other writers caused.
        self.entries.store(remaining, Ordering::Relaxed);
        self.bytes.store(total, Ordering::Relaxed);

        result.duration_ms = start.elapsed().as_millis() as u64;
        debug!(%result, "Disk cache GC complete");
        Ok(result)
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, CacheError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

impl Cache for DiskCacheProvider {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        let path = self.path_for(key)?;
        let previous = fs::metadata(&path).ok().map(|m| m.len());

        let temp = self.root.join(format!(
            ".tmp.{}.{}",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        let write = || -> io::Result<()> {
            let mut file = fs::File::create(&temp)?;
            file.write_all(&value)?;
            file.sync_data()?;
            fs::rename(&temp, &path)
        };

        if let Err(e) = write() {
            warn!(error = %e, key = %key, "Disk cache write failed");
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }

        match previous {
            Some(old_len) => saturating_sub(&self.bytes, old_len),
            None => {
                self.entries.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.bytes.fetch_add(value.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    fn entry_count(&self) -> u64 {
        self.entries.load(Ordering::Relaxed)
    }

    fn size_bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}

fn is_temp_name(name: &str) -> bool {
    name.starts_with('.')
}

/// Another process sharing the directory can replace or delete files behind
/// our counters, so subtraction clamps at zero instead of wrapping.
fn saturating_sub(counter: &AtomicU64, amount: u64) {
    let _ = counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
        Some(current.saturating_sub(amount))
    });
}

/// Keys become file names, so only a conservative character set is allowed.
fn validate_key(key: &str) -> Result<(), CacheError> {
    if key.len() > MAX_DISK_KEY_LEN {
        return Err(CacheError::KeyTooLarge {
            size: key.len(),
            max: MAX_DISK_KEY_LEN,
        });
    }
    let valid_chars = key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
    if key.is_empty() || is_temp_name(key) || !valid_chars {
        return Err(CacheError::InvalidKey(key.to_string()));
    }
    Ok(())
}
