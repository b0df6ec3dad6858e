//! Core trait for the persistent key-value cache.
//!
//! The `Cache` trait is the only surface the tile pipeline needs from the
//! persistent cache: string keys, byte values, and a two-part variant for
//! records made of a fixed-size header and a variable payload.
//!
//! # Design Principles
//!
//! - **String keys**: Human-readable for debugging, stable across runs
//! - **Vec<u8> values**: Raw bytes, no serialization opinions imposed
//! - **Synchronous**: Lookups happen on the rendering thread, which never
//!   awaits; providers are expected to be fast or to block only briefly
//! - **Thread-safe**: The rendering thread and every worker share one cache
//!   instance under different keys without extra locking
//!
//! # Example
//!
//! ```
//! use sonarlayer::cache::{Cache, MemoryCacheProvider};
//!
//! let cache = MemoryCacheProvider::new(1024 * 1024);
//! cache.set2("key", &[1, 2], &[3, 4, 5]).unwrap();
//!
//! let (header, payload) = cache.get2("key", 2).unwrap().unwrap();
//! assert_eq!(header, vec![1, 2]);
//! assert_eq!(payload, vec![3, 4, 5]);
//! ```

use thiserror::Error;

/// Errors that can occur during cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// I/O error during cache operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Key exceeds maximum allowed size.
    #[error("Key too large: {size} bytes (max: {max})")]
    KeyTooLarge { size: usize, max: usize },

    /// Key contains characters the provider cannot store.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Value exceeds maximum allowed size.
    #[error("Value too large: {size} bytes (max: {max})")]
    ValueTooLarge { size: usize, max: usize },

    /// Provider-specific error.
    #[error("Provider error: {0}")]
    Provider(String),
}

/// Persistent key-value cache shared by every layer and worker.
///
/// Writes are last-write-wins: a `set` fully replaces whatever was stored
/// under the key. Providers handle their own eviction.
pub trait Cache: Send + Sync {
    /// Retrieve a value by key.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(data))` if the key exists
    /// - `Ok(None)` if the key is not found
    /// - `Err(_)` if an error occurs
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Retrieve a value stored as a fixed-size header followed by a payload.
    ///
    /// A stored value shorter than `header_size` is reported as absent.
    fn get2(
        &self,
        key: &str,
        header_size: usize,
    ) -> Result<Option<(Vec<u8>, Vec<u8>)>, CacheError> {
        Ok(self.get(key)?.and_then(|mut value| {
            if value.len() < header_size {
                return None;
            }
            let payload = value.split_off(header_size);
            Some((value, payload))
        }))
    }

    /// Store a value with the given key, replacing any previous value.
    fn set(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError>;

    /// Store a header and a payload under one key.
    fn set2(&self, key: &str, header: &[u8], payload: &[u8]) -> Result<(), CacheError> {
        let mut value = Vec::with_capacity(header.len() + payload.len());
        value.extend_from_slice(header);
        value.extend_from_slice(payload);
        self.set(key, value)
    }

    /// Get the current number of entries in the cache.
    fn entry_count(&self) -> u64;

    /// Get the current size of the cache in bytes.
    fn size_bytes(&self) -> u64;
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Minimal cache exercising the default two-part methods.
    #[derive(Default)]
    struct MapCache {
        entries: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl Cache for MapCache {
        fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
            Ok(self.entries.lock().get(key).cloned())
        }

        fn set(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
            self.entries.lock().insert(key.to_string(), value);
            Ok(())
        }

        fn entry_count(&self) -> u64 {
            self.entries.lock().len() as u64
        }

        fn size_bytes(&self) -> u64 {
            self.entries.lock().values().map(|v| v.len() as u64).sum()
        }
    }

    #[test]
    fn test_set2_get2_split() {
        let cache = MapCache::default();
        cache.set2("k", &[9, 9, 9], &[1, 2]).unwrap();

        let (header, payload) = cache.get2("k", 3).unwrap().unwrap();
        assert_eq!(header, vec![9, 9, 9]);
        assert_eq!(payload, vec![1, 2]);
    }

    #[test]
    fn test_get2_short_value_is_absent() {
        let cache = MapCache::default();
        cache.set("k", vec![1, 2]).unwrap();
        assert!(cache.get2("k", 16).unwrap().is_none());
    }

    #[test]
    fn test_get2_missing() {
        let cache = MapCache::default();
        assert!(cache.get2("missing", 4).unwrap().is_none());
    }

    #[test]
    fn test_set_replaces() {
        let cache = MapCache::default();
        cache.set("k", vec![1]).unwrap();
        cache.set("k", vec![2, 3]).unwrap();
        assert_eq!(cache.get("k").unwrap(), Some(vec![2, 3]));
        assert_eq!(cache.entry_count(), 1);
    }

    #[test]
    fn test_cache_error_display() {
        let err = CacheError::KeyTooLarge { size: 100, max: 50 };
        assert!(format!("{}", err).contains("100"));
        assert!(format!("{}", err).contains("50"));
    }

    #[test]
    fn test_cache_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cache_err: CacheError = io_err.into();
        assert!(matches!(cache_err, CacheError::Io(_)));
    }
}
