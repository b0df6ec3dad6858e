//! In-memory cache provider backed by `moka::sync::Cache`.
//!
//! Entries are evicted least-recently-used first once the summed value sizes
//! exceed the budget. Lookups never await, so the rendering thread can call
//! them directly.

use moka::sync::Cache as MokaCache;

use crate::cache::traits::{Cache, CacheError};

/// Maximum accepted key length in bytes.
pub const MAX_KEY_LEN: usize = 512;

/// In-memory cache provider using moka.
///
/// Entries are weighted by their value size, so `max_size_bytes` bounds the
/// payload memory held by the cache.
pub struct MemoryCacheProvider {
    /// The underlying moka cache.
    cache: MokaCache<String, Vec<u8>>,

    /// Maximum size in bytes.
    max_size_bytes: u64,
}

impl MemoryCacheProvider {
    /// Create a new memory cache provider.
    ///
    /// # Arguments
    ///
    /// * `max_size_bytes` - Maximum cache size in bytes
    pub fn new(max_size_bytes: u64) -> Self {
        let cache = MokaCache::builder()
            // Weight each entry by its data size
            .weigher(|_key: &String, value: &Vec<u8>| -> u32 {
                // moka uses u32 for weights, cap at u32::MAX for very large entries
                value.len().min(u32::MAX as usize) as u32
            })
            .max_capacity(max_size_bytes)
            .build();

        Self {
            cache,
            max_size_bytes,
        }
    }

    /// Get the maximum configured size in bytes.
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    /// Run pending eviction and bookkeeping so that counters are current.
    pub fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks();
    }
}

impl Cache for MemoryCacheProvider {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.cache.get(key))
    }

    fn set(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        if key.len() > MAX_KEY_LEN {
            return Err(CacheError::KeyTooLarge {
                size: key.len(),
                max: MAX_KEY_LEN,
            });
        }
        if value.len() as u64 > self.max_size_bytes {
            return Err(CacheError::ValueTooLarge {
                size: value.len(),
                max: self.max_size_bytes as usize,
            });
        }
        self.cache.insert(key.to_string(), value);
        Ok(())
    }

    fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    fn size_bytes(&self) -> u64 {
        self.cache.weighted_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_memory_provider_new() {
        let provider = MemoryCacheProvider::new(1_000_000);
        assert_eq!(provider.max_size_bytes(), 1_000_000);
        assert_eq!(provider.entry_count(), 0);
        assert_eq!(provider.size_bytes(), 0);
    }

    #[test]
    fn test_memory_provider_set_and_get() {
        let provider = MemoryCacheProvider::new(1_000_000);

        provider.set("key1", vec![1, 2, 3]).unwrap();

        assert_eq!(provider.get("key1").unwrap(), Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_memory_provider_get_missing() {
        let provider = MemoryCacheProvider::new(1_000_000);
        assert!(provider.get("nonexistent").unwrap().is_none());
    }

    #[test]
    fn test_memory_provider_replace_existing() {
        let provider = MemoryCacheProvider::new(1_000_000);

        provider.set("key1", vec![1, 2, 3]).unwrap();
        provider.set("key1", vec![4, 5, 6, 7]).unwrap();
        provider.run_pending_tasks();

        assert_eq!(provider.get("key1").unwrap(), Some(vec![4, 5, 6, 7]));
        assert_eq!(provider.entry_count(), 1);
    }

    #[test]
    fn test_memory_provider_two_part_roundtrip() {
        let provider = MemoryCacheProvider::new(1_000_000);

        provider.set2("rec", &[0xAA; 16], &[1, 2, 3]).unwrap();

        let (header, payload) = provider.get2("rec", 16).unwrap().unwrap();
        assert_eq!(header, vec![0xAA; 16]);
        assert_eq!(payload, vec![1, 2, 3]);
    }

    #[test]
    fn test_memory_provider_rejects_long_key() {
        let provider = MemoryCacheProvider::new(1_000_000);
        let key = "k".repeat(MAX_KEY_LEN + 1);

        let result = provider.set(&key, vec![1]);
        assert!(matches!(result, Err(CacheError::KeyTooLarge { .. })));
    }

    #[test]
    fn test_memory_provider_rejects_oversized_value() {
        let provider = MemoryCacheProvider::new(100);

        let result = provider.set("big", vec![0u8; 101]);
        assert!(matches!(result, Err(CacheError::ValueTooLarge { .. })));
    }

    #[test]
    fn test_memory_provider_lru_eviction() {
        // Cache that can hold about 2.5 entries of 1000 bytes each
        let provider = MemoryCacheProvider::new(2500);

        provider.set("key1", vec![0u8; 1000]).unwrap();
        provider.set("key2", vec![0u8; 1000]).unwrap();
        provider.set("key3", vec![0u8; 1000]).unwrap();
        provider.run_pending_tasks();

        assert!(
            provider.size_bytes() <= 2500,
            "Expected size <= 2500, got {}",
            provider.size_bytes()
        );
    }

    #[test]
    fn test_memory_provider_concurrent_access() {
        let provider = Arc::new(MemoryCacheProvider::new(10_000_000));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let provider = Arc::clone(&provider);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let key = format!("t{}.k{}", t, i);
                        let data = vec![i as u8; 100];
                        provider.set(&key, data.clone()).unwrap();
                        assert_eq!(provider.get(&key).unwrap(), Some(data));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        provider.run_pending_tasks();
        assert_eq!(provider.entry_count(), 400);
    }
}
