use crate::youtube::constants::{EXPIRE_PARAM, URL_EXPIRY_BUFFER};
use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;

/// LRU cache for resolved stream URLs. Googlevideo URLs carry their expiry
/// in the `expire=` query parameter; entries at or past that point (minus a
/// safety buffer) are treated as misses and evicted.
pub struct ExpiringUrlCache<K, V> {
    cache: LruCache<K, V>,
}

impl<K: Hash + Eq, V: AsRef<str>> ExpiringUrlCache<K, V> {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self { cache: LruCache::new(capacity) }
    }

    pub fn get(&mut self, key: &K) -> Option<&V> {
        let expired = if let Some(value) = self.cache.peek(key) {
            is_stream_url_expired(value.as_ref())
        } else {
            false
        };

        if expired {
            self.cache.pop(key);
            return None;
        }

        self.cache.get(key)
    }

    pub fn put(&mut self, key: K, value: V) {
        self.cache.put(key, value);
    }

    pub fn pop(&mut self, key: &K) -> Option<V> {
        self.cache.pop(key)
    }
}

pub fn stream_url_expiry(url: &str) -> Option<u64> {
    let start = url.find(EXPIRE_PARAM)? + EXPIRE_PARAM.len();
    let end = url[start..].find('&').map_or(url.len(), |pos| start + pos);
    url[start..end].parse().ok()
}

pub fn is_stream_url_expired(url: &str) -> bool {
    if let Some(expiry) = stream_url_expiry(url) {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        // Expired, or expires within the buffer
        expiry < now + URL_EXPIRY_BUFFER
    } else {
        false
    }
}
