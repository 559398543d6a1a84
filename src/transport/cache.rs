//! TTL-bounded response cache
//!
//! Entries are fully buffered responses keyed by method, redirect mode and
//! URL. The cache only ever saves latency: a miss is always safe.

use axum::http::{HeaderMap, Method, StatusCode};
use bytes::Bytes;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use super::{RedirectMode, ResponseBody, TransportResponse};

/// Cache lookup key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub method: Method,
    pub redirect: RedirectMode,
    pub url: String,
}

/// A buffered response held in the cache
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub url: String,
    pub redirected: bool,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl From<CachedResponse> for TransportResponse {
    fn from(cached: CachedResponse) -> Self {
        Self {
            status: cached.status,
            url: cached.url,
            redirected: cached.redirected,
            headers: cached.headers,
            body: ResponseBody::Buffered(cached.body),
        }
    }
}

#[derive(Debug)]
struct Entry {
    response: CachedResponse,
    expires_at: Instant,
}

/// LRU cache of responses with per-entry expiry
#[derive(Debug)]
pub struct ResponseCache {
    entries: Mutex<LruCache<CacheKey, Entry>>,
}

impl ResponseCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Look up a live entry, evicting it if it has expired
    pub fn get(&self, key: &CacheKey) -> Option<CachedResponse> {
        let mut entries = self.entries.lock();
        let expired = match entries.get(key) {
            Some(entry) if Instant::now() < entry.expires_at => {
                return Some(entry.response.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        None
    }

    /// Store a response for `ttl`
    pub fn insert(&self, key: CacheKey, response: CachedResponse, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        self.entries.lock().put(
            key,
            Entry {
                response,
                expires_at,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
