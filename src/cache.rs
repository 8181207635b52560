use std::num::NonZeroUsize;
use std::time::Duration;

use chrono::Utc;
use lru::LruCache;
use tokio::sync::Mutex;

use crate::post::Post;

pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_CAPACITY: usize = 1024;

pub struct CachedPosts {
    pub posts: Vec<Post>,
    pub cached_at: i64, // unix ms
}

/// Arranged posts per (credential, locator) pair.
///
/// Expired entries are dropped when looked up; once `capacity` keys are held
/// the least recently used one makes room for the next insert.
pub struct ContentCache {
    entries: Mutex<LruCache<String, CachedPosts>>,
    ttl_ms: i64,
}

impl ContentCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl_ms: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
        }
    }

    pub fn key(credential: &str, locator: &str) -> String {
        format!("{credential}-{locator}")
    }

    pub async fn get(&self, key: &str) -> Option<Vec<Post>> {
        self.get_at(key, Utc::now().timestamp_millis()).await
    }

    pub async fn get_at(&self, key: &str, now_ms: i64) -> Option<Vec<Post>> {
        let mut entries = self.entries.lock().await;

        if let Some(cached) = entries.get(key) {
            if now_ms - cached.cached_at < self.ttl_ms {
                return Some(cached.posts.clone());
            }
        }

        entries.pop(key);
        None
    }

    pub async fn insert(&self, key: String, posts: Vec<Post>) {
        self.insert_at(key, posts, Utc::now().timestamp_millis()).await
    }

    pub async fn insert_at(&self, key: String, posts: Vec<Post>, now_ms: i64) {
        self.entries.lock().await.put(
            key,
            CachedPosts {
                posts,
                cached_at: now_ms,
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for ContentCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_CAPACITY)
    }
}
