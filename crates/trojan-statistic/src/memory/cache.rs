//! Concurrent map of admitted users.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::AuthError;
use crate::traits::Authenticator;

use super::user::User;

/// In-memory set of admitted users, keyed by credential hash.
///
/// Locks are only held for the duration of a single map operation, never
/// across an `.await`.
#[derive(Debug, Default)]
pub struct UserCache {
    users: RwLock<HashMap<String, Arc<User>>>,
    /// Cache hit counter.
    hits: AtomicU64,
    /// Cache miss counter.
    misses: AtomicU64,
}

impl UserCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache pre-populated with the given hashes.
    pub fn from_hashes<I, S>(hashes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let users = hashes
            .into_iter()
            .map(|h| {
                let h = h.into();
                (h.clone(), Arc::new(User::new(h)))
            })
            .collect();
        Self {
            users: RwLock::new(users),
            ..Default::default()
        }
    }

    /// Look up a user by hash.
    pub fn lookup(&self, hash: &str) -> Option<Arc<User>> {
        let user = self.users.read().get(hash).cloned();
        match user {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        user
    }

    /// Admit a user, returning its live handle.
    ///
    /// If the hash is already cached the existing entry is returned
    /// untouched, so counters accrued on it are kept.
    pub fn add_user(&self, hash: &str) -> Arc<User> {
        if let Some(user) = self.users.read().get(hash) {
            return user.clone();
        }
        self.users
            .write()
            .entry(hash.to_string())
            .or_insert_with(|| Arc::new(User::new(hash)))
            .clone()
    }

    /// Evict a user. Returns whether it was present.
    pub fn remove_user(&self, hash: &str) -> bool {
        self.users.write().remove(hash).is_some()
    }

    /// Snapshot of all cached users.
    pub fn list_users(&self) -> Vec<Arc<User>> {
        self.users.read().values().cloned().collect()
    }

    /// Check if a hash is cached, without touching hit/miss counters.
    #[inline]
    pub fn contains(&self, hash: &str) -> bool {
        self.users.read().contains_key(hash)
    }

    /// Number of cached users.
    #[inline]
    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    /// Check if no users are cached.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl Authenticator for UserCache {
    async fn verify(&self, hash: &str) -> Result<Arc<User>, AuthError> {
        self.lookup(hash).ok_or(AuthError::Invalid)
    }
}

/// Cache statistics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of entries in the cache.
    pub size: usize,
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
}

impl CacheStats {
    /// Calculate hit rate (0.0 to 1.0).
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_lookup_remove() {
        let cache = UserCache::new();
        assert!(cache.is_empty());

        cache.add_user("hash1");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.lookup("hash1").unwrap().hash(), "hash1");
        assert!(cache.lookup("hash2").is_none());

        assert!(cache.remove_user("hash1"));
        assert!(!cache.remove_user("hash1"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_add_user_keeps_existing_entry() {
        let cache = UserCache::new();
        let first = cache.add_user("hash1");
        first.add_traffic(10, 20);

        let second = cache.add_user("hash1");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.traffic(), (10, 20));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_list_users_is_a_snapshot() {
        let cache = UserCache::from_hashes(["a", "b", "c"]);
        let listed = cache.list_users();
        assert_eq!(listed.len(), 3);

        cache.remove_user("a");
        assert_eq!(listed.len(), 3);
        assert_eq!(cache.len(), 2);

        let mut hashes: Vec<_> = cache.list_users().iter().map(|u| u.hash().to_string()).collect();
        hashes.sort();
        assert_eq!(hashes, ["b", "c"]);
    }

    #[test]
    fn test_stats() {
        let cache = UserCache::from_hashes(["hash1"]);
        cache.lookup("hash1");
        cache.lookup("hash1");
        cache.lookup("hash2");
        assert!(cache.contains("hash1"));

        let stats = cache.stats();
        assert_eq!(stats.size, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 0.666).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_verify_is_cache_only() {
        let cache = UserCache::from_hashes(["hash1"]);
        assert!(cache.verify("hash1").await.is_ok());
        assert!(matches!(cache.verify("nope").await, Err(AuthError::Invalid)));
        assert!(cache.authorize("nope").await.is_none());
    }
}
