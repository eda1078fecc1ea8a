//! Cache-first authentication backed by a [`UserStore`].
//!
//! [`StoreAuth<S>`] composes a [`UserCache`] with a store:
//! - Cache hit: answered from memory, no store access
//! - Cache miss: single-row store query, admitted users are cached
//! - Background reconciliation (see [`run`](StoreAuth::run)) keeps the
//!   cache and the store's traffic counters converging

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::AuthError;
use crate::memory::{CacheStats, User, UserCache};
use crate::traits::Authenticator;

use super::record::UserRecord;
use super::traits::UserStore;

/// Authenticator that keeps a [`UserCache`] consistent with a [`UserStore`].
///
/// The cache is an eventually-consistent projection of the store: it is
/// re-derived once per `check_rate` and extended ad hoc by lookups.
///
/// # Type parameter
///
/// - `S`: the underlying data store (e.g. `SqlStore`)
pub struct StoreAuth<S: UserStore> {
    pub(super) cache: UserCache,
    pub(super) store: S,
    pub(super) check_rate: Duration,
}

impl<S: UserStore> StoreAuth<S> {
    /// Create a new `StoreAuth` with an empty cache.
    ///
    /// The reconciliation loop is not started; see [`spawn`](Self::spawn).
    pub fn new(store: S, check_rate: Duration) -> Self {
        Self {
            cache: UserCache::new(),
            store,
            check_rate,
        }
    }

    /// Get a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get a reference to the user cache.
    pub fn cache(&self) -> &UserCache {
        &self.cache
    }

    /// Interval between reconciliation cycles.
    pub fn check_rate(&self) -> Duration {
        self.check_rate
    }

    /// Get cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Cache an admitted record and propagate its speed limits.
    pub(super) fn admit(&self, record: &UserRecord) -> Arc<User> {
        let user = self.cache.add_user(&record.hash);
        user.set_speed_limit(record.speed_sent, record.speed_recv);
        user
    }

    /// Cache-miss path: consult the store for a single hash.
    async fn fallback(&self, hash: &str) -> Result<Arc<User>, AuthError> {
        let record = self
            .store
            .find_by_hash(hash)
            .await?
            .ok_or(AuthError::Invalid)?;

        if !record.is_admitted() {
            debug!(
                quota = record.quota,
                download = record.download,
                upload = record.upload,
                "quota exceeded on fallback lookup"
            );
            return Err(AuthError::QuotaExceeded);
        }

        debug!("user admitted from store");
        Ok(self.admit(&record))
    }
}

#[async_trait]
impl<S: UserStore> Authenticator for StoreAuth<S> {
    async fn verify(&self, hash: &str) -> Result<Arc<User>, AuthError> {
        if let Some(user) = self.cache.lookup(hash) {
            return Ok(user);
        }
        self.fallback(hash).await
    }
}

impl<S: UserStore + std::fmt::Debug> std::fmt::Debug for StoreAuth<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreAuth")
            .field("store", &self.store)
            .field("check_rate", &self.check_rate)
            .field("cached_users", &self.cache.len())
            .finish_non_exhaustive()
    }
}
