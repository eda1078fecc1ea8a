//! Data-access trait for user stores.

use async_trait::async_trait;

use crate::AuthError;

use super::{UserRecord, UserScan};

/// Data-access layer for quota accounting.
///
/// Implementations provide only data retrieval and traffic persistence.
/// Admission and cache membership are decided by
/// [`StoreAuth`](super::StoreAuth), which wraps a `UserStore`.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Add traffic to a user's persisted counters.
    ///
    /// Returns the number of rows affected; `0` means the user no longer
    /// exists in the store.
    async fn add_traffic(&self, hash: &str, upload: u64, download: u64) -> Result<u64, AuthError>;

    /// Read every user row.
    ///
    /// `Err` means the query itself failed and nothing was read.
    async fn load_users(&self) -> Result<UserScan, AuthError>;

    /// Look up a single user by hash.
    ///
    /// Returns `None` if no user matches the hash.
    async fn find_by_hash(&self, hash: &str) -> Result<Option<UserRecord>, AuthError>;
}
