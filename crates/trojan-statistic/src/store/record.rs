//! User rows as held by a persistent store.

use crate::admission::is_admitted;
use crate::error::AuthError;

/// One row of the users table.
///
/// Numeric columns use `i64` to match DB column types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Credential hash (primary key).
    pub hash: String,
    /// Quota in bytes (`<= 0` = unlimited).
    pub quota: i64,
    /// Persisted bytes sent by the user.
    pub download: i64,
    /// Persisted bytes received by the user.
    pub upload: i64,
    /// Upstream speed limit in bytes per second (`<= 0` = unlimited).
    pub speed_sent: i64,
    /// Downstream speed limit in bytes per second (`<= 0` = unlimited).
    pub speed_recv: i64,
}

impl UserRecord {
    /// Create a record with unlimited quota and no usage.
    pub fn new(hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            quota: 0,
            download: 0,
            upload: 0,
            speed_sent: 0,
            speed_recv: 0,
        }
    }

    /// Builder: set quota.
    pub fn with_quota(mut self, quota: i64) -> Self {
        self.quota = quota;
        self
    }

    /// Builder: set persisted usage.
    pub fn with_usage(mut self, download: i64, upload: i64) -> Self {
        self.download = download;
        self.upload = upload;
        self
    }

    /// Builder: set speed limits.
    pub fn with_speed_limit(mut self, sent: i64, recv: i64) -> Self {
        self.speed_sent = sent;
        self.speed_recv = recv;
        self
    }

    /// Whether this user passes the quota admission policy.
    #[inline]
    pub fn is_admitted(&self) -> bool {
        is_admitted(self.quota, self.download, self.upload)
    }
}

/// Result of a full-table scan.
///
/// A scan stops at the first row that fails to decode: `records` then
/// holds the rows read before it and `error` the decode failure.
#[derive(Debug, Default)]
pub struct UserScan {
    pub records: Vec<UserRecord>,
    pub error: Option<AuthError>,
}

impl UserScan {
    /// A scan that read every row.
    pub fn complete(records: Vec<UserRecord>) -> Self {
        Self {
            records,
            error: None,
        }
    }
}
