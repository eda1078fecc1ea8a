//! SQL user store.

use async_trait::async_trait;
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Row};

use crate::error::AuthError;
use crate::store::{StoreAuth, UserRecord, UserScan, UserStore};

use super::config::SqlAuthConfig;
use super::queries;

/// Database type enum for query selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    /// PostgreSQL database.
    PostgreSQL,
    /// MySQL/MariaDB database.
    MySQL,
    /// SQLite database.
    SQLite,
}

impl DatabaseType {
    /// Detect database type from URL.
    pub fn from_url(url: &str) -> Option<Self> {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Some(Self::PostgreSQL)
        } else if url.starts_with("mysql://") || url.starts_with("mariadb://") {
            Some(Self::MySQL)
        } else if url.starts_with("sqlite:") {
            Some(Self::SQLite)
        } else {
            None
        }
    }
}

/// [`UserStore`] over a bounded SQLx connection pool.
///
/// Supports MySQL, PostgreSQL and SQLite through the `Any` driver.
pub struct SqlStore {
    pool: AnyPool,
    db_type: DatabaseType,
}

/// Store-backed authenticator over SQL.
pub type SqlAuth = StoreAuth<SqlStore>;

impl SqlStore {
    /// Connect to the database described by `config`.
    pub async fn connect(config: &SqlAuthConfig) -> Result<Self, AuthError> {
        // Install database drivers for the "any" pool
        sqlx::any::install_default_drivers();

        let url = config.database_url();
        let db_type = DatabaseType::from_url(&url)
            .ok_or_else(|| AuthError::backend("unsupported database URL scheme"))?;

        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout())
            .connect(&url)
            .await?;

        Ok(Self { pool, db_type })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: AnyPool, db_type: DatabaseType) -> Self {
        Self { pool, db_type }
    }

    /// Create the `users` table if it does not exist.
    pub async fn init_schema(&self) -> Result<(), AuthError> {
        let schema = match self.db_type {
            DatabaseType::PostgreSQL => queries::SCHEMA_PG,
            DatabaseType::MySQL => queries::SCHEMA_MYSQL,
            DatabaseType::SQLite => queries::SCHEMA_SQLITE,
        };
        sqlx::query(schema).execute(&self.pool).await?;
        Ok(())
    }

    /// Get the connection pool (for advanced usage).
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Get database type.
    pub fn database_type(&self) -> DatabaseType {
        self.db_type
    }

    /// Parse a user row.
    fn parse_user_row(row: &AnyRow) -> Result<UserRecord, AuthError> {
        Ok(UserRecord {
            hash: row.try_get("password")?,
            quota: get_i64(row, "quota")?,
            download: get_i64(row, "download")?,
            upload: get_i64(row, "upload")?,
            speed_sent: get_i64(row, "speed_sent")?,
            speed_recv: get_i64(row, "speed_recv")?,
        })
    }
}

/// Read an integer column, accepting 32-bit columns too.
fn get_i64(row: &AnyRow, column: &str) -> Result<i64, AuthError> {
    row.try_get::<i64, _>(column)
        .or_else(|_| row.try_get::<i32, _>(column).map(i64::from))
        .map_err(AuthError::from)
}

#[inline]
fn to_i64(bytes: u64) -> i64 {
    i64::try_from(bytes).unwrap_or(i64::MAX)
}

#[async_trait]
impl UserStore for SqlStore {
    async fn add_traffic(&self, hash: &str, upload: u64, download: u64) -> Result<u64, AuthError> {
        let query = match self.db_type {
            DatabaseType::PostgreSQL => queries::ADD_TRAFFIC_PG,
            DatabaseType::MySQL | DatabaseType::SQLite => queries::ADD_TRAFFIC_MYSQL,
        };

        let result = sqlx::query(query)
            .bind(to_i64(upload))
            .bind(to_i64(download))
            .bind(hash)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn load_users(&self) -> Result<UserScan, AuthError> {
        let rows = sqlx::query(queries::LOAD_USERS)
            .fetch_all(&self.pool)
            .await?;

        let mut scan = UserScan::default();
        for row in &rows {
            match Self::parse_user_row(row) {
                Ok(record) => scan.records.push(record),
                Err(e) => {
                    scan.error = Some(e);
                    break;
                }
            }
        }
        Ok(scan)
    }

    async fn find_by_hash(&self, hash: &str) -> Result<Option<UserRecord>, AuthError> {
        let query = match self.db_type {
            DatabaseType::PostgreSQL => queries::FIND_BY_HASH_PG,
            DatabaseType::MySQL | DatabaseType::SQLite => queries::FIND_BY_HASH_MYSQL,
        };

        sqlx::query(query)
            .bind(hash)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(Self::parse_user_row)
            .transpose()
    }
}

impl StoreAuth<SqlStore> {
    /// Connect to the database and create the authenticator.
    ///
    /// The reconciliation loop is not started; call
    /// [`spawn`](StoreAuth::spawn) on an `Arc` of the result.
    pub async fn connect(config: &SqlAuthConfig) -> Result<Self, AuthError> {
        config.validate()?;
        let store = SqlStore::connect(config).await?;
        Ok(Self::new(store, config.check_interval()))
    }
}

// Debug implementation (don't leak credentials)
impl std::fmt::Debug for SqlStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlStore")
            .field("db_type", &self.db_type)
            .field("pool_size", &self.pool.size())
            .finish_non_exhaustive()
    }
}
