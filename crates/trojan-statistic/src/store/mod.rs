//! Store-backed authentication.
//!
//! This module provides:
//!
//! - [`UserRecord`] / [`UserScan`]: user rows as read from a persistent store
//! - [`UserStore`]: data-access trait (implement this for new backends)
//! - [`StoreAuth`]: a [`UserCache`](crate::UserCache) kept in sync with a
//!   `UserStore`. It falls back to the store on cache miss and runs the
//!   periodic flush/load reconciliation loop
//!
//! # Adding a new backend
//!
//! ```ignore
//! use trojan_statistic::store::{StoreAuth, UserRecord, UserScan, UserStore};
//!
//! struct MyStore { /* ... */ }
//!
//! #[async_trait::async_trait]
//! impl UserStore for MyStore {
//!     async fn add_traffic(&self, hash: &str, upload: u64, download: u64) -> Result<u64, AuthError> { todo!() }
//!     async fn load_users(&self) -> Result<UserScan, AuthError> { todo!() }
//!     async fn find_by_hash(&self, hash: &str) -> Result<Option<UserRecord>, AuthError> { todo!() }
//! }
//!
//! // Then construct: StoreAuth::new(MyStore { .. }, check_rate)
//! ```

mod auth;
mod reconcile;
mod record;
mod traits;


pub use auth::StoreAuth;
pub use reconcile::{FlushReport, LoadReport};
pub use record::{UserRecord, UserScan};
pub use traits::UserStore;
