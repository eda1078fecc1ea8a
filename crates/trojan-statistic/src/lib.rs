//! User authentication and traffic quota accounting for trojan servers.
//!
//! Admitted users live in an in-memory [`UserCache`]; a persistent store
//! (see [`store::UserStore`], [`sql::SqlStore`]) is the source of truth for
//! quotas and cumulative traffic. [`store::StoreAuth`] ties the two
//! together: lookups hit the cache first and fall back to the store, and a
//! background loop periodically flushes metered traffic to the store and
//! reloads admission state from it.
//!
//! # Example
//!
//! ```
//! use trojan_statistic::{Authenticator, UserCache};
//!
//! # async fn example() {
//! let cache = UserCache::from_hashes(["0123abcd"]);
//!
//! let user = cache.authorize("0123abcd").await.unwrap();
//! user.add_traffic(1024, 4096);
//! assert_eq!(user.reset_traffic(), (1024, 4096));
//! # }
//! ```

mod admission;
mod error;
mod hash;
mod traits;

pub mod cli;
pub mod config;
pub mod memory;
pub mod sql;
pub mod store;

pub use admission::is_admitted;
pub use cli::StatisticArgs;
pub use error::AuthError;
pub use hash::sha224_hex;
pub use memory::{CacheStats, SpeedLimit, User, UserCache};
pub use traits::Authenticator;
