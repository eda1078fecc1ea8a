//! In-memory user cache.
//!
//! [`UserCache`] holds the users currently believed to be admitted, keyed
//! by credential hash. Each entry is a shared [`User`] whose traffic
//! counters are bumped by the data plane and drained by the reconciler.

mod cache;
mod user;

pub use cache::{CacheStats, UserCache};
pub use user::{SpeedLimit, User};
