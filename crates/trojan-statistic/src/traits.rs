//! Authorization trait exposed to the connection-accept path.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::AuthError;
use crate::memory::User;

/// Trait for authenticators.
///
/// Implementations must be thread-safe (`Send + Sync`) as they are
/// called concurrently, once per incoming connection.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Resolve a credential hash to its live [`User`] handle.
    ///
    /// # Returns
    /// * `Ok(user)` - the hash is admitted; traffic should be metered on `user`
    /// * `Err(AuthError)` - the hash is unknown, over quota, or the backend failed
    async fn verify(&self, hash: &str) -> Result<Arc<User>, AuthError>;

    /// Fail-closed form of [`verify`](Self::verify).
    ///
    /// Every error, including backend failures, is reported as `None`.
    async fn authorize(&self, hash: &str) -> Option<Arc<User>> {
        match self.verify(hash).await {
            Ok(user) => Some(user),
            Err(e) => {
                debug!(error = %e, "authorization denied");
                None
            }
        }
    }
}

#[async_trait]
impl<A: Authenticator + ?Sized> Authenticator for Arc<A> {
    #[inline]
    async fn verify(&self, hash: &str) -> Result<Arc<User>, AuthError> {
        (**self).verify(hash).await
    }
}

#[async_trait]
impl<A: Authenticator + ?Sized> Authenticator for Box<A> {
    #[inline]
    async fn verify(&self, hash: &str) -> Result<Arc<User>, AuthError> {
        (**self).verify(hash).await
    }
}
