//! Authentication and accounting error types.

/// Authentication error.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No user with this hash exists.
    #[error("invalid credential")]
    Invalid,

    /// The user exists but has used up its quota.
    #[error("traffic quota exceeded")]
    QuotaExceeded,

    /// Backend error (database, network, etc.).
    #[error("backend error: {0}")]
    Backend(String),

    /// A row returned by the store could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Invalid configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl AuthError {
    /// Create a backend error from any error type.
    #[inline]
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::ColumnIndexOutOfBounds { .. }
            | sqlx::Error::Decode(_) => Self::Decode(err.to_string()),
            other => Self::Backend(other.to_string()),
        }
    }
}
