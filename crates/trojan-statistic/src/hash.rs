//! Credential hashing for user management.
//!
//! The authorization path treats hashes as opaque keys; this helper only
//! exists so operators can register users by password.

use sha2::{Digest, Sha224};

/// Lowercase hex SHA224 of `password`, the form trojan clients present.
///
/// # Example
/// ```
/// use trojan_statistic::sha224_hex;
///
/// assert_eq!(sha224_hex("password123").len(), 56);
/// ```
#[inline]
pub fn sha224_hex(password: &str) -> String {
    hex::encode(Sha224::digest(password.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        assert_eq!(
            sha224_hex(""),
            "d14a028c2a3a2bc9476102bb288234c415a2b01f828ea62ac5b3e42f"
        );
    }

    #[test]
    fn test_lowercase_hex() {
        let hash = sha224_hex("Secret");
        assert_eq!(hash.len(), 56);
        assert!(hash.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
        assert_ne!(hash, sha224_hex("secret"));
    }
}
