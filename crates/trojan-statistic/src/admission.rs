//! Quota admission policy.
//!
//! The same rule decides cache membership during reconciliation and
//! admission on a cache-miss lookup.

/// Returns whether a user with the given persisted counters may connect.
///
/// A non-positive `quota` is unlimited. Otherwise the combined
/// `download + upload` must stay strictly below `quota`; reaching it
/// exactly is already over.
#[inline]
pub fn is_admitted(quota: i64, download: i64, upload: i64) -> bool {
    quota <= 0 || download.saturating_add(upload) < quota
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlimited_quota_always_admitted() {
        for quota in [0, -1, i64::MIN] {
            for used in [0, 1, 1 << 40, i64::MAX] {
                assert!(is_admitted(quota, used, used));
            }
        }
    }

    #[test]
    fn test_positive_quota() {
        assert!(is_admitted(1000, 0, 0));
        assert!(is_admitted(1000, 500, 499));
        assert!(!is_admitted(1000, 600, 500));
        assert!(!is_admitted(1000, 0, 1001));
    }

    #[test]
    fn test_boundary_is_denied() {
        assert!(!is_admitted(1000, 1000, 0));
        assert!(!is_admitted(1000, 400, 600));
        assert!(is_admitted(1000, 400, 599));
    }

    #[test]
    fn test_huge_counters_do_not_overflow() {
        assert!(!is_admitted(i64::MAX, i64::MAX, i64::MAX));
    }
}
