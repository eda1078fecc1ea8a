//! Cache-resident user with traffic counters and speed limits.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// Bytes accumulated since the last reset.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Traffic {
    sent: u64,
    recv: u64,
}

/// Per-direction speed limit in bytes per second (0 = unlimited).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SpeedLimit {
    pub sent: u64,
    pub recv: u64,
}

impl SpeedLimit {
    /// Whether neither direction is limited.
    #[inline]
    pub fn is_unlimited(&self) -> bool {
        self.sent == 0 && self.recv == 0
    }
}

/// An admitted user.
///
/// Always handed out as `Arc<User>`: the cache owns the entry, connections
/// and the reconciler only hold handles to it.
///
/// Traffic counters are not lock-free. Both directions share one short
/// `parking_lot::Mutex`, so [`add_traffic`](Self::add_traffic) and
/// [`reset_traffic`](Self::reset_traffic) may briefly wait on each other.
/// Speed limits are plain atomics and never block.
#[derive(Debug)]
pub struct User {
    hash: String,
    // Both directions live under one lock so a reset is never observed
    // half-done. The critical section is two integer ops.
    traffic: Mutex<Traffic>,
    speed_sent: AtomicU64,
    speed_recv: AtomicU64,
}

impl User {
    /// Create a user with zeroed counters and no speed limit.
    pub fn new(hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            traffic: Mutex::new(Traffic::default()),
            speed_sent: AtomicU64::new(0),
            speed_recv: AtomicU64::new(0),
        }
    }

    /// The credential hash identifying this user.
    #[inline]
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Account relayed bytes.
    ///
    /// `sent` is what the client sent through the proxy, `recv` what it
    /// received back.
    #[inline]
    pub fn add_traffic(&self, sent: u64, recv: u64) {
        let mut t = self.traffic.lock();
        t.sent = t.sent.saturating_add(sent);
        t.recv = t.recv.saturating_add(recv);
    }

    /// Bytes accumulated since the last reset, as `(sent, recv)`.
    #[inline]
    pub fn traffic(&self) -> (u64, u64) {
        let t = *self.traffic.lock();
        (t.sent, t.recv)
    }

    /// Swap both counters to zero, returning the previous `(sent, recv)`.
    ///
    /// Takes the traffic lock for the swap. Every byte passed to
    /// [`add_traffic`](Self::add_traffic) is returned by exactly one reset.
    #[inline]
    pub fn reset_traffic(&self) -> (u64, u64) {
        let t = std::mem::take(&mut *self.traffic.lock());
        (t.sent, t.recv)
    }

    /// Set per-direction speed limits in bytes per second.
    ///
    /// Non-positive values mean unlimited.
    #[allow(clippy::cast_sign_loss)]
    pub fn set_speed_limit(&self, sent: i64, recv: i64) {
        self.speed_sent.store(sent.max(0) as u64, Ordering::Relaxed);
        self.speed_recv.store(recv.max(0) as u64, Ordering::Relaxed);
    }

    /// Current speed limits.
    #[inline]
    pub fn speed_limit(&self) -> SpeedLimit {
        SpeedLimit {
            sent: self.speed_sent.load(Ordering::Relaxed),
            recv: self.speed_recv.load(Ordering::Relaxed),
        }
    }
}
