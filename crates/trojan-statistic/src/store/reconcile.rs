//! Periodic reconciliation between the user cache and the store.
//!
//! Each cycle has two phases with no lock spanning them:
//!
//! 1. **Flush**: drain every cached user's traffic counters into the
//!    store. A failed write is logged and the drained bytes are dropped;
//!    accounting is best-effort, a delta is never written twice.
//! 2. **Load**: scan the whole table and re-apply the admission policy,
//!    caching admitted users (with their speed limits) and evicting the rest.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::AuthError;

use super::auth::StoreAuth;
use super::traits::UserStore;

/// Outcome of a flush phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Users with a non-zero delta that were written.
    pub written: usize,
    /// Rows reported affected by the store.
    pub affected: u64,
    /// Users evicted because their row is gone.
    pub evicted: usize,
    /// Users whose write failed (their delta is lost).
    pub failed: usize,
}

/// Outcome of a load phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Rows applied to the cache.
    pub loaded: usize,
    /// Rows that passed the admission policy.
    pub admitted: usize,
    /// Cached users evicted for exceeding their quota.
    pub evicted: usize,
    /// Whether the scan stopped early on a decode error.
    pub truncated: bool,
}

impl<S: UserStore> StoreAuth<S> {
    /// Flush phase: write accumulated traffic of every cached user.
    ///
    /// What a user sent is added to `download`, what it received to
    /// `upload`.
    pub async fn flush(&self) -> FlushReport {
        let mut report = FlushReport::default();

        for user in self.cache.list_users() {
            let (sent, recv) = user.reset_traffic();
            if sent == 0 && recv == 0 {
                continue;
            }

            match self.store.add_traffic(user.hash(), recv, sent).await {
                Ok(0) => {
                    debug!("user no longer in store, evicting");
                    self.cache.remove_user(user.hash());
                    report.evicted += 1;
                }
                Ok(affected) => {
                    report.written += 1;
                    report.affected += affected;
                }
                Err(e) => {
                    error!(error = %e, sent, recv, "failed to write traffic to store");
                    report.failed += 1;
                }
            }
        }

        info!(
            affected = report.affected,
            evicted = report.evicted,
            failed = report.failed,
            "buffered traffic written to store"
        );
        report
    }

    /// Load phase: re-derive cache membership and speed limits.
    ///
    /// Returns `Err` only when the table scan could not be issued; the
    /// cache is left untouched in that case.
    pub async fn load(&self) -> Result<LoadReport, AuthError> {
        let scan = self.store.load_users().await?;
        let mut report = LoadReport::default();

        for record in &scan.records {
            report.loaded += 1;
            if record.is_admitted() {
                self.admit(record);
                report.admitted += 1;
            } else if self.cache.remove_user(&record.hash) {
                debug!(
                    quota = record.quota,
                    used = record.download.saturating_add(record.upload),
                    "quota exceeded, evicting"
                );
                report.evicted += 1;
            }
        }

        if let Some(e) = scan.error {
            warn!(error = %e, loaded = report.loaded, "abandoned user scan on undecodable row");
            report.truncated = true;
        }

        info!(
            loaded = report.loaded,
            admitted = report.admitted,
            evicted = report.evicted,
            cached = self.cache.len(),
            "users loaded from store"
        );
        Ok(report)
    }

    /// Run one flush phase followed by one load phase.
    pub async fn reconcile_once(&self) -> Result<(FlushReport, LoadReport), AuthError> {
        let flushed = self.flush().await;
        let loaded = self.load().await?;
        Ok((flushed, loaded))
    }

    /// Run the reconciliation loop until `shutdown` is cancelled.
    ///
    /// The first cycle starts immediately. If the table scan fails the
    /// loop waits one extra `check_rate`, starts the next cycle and
    /// restarts the period from there. In-flight
    /// store calls are never interrupted; cancellation is observed while
    /// waiting.
    pub async fn run(&self, shutdown: CancellationToken) {
        // interval() panics on a zero period
        let period = self.check_rate.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        debug!(check_rate = ?period, "reconciliation loop started");
        loop {
            self.flush().await;

            if let Err(e) = self.load().await {
                error!(error = %e, "failed to pull users from store");
                tokio::select! {
                    _ = tokio::time::sleep(period) => {
                        // drop ticks missed while backing off
                        ticker.reset();
                        continue;
                    }
                    _ = shutdown.cancelled() => break,
                }
            }

            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.cancelled() => break,
            }
        }
        debug!("reconciliation loop exiting");
    }

    /// Spawn [`run`](Self::run) on the current Tokio runtime.
    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()>
    where
        S: 'static,
    {
        tokio::spawn(async move { self.run(shutdown).await })
    }
}
