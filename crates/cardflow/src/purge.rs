//! Grace-period account purge.
//!
//! Accounts move `ACTIVE -> DELETION_REQUESTED` on user action (outside this
//! crate) and `DELETION_REQUESTED -> PURGED` here, by hard delete, once the
//! request has aged past the retention window. A login in between resets the
//! flag via `AccountStore::reactivate` (the login collaborator's job, not the
//! sweep's). Purged accounts no longer match the selection predicate, which
//! is all the idempotence the sweep needs.

use cardflow_core::{Account, AccountStore, CardflowError, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

pub struct PurgeSweep {
    accounts: Arc<dyn AccountStore>,
    retention: Duration,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
}

impl PurgeSweep {
    pub fn new(accounts: Arc<dyn AccountStore>, retention: Duration, interval: Duration) -> Self {
        Self {
            accounts,
            retention,
            interval,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Run one sweep as of `now`. Returns the purged accounts.
    pub fn sweep_once(&self, now: DateTime<Utc>) -> Result<Vec<Account>> {
        let retention = ChronoDuration::from_std(self.retention)
            .map_err(|e| CardflowError::Config(e.to_string()))?;
        let cutoff = now - retention;

        let purged = self.accounts.purge_older_than(cutoff)?;
        for account in &purged {
            info!(account = %account.username, "account purged after retention window");
        }
        Ok(purged)
    }

    /// Run the sweep on its fixed interval until shutdown is signaled.
    pub async fn run(&self) {
        info!("purge sweep started");

        while !self.shutdown.load(Ordering::SeqCst) {
            if let Err(e) = self.sweep_once(Utc::now()) {
                error!(error = %e, "purge sweep failed");
            }
            tokio::time::sleep(self.interval).await;
        }

        info!("purge sweep stopped");
    }

    /// Signal graceful shutdown.
    pub fn shutdown_handle(&self) -> crate::applier::ShutdownHandle {
        crate::applier::ShutdownHandle::from_flag(self.shutdown.clone())
    }
}
