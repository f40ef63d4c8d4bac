//! Pipeline configuration.

use std::time::Duration;

/// Tunables for the write-behind pipeline and its background loops.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// How long a staged record lives in the ephemeral store.
    ///
    /// Must exceed `commit_delay` plus expected consumer lag, or staged cards
    /// disappear from reads before they land durably.
    pub stage_ttl: Duration,

    /// Grace window between draining a `Created` event and the durable write.
    /// A cancelling `Deleted` event arriving inside the window suppresses the
    /// commit entirely.
    pub commit_delay: Duration,

    /// How long a tombstone is kept after it is recorded.
    ///
    /// Must cover `commit_delay` plus consumer-lag headroom, so a redelivered
    /// `Created` event still finds the tombstone that suppresses it.
    pub tombstone_retention: Duration,

    /// How often the commit scheduler checks for due pending commits.
    pub scheduler_poll_interval: Duration,

    /// How often the event consumer polls when the log is idle.
    pub consumer_poll_interval: Duration,

    /// How long a deletion-requested account is retained before the sweep
    /// hard-deletes it.
    pub purge_retention: Duration,

    /// How often the purge sweep runs.
    pub purge_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stage_ttl: Duration::from_secs(4000),
            commit_delay: Duration::from_secs(3600),
            tombstone_retention: Duration::from_secs(2 * 3600),
            scheduler_poll_interval: Duration::from_secs(1),
            consumer_poll_interval: Duration::from_millis(100),
            purge_retention: Duration::from_secs(15 * 24 * 60 * 60),
            purge_interval: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the staging TTL.
    pub fn with_stage_ttl(mut self, ttl: Duration) -> Self {
        self.stage_ttl = ttl;
        self
    }

    /// Set the commit grace delay.
    pub fn with_commit_delay(mut self, delay: Duration) -> Self {
        self.commit_delay = delay;
        self
    }

    /// Set the tombstone retention window.
    pub fn with_tombstone_retention(mut self, retention: Duration) -> Self {
        self.tombstone_retention = retention;
        self
    }

    /// Set the scheduler poll interval.
    pub fn with_scheduler_poll_interval(mut self, interval: Duration) -> Self {
        self.scheduler_poll_interval = interval;
        self
    }

    /// Set the consumer poll interval.
    pub fn with_consumer_poll_interval(mut self, interval: Duration) -> Self {
        self.consumer_poll_interval = interval;
        self
    }

    /// Set the purge retention window.
    pub fn with_purge_retention(mut self, retention: Duration) -> Self {
        self.purge_retention = retention;
        self
    }

    /// Set the purge sweep interval.
    pub fn with_purge_interval(mut self, interval: Duration) -> Self {
        self.purge_interval = interval;
        self
    }
}
