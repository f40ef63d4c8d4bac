//! Notification system for waking consumers when new events arrive

use std::sync::Arc;
use std::time::Duration;

/// Strategy for waking consumers when new events arrive
#[derive(Clone)]
pub enum WakeStrategy {
    /// Poll periodically for new events
    Poll { interval: Duration },

    /// Use async notifications (tokio::sync::Notify)
    Notify(Arc<tokio::sync::Notify>),
}

impl WakeStrategy {
    /// Create a polling wake strategy with the given interval
    pub fn poll(interval: Duration) -> Self {
        Self::Poll { interval }
    }

    /// Create a notification-based wake strategy
    pub fn notify() -> Self {
        Self::Notify(Arc::new(tokio::sync::Notify::new()))
    }

    /// Wait for new events
    pub async fn wait(&self) {
        match self {
            WakeStrategy::Poll { interval } => {
                tokio::time::sleep(*interval).await;
            }
            WakeStrategy::Notify(notify) => {
                notify.notified().await;
            }
        }
    }

    /// Notify all waiting consumers
    ///
    /// This is a no-op for the Poll strategy.
    pub fn wake(&self) {
        if let WakeStrategy::Notify(notify) = self {
            notify.notify_waiters();
        }
    }
}

impl Default for WakeStrategy {
    fn default() -> Self {
        // Default to polling with 10ms interval
        Self::Poll {
            interval: Duration::from_millis(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_poll_strategy() {
        let strategy = WakeStrategy::poll(Duration::from_millis(1));

        let start = std::time::Instant::now();
        strategy.wait().await;
        let elapsed = start.elapsed();

        assert!(elapsed >= Duration::from_millis(1));
        assert!(elapsed < Duration::from_millis(100)); // Sanity check
    }

    #[tokio::test]
    async fn test_notify_strategy() {
        let strategy = WakeStrategy::notify();

        let strategy_clone = strategy.clone();
        let handle = tokio::spawn(async move {
            strategy_clone.wait().await;
        });

        // Give it a moment to start waiting
        tokio::time::sleep(Duration::from_millis(10)).await;

        strategy.wake();

        tokio::time::timeout(Duration::from_millis(100), handle)
            .await
            .expect("Task should complete")
            .expect("Task should not panic");
    }
}
