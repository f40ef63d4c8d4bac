use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where an account stands in the grace-period purge machine.
///
/// `Purged` is terminal and never stored: a purged account is hard-deleted,
/// which is what makes the sweep idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountState {
    Active,
    DeletionRequested,
}

/// A user account, reduced to what the purge sweep needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,

    pub username: String,

    pub state: AccountState,

    /// Set when the user requested deletion; cleared on reactivation.
    pub deletion_requested_at: Option<DateTime<Utc>>,

    pub last_login: Option<DateTime<Utc>>,
}

impl Account {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            state: AccountState::Active,
            deletion_requested_at: None,
            last_login: None,
        }
    }

    /// Whether this account is past the retention window at `now`.
    pub fn purgeable(&self, cutoff: DateTime<Utc>) -> bool {
        self.state == AccountState::DeletionRequested
            && self
                .deletion_requested_at
                .map(|at| at <= cutoff)
                .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn active_account_is_never_purgeable() {
        let account = Account::new("u1", "alice");
        assert!(!account.purgeable(Utc::now()));
    }

    #[test]
    fn purgeable_only_past_cutoff() {
        let mut account = Account::new("u1", "alice");
        account.state = AccountState::DeletionRequested;
        account.deletion_requested_at = Some(Utc::now() - Duration::days(16));

        assert!(account.purgeable(Utc::now() - Duration::days(15)));
        assert!(!account.purgeable(Utc::now() - Duration::days(30)));
    }
}
