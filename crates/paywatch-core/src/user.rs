//! Connected-account bindings.
//!
//! The user directory itself (credentials, profiles) lives elsewhere; this
//! service keeps only the binding from a local user to the Stripe Connect
//! account whose data it monitors. The account-keyed invalidation path
//! depends on resolving "all users bound to account X", so the binding is
//! indexed both ways in storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AccountId, UserId};

/// A local user's binding to a Stripe Connect account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// The local user ID (from the identity provider).
    pub user_id: UserId,

    /// The bound Connect account, if the user has connected one. Multiple
    /// users may bind the same account under a platform topology.
    pub stripe_account_id: Option<AccountId>,

    /// Contact email, if known.
    pub email: Option<String>,

    /// When the binding was created.
    pub created_at: DateTime<Utc>,

    /// When the binding was last updated.
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// Create a new, unbound user record.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            stripe_account_id: None,
            email: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Bind (or rebind) the user to a Connect account.
    pub fn bind_account(&mut self, account: AccountId) {
        self.stripe_account_id = Some(account);
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_is_unbound() {
        let user = UserRecord::new(UserId::generate());
        assert!(user.stripe_account_id.is_none());
    }

    #[test]
    fn bind_account_updates_timestamp() {
        let mut user = UserRecord::new(UserId::generate());
        let before = user.updated_at;
        user.bind_account("acct_42".parse().unwrap());
        assert_eq!(user.stripe_account_id.as_ref().unwrap().as_str(), "acct_42");
        assert!(user.updated_at >= before);
    }
}
