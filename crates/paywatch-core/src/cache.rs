//! Cache entry types.
//!
//! Each variant memoizes one expensive upstream read. Entries carry the
//! wall-clock time they were written; freshness is a pure function of that
//! stamp and a caller-supplied `now`, so expiry is testable with a
//! simulated clock. At most one live entry exists per composite key, which
//! the storage layer enforces with last-write-wins upserts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AccountId, UserId};
use crate::payment::{NormalizedPayment, PaymentSource, PaymentSummary, SubscriptionInfo};

/// Lifetime of a cache entry in seconds. Entries at or past this age must
/// not be served.
pub const CACHE_TTL_SECS: i64 = 3600;

/// Whether an entry stamped `cached_at` has expired as of `now`.
#[must_use]
pub fn is_expired(cached_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(cached_at).num_seconds() >= CACHE_TTL_SECS
}

/// Cached recent-payments listing for one (user, account, range) key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedCharges {
    /// Owning user.
    pub user_id: UserId,

    /// Account the data was fetched under.
    pub account: AccountId,

    /// Day-range bucket the listing covers.
    pub range_days: u32,

    /// The memoized payments.
    pub payments: Vec<NormalizedPayment>,

    /// Which upstream endpoint produced the payments.
    pub source: PaymentSource,

    /// When the entry was written.
    pub cached_at: DateTime<Utc>,
}

impl CachedCharges {
    /// Whether this entry has expired as of `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        is_expired(self.cached_at, now)
    }
}

/// Cached subscriptions listing for one (user, account) key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedSubscriptions {
    /// Owning user.
    pub user_id: UserId,

    /// Account the data was fetched under.
    pub account: AccountId,

    /// The memoized subscriptions.
    pub subscriptions: Vec<SubscriptionInfo>,

    /// When the entry was written.
    pub cached_at: DateTime<Utc>,
}

impl CachedSubscriptions {
    /// Whether this entry has expired as of `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        is_expired(self.cached_at, now)
    }
}

/// Cached payment summary for one (user, account, range, offset) key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedSummary {
    /// Owning user.
    pub user_id: UserId,

    /// Account the data was fetched under.
    pub account: AccountId,

    /// Day-range bucket the summary covers.
    pub range_days: u32,

    /// Day offset the window ends at (0 = now).
    pub day_offset: u32,

    /// The memoized summary.
    pub summary: PaymentSummary,

    /// When the entry was written.
    pub cached_at: DateTime<Utc>,
}

impl CachedSummary {
    /// Whether this entry has expired as of `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        is_expired(self.cached_at, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn fresh_entry_is_not_expired() {
        let now = Utc::now();
        assert!(!is_expired(now, now));
        assert!(!is_expired(now - Duration::seconds(CACHE_TTL_SECS - 1), now));
    }

    #[test]
    fn entry_expires_exactly_at_ttl() {
        let now = Utc::now();
        assert!(is_expired(now - Duration::seconds(CACHE_TTL_SECS), now));
        assert!(is_expired(now - Duration::seconds(CACHE_TTL_SECS + 1), now));
    }

    #[test]
    fn simulated_clock_past_ttl_expires_entry() {
        let cached_at = Utc::now();
        let entry = CachedCharges {
            user_id: UserId::generate(),
            account: "acct_123".parse().unwrap(),
            range_days: 30,
            payments: vec![],
            source: PaymentSource::PaymentIntents,
            cached_at,
        };
        let later = cached_at + Duration::seconds(3601);
        assert!(entry.is_expired(later));
        assert!(!entry.is_expired(cached_at + Duration::seconds(10)));
    }
}
