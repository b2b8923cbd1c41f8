//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Connected-account bindings, keyed by `user_id`.
    pub const USERS: &str = "users";

    /// Index: users by bound account, keyed by
    /// `account_id || 0x00 || user_id`. Value is empty (index only).
    pub const USERS_BY_ACCOUNT: &str = "users_by_account";

    /// Webhook event log, keyed by the upstream event ID. Keying by the
    /// upstream ID is what makes redelivery idempotent.
    pub const WEBHOOK_EVENTS: &str = "webhook_events";

    /// Index: events by upstream creation time, keyed by
    /// `created_millis (8 bytes BE) || event_id`. Value is empty.
    pub const EVENTS_BY_TIME: &str = "events_by_time";

    /// Charges cache, keyed by `user_id || range_days || account_id`.
    pub const CACHE_CHARGES: &str = "cache_charges";

    /// Subscriptions cache, keyed by `user_id || account_id`.
    pub const CACHE_SUBSCRIPTIONS: &str = "cache_subscriptions";

    /// Summary cache, keyed by
    /// `user_id || range_days || day_offset || account_id`.
    pub const CACHE_SUMMARY: &str = "cache_summary";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::USERS,
        cf::USERS_BY_ACCOUNT,
        cf::WEBHOOK_EVENTS,
        cf::EVENTS_BY_TIME,
        cf::CACHE_CHARGES,
        cf::CACHE_SUBSCRIPTIONS,
        cf::CACHE_SUMMARY,
    ]
}
