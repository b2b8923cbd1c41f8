//! `RocksDB` storage layer for paywatch.
//!
//! This crate provides persistent storage for connected-account bindings,
//! the webhook event log, and the three read-through cache variants, using
//! `RocksDB` with column families for efficient indexing.
//!
//! # Architecture
//!
//! The storage uses the following column families:
//!
//! - `users`: account bindings, keyed by `user_id`
//! - `users_by_account`: reverse index for the invalidation fan-out
//! - `webhook_events`: append-only event log, keyed by upstream event ID
//! - `events_by_time`: index for listing recent events
//! - `cache_charges` / `cache_subscriptions` / `cache_summary`: one cache
//!   table per variant, each with a composite key
//!
//! # Idempotency and upserts
//!
//! The event log is keyed by the upstream event ID, so a redelivered event
//! collapses onto the same key and [`Store::record_event`] reports it as
//! [`RecordOutcome::Duplicate`] instead of writing a second row. Cache
//! writes go through plain `put`, so two concurrent fetches for the same
//! composite key resolve to last-write-wins rather than a duplicate-key
//! error.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;

use chrono::{DateTime, Utc};
use paywatch_core::{
    AccountId, CachedCharges, CachedSubscriptions, CachedSummary, EventStatus, UserId, UserRecord,
    WebhookEvent,
};

/// Outcome of recording a webhook event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The event was stored for the first time.
    Recorded,
    /// An event with this ID was already stored; nothing was written.
    Duplicate,
}

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different
/// implementations (e.g. `RocksDB`, in-memory for testing).
pub trait Store: Send + Sync {
    // =========================================================================
    // Connected-Account Bindings
    // =========================================================================

    /// Insert or update a user's account binding, maintaining the
    /// account reverse index.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_user(&self, user: &UserRecord) -> Result<()>;

    /// Get a user's binding by user ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_user(&self, user_id: &UserId) -> Result<Option<UserRecord>>;

    /// Resolve every user bound to an account.
    ///
    /// Zero results is a normal outcome (an orphaned webhook for an
    /// unmapped account is not an error).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn find_users_by_account(&self, account: &AccountId) -> Result<Vec<UserId>>;

    // =========================================================================
    // Webhook Event Log
    // =========================================================================

    /// Record a webhook event, idempotently.
    ///
    /// A second call with the same `event_id` is a no-op reported as
    /// [`RecordOutcome::Duplicate`]. There is no deletion path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn record_event(&self, event: &WebhookEvent) -> Result<RecordOutcome>;

    /// Get an event by its upstream ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_event(&self, event_id: &str) -> Result<Option<WebhookEvent>>;

    /// Transition an event's processing status. The only permitted
    /// mutation of a stored event.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the event doesn't exist.
    fn set_event_status(&self, event_id: &str, status: EventStatus) -> Result<()>;

    /// List the most recently created events, newest first.
    ///
    /// Ordering follows the upstream `created` timestamp, not ingestion
    /// time.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_recent_events(&self, limit: usize) -> Result<Vec<WebhookEvent>>;

    // =========================================================================
    // Cache Tables
    // =========================================================================

    /// Upsert a charges-cache entry for its `(user, range, account)` key.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_charges(&self, entry: &CachedCharges) -> Result<()>;

    /// Look up a charges-cache entry. Freshness is the caller's concern.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_charges(
        &self,
        user_id: &UserId,
        account: &AccountId,
        range_days: u32,
    ) -> Result<Option<CachedCharges>>;

    /// Upsert a subscriptions-cache entry for its `(user, account)` key.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_subscriptions(&self, entry: &CachedSubscriptions) -> Result<()>;

    /// Look up a subscriptions-cache entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_subscriptions(
        &self,
        user_id: &UserId,
        account: &AccountId,
    ) -> Result<Option<CachedSubscriptions>>;

    /// Upsert a summary-cache entry for its `(user, range, offset,
    /// account)` key.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_summary(&self, entry: &CachedSummary) -> Result<()>;

    /// Look up a summary-cache entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_summary(
        &self,
        user_id: &UserId,
        account: &AccountId,
        range_days: u32,
        day_offset: u32,
    ) -> Result<Option<CachedSummary>>;

    // =========================================================================
    // Cache Deletion (invalidation primitives)
    // =========================================================================

    /// Delete a user's charges-cache entries, optionally narrowed to one
    /// range bucket. Returns the number of entries deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn delete_charges_for_user(&self, user_id: &UserId, range_days: Option<u32>) -> Result<usize>;

    /// Delete a user's subscriptions-cache entries. Returns the number of
    /// entries deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn delete_subscriptions_for_user(&self, user_id: &UserId) -> Result<usize>;

    /// Delete a user's summary-cache entries, optionally narrowed to one
    /// range bucket. Returns the number of entries deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn delete_summary_for_user(&self, user_id: &UserId, range_days: Option<u32>) -> Result<usize>;

    /// Physically delete cache entries across all variants whose TTL has
    /// elapsed as of `now`. Returns the number of entries deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize>;
}
