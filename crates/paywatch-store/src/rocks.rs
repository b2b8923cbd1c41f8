//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store`
//! trait.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode, Options,
    WriteBatch,
};

use paywatch_core::cache::is_expired;
use paywatch_core::{
    AccountId, CachedCharges, CachedSubscriptions, CachedSummary, EventStatus, UserId, UserRecord,
    WebhookEvent,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::{RecordOutcome, Store};

type MultiThreadedDb = DBWithThreadMode<rocksdb::MultiThreaded>;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<MultiThreadedDb>,
}

/// Minimal view of a cache value for expiry scans. CBOR maps tolerate the
/// extra fields.
#[derive(serde::Deserialize)]
struct CachedStamp {
    cached_at: DateTime<Utc>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = MultiThreadedDb::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Fetch and deserialize one value.
    fn get_value<T: serde::de::DeserializeOwned>(
        &self,
        cf_name: &str,
        key: &[u8],
    ) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    /// Serialize and store one value.
    fn put_value<T: serde::Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let bytes = Self::serialize(value)?;
        self.db
            .put_cf(&cf, key, bytes)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// Delete every key under `prefix` in one column family. Returns the
    /// number of keys deleted.
    fn delete_prefix(&self, cf_name: &str, prefix: &[u8]) -> Result<usize> {
        let cf = self.cf(cf_name)?;
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(prefix, Direction::Forward));

        let mut batch = WriteBatch::default();
        let mut count = 0;

        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(prefix) {
                break;
            }
            batch.delete_cf(&cf, &key);
            count += 1;
        }

        if count > 0 {
            self.db
                .write(batch)
                .map_err(|e| StoreError::Database(e.to_string()))?;
        }

        Ok(count)
    }

    /// Delete expired entries in one cache column family as of `now`.
    fn purge_expired_cf(&self, cf_name: &str, now: DateTime<Utc>) -> Result<usize> {
        let cf = self.cf(cf_name)?;
        let iter = self.db.iterator_cf(&cf, IteratorMode::Start);

        let mut batch = WriteBatch::default();
        let mut count = 0;

        for item in iter {
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let stamp: CachedStamp = Self::deserialize(&value)?;
            if is_expired(stamp.cached_at, now) {
                batch.delete_cf(&cf, &key);
                count += 1;
            }
        }

        if count > 0 {
            self.db
                .write(batch)
                .map_err(|e| StoreError::Database(e.to_string()))?;
        }

        Ok(count)
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Connected-Account Bindings
    // =========================================================================

    fn put_user(&self, user: &UserRecord) -> Result<()> {
        let cf_users = self.cf(cf::USERS)?;
        let cf_index = self.cf(cf::USERS_BY_ACCOUNT)?;

        let key = keys::user_key(&user.user_id);
        let value = Self::serialize(user)?;

        // Rebinding moves the reverse-index entry in the same batch.
        let previous: Option<UserRecord> = self.get_user(&user.user_id)?;

        let mut batch = WriteBatch::default();

        if let Some(prev_account) = previous.and_then(|p| p.stripe_account_id) {
            if user.stripe_account_id.as_ref() != Some(&prev_account) {
                batch.delete_cf(
                    &cf_index,
                    keys::user_by_account_key(&prev_account, &user.user_id),
                );
            }
        }

        batch.put_cf(&cf_users, &key, &value);

        if let Some(account) = &user.stripe_account_id {
            batch.put_cf(&cf_index, keys::user_by_account_key(account, &user.user_id), []);
        }

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn get_user(&self, user_id: &UserId) -> Result<Option<UserRecord>> {
        self.get_value(cf::USERS, &keys::user_key(user_id))
    }

    fn find_users_by_account(&self, account: &AccountId) -> Result<Vec<UserId>> {
        let cf = self.cf(cf::USERS_BY_ACCOUNT)?;
        let prefix = keys::users_by_account_prefix(account);

        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(&prefix, Direction::Forward));

        let mut users = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            users.push(keys::extract_user_id_from_account_key(&key));
        }

        Ok(users)
    }

    // =========================================================================
    // Webhook Event Log
    // =========================================================================

    fn record_event(&self, event: &WebhookEvent) -> Result<RecordOutcome> {
        let cf_events = self.cf(cf::WEBHOOK_EVENTS)?;
        let cf_by_time = self.cf(cf::EVENTS_BY_TIME)?;

        let key = keys::event_key(&event.event_id);

        // Check-then-write is safe here: a racing redelivery lands on the
        // same key with the same content, so the log still holds exactly
        // one row per upstream event ID.
        let existing = self
            .db
            .get_cf(&cf_events, &key)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        if existing.is_some() {
            return Ok(RecordOutcome::Duplicate);
        }

        let value = Self::serialize(event)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_events, &key, &value);
        batch.put_cf(
            &cf_by_time,
            keys::event_by_time_key(event.created, &event.event_id),
            [],
        );

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(RecordOutcome::Recorded)
    }

    fn get_event(&self, event_id: &str) -> Result<Option<WebhookEvent>> {
        self.get_value(cf::WEBHOOK_EVENTS, &keys::event_key(event_id))
    }

    fn set_event_status(&self, event_id: &str, status: EventStatus) -> Result<()> {
        let mut event = self.get_event(event_id)?.ok_or(StoreError::NotFound)?;
        event.status = status;
        self.put_value(cf::WEBHOOK_EVENTS, &keys::event_key(event_id), &event)
    }

    fn list_recent_events(&self, limit: usize) -> Result<Vec<WebhookEvent>> {
        let cf_by_time = self.cf(cf::EVENTS_BY_TIME)?;

        // The time index sorts ascending; walk it backwards for newest
        // first.
        let iter = self.db.iterator_cf(&cf_by_time, IteratorMode::End);

        let mut events = Vec::new();
        for item in iter {
            if events.len() >= limit {
                break;
            }
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            let event_id = keys::extract_event_id_from_time_key(&key);
            if let Some(event) = self.get_event(&event_id)? {
                events.push(event);
            }
        }

        Ok(events)
    }

    // =========================================================================
    // Cache Tables
    // =========================================================================

    fn put_charges(&self, entry: &CachedCharges) -> Result<()> {
        let key = keys::charges_key(&entry.user_id, &entry.account, entry.range_days);
        self.put_value(cf::CACHE_CHARGES, &key, entry)
    }

    fn get_charges(
        &self,
        user_id: &UserId,
        account: &AccountId,
        range_days: u32,
    ) -> Result<Option<CachedCharges>> {
        self.get_value(cf::CACHE_CHARGES, &keys::charges_key(user_id, account, range_days))
    }

    fn put_subscriptions(&self, entry: &CachedSubscriptions) -> Result<()> {
        let key = keys::subscriptions_key(&entry.user_id, &entry.account);
        self.put_value(cf::CACHE_SUBSCRIPTIONS, &key, entry)
    }

    fn get_subscriptions(
        &self,
        user_id: &UserId,
        account: &AccountId,
    ) -> Result<Option<CachedSubscriptions>> {
        self.get_value(cf::CACHE_SUBSCRIPTIONS, &keys::subscriptions_key(user_id, account))
    }

    fn put_summary(&self, entry: &CachedSummary) -> Result<()> {
        let key = keys::summary_key(
            &entry.user_id,
            &entry.account,
            entry.range_days,
            entry.day_offset,
        );
        self.put_value(cf::CACHE_SUMMARY, &key, entry)
    }

    fn get_summary(
        &self,
        user_id: &UserId,
        account: &AccountId,
        range_days: u32,
        day_offset: u32,
    ) -> Result<Option<CachedSummary>> {
        self.get_value(
            cf::CACHE_SUMMARY,
            &keys::summary_key(user_id, account, range_days, day_offset),
        )
    }

    // =========================================================================
    // Cache Deletion
    // =========================================================================

    fn delete_charges_for_user(&self, user_id: &UserId, range_days: Option<u32>) -> Result<usize> {
        let prefix = match range_days {
            Some(range) => keys::user_range_prefix(user_id, range),
            None => keys::user_prefix(user_id),
        };
        self.delete_prefix(cf::CACHE_CHARGES, &prefix)
    }

    fn delete_subscriptions_for_user(&self, user_id: &UserId) -> Result<usize> {
        self.delete_prefix(cf::CACHE_SUBSCRIPTIONS, &keys::user_prefix(user_id))
    }

    fn delete_summary_for_user(&self, user_id: &UserId, range_days: Option<u32>) -> Result<usize> {
        let prefix = match range_days {
            Some(range) => keys::user_range_prefix(user_id, range),
            None => keys::user_prefix(user_id),
        };
        self.delete_prefix(cf::CACHE_SUMMARY, &prefix)
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut total = 0;
        for cf_name in [cf::CACHE_CHARGES, cf::CACHE_SUBSCRIPTIONS, cf::CACHE_SUMMARY] {
            let purged = self.purge_expired_cf(cf_name, now)?;
            if purged > 0 {
                tracing::debug!(cf = cf_name, purged, "Purged expired cache entries");
            }
            total += purged;
        }
        Ok(total)
    }
}
