//! Key encoding utilities for `RocksDB`.
//!
//! Fixed-width components (user IDs, range buckets) lead each key so that
//! per-user and per-range prefixes are unambiguous. The variable-length
//! account ID always comes last, and where an account ID is the *prefix*
//! (the reverse index) it is terminated with a `0x00` separator, which
//! `AccountId` guarantees never occurs in the ID itself.

use chrono::{DateTime, Utc};
use paywatch_core::{AccountId, UserId};

/// Separator between the account ID and the user ID in the reverse index.
const ACCOUNT_SEP: u8 = 0x00;

/// Create a user key from a user ID.
#[must_use]
pub fn user_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Create a user-by-account index key.
///
/// Format: `account_id || 0x00 || user_id (16 bytes)`.
#[must_use]
pub fn user_by_account_key(account: &AccountId, user_id: &UserId) -> Vec<u8> {
    let mut key = Vec::with_capacity(account.as_bytes().len() + 1 + 16);
    key.extend_from_slice(account.as_bytes());
    key.push(ACCOUNT_SEP);
    key.extend_from_slice(user_id.as_bytes());
    key
}

/// Create a prefix for iterating all users bound to an account.
///
/// The trailing separator keeps `acct_1` from matching keys under
/// `acct_12`.
#[must_use]
pub fn users_by_account_prefix(account: &AccountId) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(account.as_bytes().len() + 1);
    prefix.extend_from_slice(account.as_bytes());
    prefix.push(ACCOUNT_SEP);
    prefix
}

/// Extract the user ID from a user-by-account index key.
///
/// # Panics
///
/// Panics if the key does not end in 16 user-ID bytes.
#[must_use]
pub fn extract_user_id_from_account_key(key: &[u8]) -> UserId {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[key.len() - 16..]);
    UserId::from_bytes(bytes)
}

/// Create a webhook event key from the upstream event ID.
#[must_use]
pub fn event_key(event_id: &str) -> Vec<u8> {
    event_id.as_bytes().to_vec()
}

/// Create an event time-index key.
///
/// Format: `created_millis (8 bytes BE) || event_id`. Big-endian
/// timestamps sort chronologically under RocksDB's byte ordering.
#[must_use]
pub fn event_by_time_key(created: DateTime<Utc>, event_id: &str) -> Vec<u8> {
    let millis = created.timestamp_millis();
    let mut key = Vec::with_capacity(8 + event_id.len());
    key.extend_from_slice(&millis.to_be_bytes());
    key.extend_from_slice(event_id.as_bytes());
    key
}

/// Extract the event ID from an event time-index key.
///
/// # Panics
///
/// Panics if the key is shorter than the 8-byte timestamp or the event ID
/// is not valid UTF-8.
#[must_use]
pub fn extract_event_id_from_time_key(key: &[u8]) -> String {
    String::from_utf8(key[8..].to_vec()).expect("event IDs are ASCII")
}

/// Create a charges-cache key.
///
/// Format: `user_id (16 bytes) || range_days (4 bytes BE) || account_id`.
#[must_use]
pub fn charges_key(user_id: &UserId, account: &AccountId, range_days: u32) -> Vec<u8> {
    let mut key = Vec::with_capacity(20 + account.as_bytes().len());
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(&range_days.to_be_bytes());
    key.extend_from_slice(account.as_bytes());
    key
}

/// Create a subscriptions-cache key.
///
/// Format: `user_id (16 bytes) || account_id`.
#[must_use]
pub fn subscriptions_key(user_id: &UserId, account: &AccountId) -> Vec<u8> {
    let mut key = Vec::with_capacity(16 + account.as_bytes().len());
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(account.as_bytes());
    key
}

/// Create a summary-cache key.
///
/// Format: `user_id (16) || range_days (4 BE) || day_offset (4 BE) || account_id`.
#[must_use]
pub fn summary_key(
    user_id: &UserId,
    account: &AccountId,
    range_days: u32,
    day_offset: u32,
) -> Vec<u8> {
    let mut key = Vec::with_capacity(24 + account.as_bytes().len());
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(&range_days.to_be_bytes());
    key.extend_from_slice(&day_offset.to_be_bytes());
    key.extend_from_slice(account.as_bytes());
    key
}

/// Prefix matching every cache entry owned by a user, in any variant CF.
#[must_use]
pub fn user_prefix(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Prefix matching a user's charges-cache entries for one range bucket.
#[must_use]
pub fn user_range_prefix(user_id: &UserId, range_days: u32) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(20);
    prefix.extend_from_slice(user_id.as_bytes());
    prefix.extend_from_slice(&range_days.to_be_bytes());
    prefix
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(s: &str) -> AccountId {
        s.parse().unwrap()
    }

    #[test]
    fn user_key_length() {
        let user_id = UserId::generate();
        assert_eq!(user_key(&user_id).len(), 16);
    }

    #[test]
    fn user_by_account_roundtrip() {
        let user_id = UserId::generate();
        let acct = account("acct_1NvXY2");
        let key = user_by_account_key(&acct, &user_id);

        assert!(key.starts_with(&users_by_account_prefix(&acct)));
        assert_eq!(extract_user_id_from_account_key(&key), user_id);
    }

    #[test]
    fn account_prefix_does_not_match_longer_account() {
        let user_id = UserId::generate();
        let key = user_by_account_key(&account("acct_12"), &user_id);
        assert!(!key.starts_with(&users_by_account_prefix(&account("acct_1"))));
    }

    #[test]
    fn event_time_key_sorts_chronologically() {
        let early = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let late = DateTime::from_timestamp(1_700_000_060, 0).unwrap();
        assert!(event_by_time_key(early, "evt_a") < event_by_time_key(late, "evt_a"));
    }

    #[test]
    fn event_time_key_roundtrip() {
        let created = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let key = event_by_time_key(created, "evt_1ABCDEF");
        assert_eq!(extract_event_id_from_time_key(&key), "evt_1ABCDEF");
    }

    #[test]
    fn charges_key_format() {
        let user_id = UserId::generate();
        let acct = account("acct_7");
        let key = charges_key(&user_id, &acct, 30);

        assert_eq!(&key[..16], user_id.as_bytes());
        assert_eq!(&key[16..20], &30u32.to_be_bytes()[..]);
        assert_eq!(&key[20..], acct.as_bytes());
        assert!(key.starts_with(&user_prefix(&user_id)));
        assert!(key.starts_with(&user_range_prefix(&user_id, 30)));
        assert!(!key.starts_with(&user_range_prefix(&user_id, 7)));
    }

    #[test]
    fn summary_key_format() {
        let user_id = UserId::generate();
        let acct = account("acct_7");
        let key = summary_key(&user_id, &acct, 30, 2);

        assert_eq!(&key[16..20], &30u32.to_be_bytes()[..]);
        assert_eq!(&key[20..24], &2u32.to_be_bytes()[..]);
        assert_eq!(&key[24..], acct.as_bytes());
    }

    #[test]
    fn distinct_users_do_not_share_prefixes() {
        let a = UserId::generate();
        let b = UserId::generate();
        let key = subscriptions_key(&a, &account("acct_9"));
        assert!(!key.starts_with(&user_prefix(&b)));
    }
}
