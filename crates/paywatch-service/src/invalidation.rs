//! Cache invalidation fan-out.
//!
//! Three contracts: purge everything a user owns, purge for every user
//! bound to an account, and purge selected variants for one user. The
//! account-keyed path resolves the reverse index and issues per-user
//! deletions concurrently; a single user's failure fails the whole call
//! rather than being aggregated away. Callers decide whether that failure
//! blocks anything — the webhook path logs it and still acks, admin paths
//! report it.

use std::sync::Arc;

use futures::future::try_join_all;
use serde::Serialize;

use paywatch_core::{AccountId, UserId};
use paywatch_store::{RocksStore, Store, StoreError};

/// Per-variant deletion counts for one user.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct InvalidationReport {
    /// Charges-cache entries deleted.
    pub charges_deleted: usize,
    /// Subscriptions-cache entries deleted.
    pub subscriptions_deleted: usize,
    /// Summary-cache entries deleted.
    pub summary_deleted: usize,
}

impl InvalidationReport {
    /// Total entries deleted across variants.
    #[must_use]
    pub fn total(&self) -> usize {
        self.charges_deleted + self.subscriptions_deleted + self.summary_deleted
    }
}

/// Aggregate result of an account-keyed fan-out.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct AccountInvalidationReport {
    /// Number of users whose caches were purged.
    pub users_affected: usize,
    /// Total entries deleted across all users and variants.
    pub total_deleted: usize,
}

/// Which variants a selective invalidation touches.
#[derive(Debug, Clone, Copy)]
pub struct CacheSelector {
    /// Purge the charges cache.
    pub charges: bool,
    /// Purge the subscriptions cache.
    pub subscriptions: bool,
    /// Purge the summary cache.
    pub summary: bool,
    /// Narrow charges/summary purging to one range bucket.
    pub range_days: Option<u32>,
}

/// Delete all cache rows across the three variants for one user.
///
/// # Errors
///
/// Propagates the first storage error; nothing is swallowed.
pub async fn invalidate_for_user(
    store: Arc<RocksStore>,
    user_id: UserId,
    reason: &str,
) -> Result<InvalidationReport, StoreError> {
    let report = run_blocking(move || {
        Ok(InvalidationReport {
            charges_deleted: store.delete_charges_for_user(&user_id, None)?,
            subscriptions_deleted: store.delete_subscriptions_for_user(&user_id)?,
            summary_deleted: store.delete_summary_for_user(&user_id, None)?,
        })
    })
    .await?;

    tracing::info!(
        user_id = %user_id,
        reason,
        deleted = report.total(),
        "Invalidated user caches"
    );

    Ok(report)
}

/// Delete cache rows for every user bound to an account.
///
/// Per-user deletions run concurrently; the call returns once all have
/// completed. Zero bound users is a normal outcome, not an error — an
/// orphaned webhook for an unmapped account reports `{0, 0}`.
///
/// # Errors
///
/// Any single user's deletion failure surfaces as the overall failure.
pub async fn invalidate_for_account(
    store: Arc<RocksStore>,
    account: &AccountId,
    reason: &str,
) -> Result<AccountInvalidationReport, StoreError> {
    let users = {
        let store = Arc::clone(&store);
        let account = account.clone();
        run_blocking(move || store.find_users_by_account(&account)).await?
    };

    if users.is_empty() {
        tracing::debug!(account = %account, reason, "No users bound to account, nothing to invalidate");
        return Ok(AccountInvalidationReport::default());
    }

    let reports = try_join_all(
        users
            .iter()
            .map(|&user_id| invalidate_for_user(Arc::clone(&store), user_id, reason)),
    )
    .await?;

    let report = AccountInvalidationReport {
        users_affected: users.len(),
        total_deleted: reports.iter().map(InvalidationReport::total).sum(),
    };

    tracing::info!(
        account = %account,
        reason,
        users_affected = report.users_affected,
        total_deleted = report.total_deleted,
        "Invalidated account caches"
    );

    Ok(report)
}

/// Delete only the selected variants for one user, leaving the rest
/// untouched.
///
/// # Errors
///
/// Propagates the first storage error.
pub async fn invalidate_specific(
    store: Arc<RocksStore>,
    user_id: UserId,
    selector: CacheSelector,
    reason: &str,
) -> Result<InvalidationReport, StoreError> {
    let report = run_blocking(move || {
        let mut report = InvalidationReport::default();
        if selector.charges {
            report.charges_deleted = store.delete_charges_for_user(&user_id, selector.range_days)?;
        }
        if selector.subscriptions {
            report.subscriptions_deleted = store.delete_subscriptions_for_user(&user_id)?;
        }
        if selector.summary {
            report.summary_deleted = store.delete_summary_for_user(&user_id, selector.range_days)?;
        }
        Ok(report)
    })
    .await?;

    tracing::info!(
        user_id = %user_id,
        reason,
        deleted = report.total(),
        "Selective cache invalidation"
    );

    Ok(report)
}

/// Run a synchronous storage closure off the async executor.
async fn run_blocking<T, F>(f: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Database(format!("invalidation task failed: {e}")))?
}
