//! Read-through cache layer.
//!
//! Each `get_or_fetch_*` follows the same discipline: a live (non-expired)
//! entry is returned without touching Stripe; otherwise the upstream
//! fetcher runs, the result is upserted with a fresh stamp, and the new
//! entry is returned. A miss that also fails to populate propagates the
//! error — consumers see fresh data or a surfaced failure, never silently
//! stale data past the TTL.

use chrono::{Duration, Utc};

use paywatch_core::{
    AccountId, CachedCharges, CachedSubscriptions, CachedSummary, PaymentSummary, UserId,
};
use paywatch_store::Store;

use crate::error::ApiError;
use crate::state::AppState;
use crate::stripe::{normalize_subscription, ListWindow, StripeClient};

/// Page size requested from upstream listings.
const FETCH_LIMIT: u32 = 100;

fn stripe_client(state: &AppState) -> Result<&StripeClient, ApiError> {
    state
        .stripe
        .as_deref()
        .ok_or_else(|| ApiError::Upstream("Stripe not configured".into()))
}

/// Serve the charges cache for `(user, account, range)`, fetching on miss
/// or expiry.
pub async fn get_or_fetch_charges(
    state: &AppState,
    user_id: UserId,
    account: &AccountId,
    range_days: u32,
) -> Result<CachedCharges, ApiError> {
    let now = Utc::now();

    if let Some(entry) = state.store.get_charges(&user_id, account, range_days)? {
        if !entry.is_expired(now) {
            tracing::debug!(user_id = %user_id, account = %account, range_days, "Charges cache hit");
            return Ok(entry);
        }
    }

    let window = ListWindow {
        limit: FETCH_LIMIT,
        created_gte: Some(now - Duration::days(i64::from(range_days))),
        created_lte: None,
    };
    let recent = stripe_client(state)?.recent_payments(account, &window).await?;

    let entry = CachedCharges {
        user_id,
        account: account.clone(),
        range_days,
        payments: recent.payments,
        source: recent.used_source,
        cached_at: now,
    };
    state.store.put_charges(&entry)?;

    tracing::info!(
        user_id = %user_id,
        account = %account,
        range_days,
        count = entry.payments.len(),
        source = ?entry.source,
        "Charges cache populated"
    );

    Ok(entry)
}

/// Serve the subscriptions cache for `(user, account)`, fetching on miss
/// or expiry.
pub async fn get_or_fetch_subscriptions(
    state: &AppState,
    user_id: UserId,
    account: &AccountId,
) -> Result<CachedSubscriptions, ApiError> {
    let now = Utc::now();

    if let Some(entry) = state.store.get_subscriptions(&user_id, account)? {
        if !entry.is_expired(now) {
            tracing::debug!(user_id = %user_id, account = %account, "Subscriptions cache hit");
            return Ok(entry);
        }
    }

    let list = stripe_client(state)?
        .list_subscriptions(account, FETCH_LIMIT)
        .await?;

    let entry = CachedSubscriptions {
        user_id,
        account: account.clone(),
        subscriptions: list.data.iter().map(normalize_subscription).collect(),
        cached_at: now,
    };
    state.store.put_subscriptions(&entry)?;

    tracing::info!(
        user_id = %user_id,
        account = %account,
        count = entry.subscriptions.len(),
        "Subscriptions cache populated"
    );

    Ok(entry)
}

/// Serve the summary cache for `(user, account, range, offset)`, fetching
/// and recomputing on miss or expiry.
///
/// The summarized window ends `day_offset` days in the past and extends
/// `range_days` back from there.
pub async fn get_or_fetch_summary(
    state: &AppState,
    user_id: UserId,
    account: &AccountId,
    range_days: u32,
    day_offset: u32,
) -> Result<CachedSummary, ApiError> {
    let now = Utc::now();

    if let Some(entry) = state
        .store
        .get_summary(&user_id, account, range_days, day_offset)?
    {
        if !entry.is_expired(now) {
            tracing::debug!(user_id = %user_id, account = %account, range_days, day_offset, "Summary cache hit");
            return Ok(entry);
        }
    }

    let window_end = now - Duration::days(i64::from(day_offset));
    let window = ListWindow {
        limit: FETCH_LIMIT,
        created_gte: Some(window_end - Duration::days(i64::from(range_days))),
        created_lte: (day_offset > 0).then_some(window_end),
    };
    let recent = stripe_client(state)?.recent_payments(account, &window).await?;

    let entry = CachedSummary {
        user_id,
        account: account.clone(),
        range_days,
        day_offset,
        summary: PaymentSummary::compute(range_days, day_offset, &recent.payments),
        cached_at: now,
    };
    state.store.put_summary(&entry)?;

    tracing::info!(
        user_id = %user_id,
        account = %account,
        range_days,
        day_offset,
        total = entry.summary.total_count,
        "Summary cache populated"
    );

    Ok(entry)
}
