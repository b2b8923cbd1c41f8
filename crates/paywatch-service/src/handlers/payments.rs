//! Cached payment, subscription, and summary reads.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use paywatch_core::{
    AccountId, NormalizedPayment, PaymentSource, PaymentSummary, SubscriptionInfo, UserId,
};
use paywatch_store::Store;

use crate::auth::AuthUser;
use crate::cache;
use crate::error::ApiError;
use crate::state::AppState;

/// Resolve the authed user's bound Connect account.
fn bound_account(state: &AppState, user_id: UserId) -> Result<AccountId, ApiError> {
    let user = state
        .store
        .get_user(&user_id)?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    user.stripe_account_id
        .ok_or_else(|| ApiError::NotFound("No Stripe account connected".into()))
}

/// Payments list query parameters.
#[derive(Debug, Deserialize)]
pub struct PaymentsQuery {
    /// Day-range bucket to serve (default: 30).
    #[serde(default = "default_range_days")]
    pub range_days: u32,
}

fn default_range_days() -> u32 {
    30
}

/// One payment in an API response.
#[derive(Debug, Serialize)]
pub struct PaymentView {
    /// Upstream object ID.
    pub id: String,
    /// Amount in minor units.
    pub amount_cents: i64,
    /// Amount formatted as dollars.
    pub amount_formatted: String,
    /// Currency code.
    pub currency: String,
    /// Upstream status.
    pub status: String,
    /// Whether the payment settled.
    pub paid: bool,
    /// Failure code, if any.
    pub failure_code: Option<String>,
    /// Failure message, if any.
    pub failure_message: Option<String>,
    /// Creation timestamp (ISO 8601).
    pub created_at: String,
}

impl From<&NormalizedPayment> for PaymentView {
    fn from(p: &NormalizedPayment) -> Self {
        Self {
            id: p.id.clone(),
            amount_cents: p.amount,
            amount_formatted: format!("${:.2}", p.amount as f64 / 100.0),
            currency: p.currency.clone(),
            status: p.status.clone(),
            paid: p.paid,
            failure_code: p.failure_code.clone(),
            failure_message: p.failure_message.clone(),
            created_at: p.created.to_rfc3339(),
        }
    }
}

/// Payments list response.
#[derive(Debug, Serialize)]
pub struct PaymentsResponse {
    /// The payments, newest first.
    pub payments: Vec<PaymentView>,
    /// Which upstream endpoint the data came from.
    pub source: PaymentSource,
    /// The range bucket served.
    pub range_days: u32,
    /// When the underlying cache entry was written (ISO 8601).
    pub cached_at: String,
}

/// List recent payments through the charges cache.
pub async fn list_payments(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<PaymentsQuery>,
) -> Result<Json<PaymentsResponse>, ApiError> {
    let account = bound_account(&state, auth.user_id)?;
    let entry =
        cache::get_or_fetch_charges(&state, auth.user_id, &account, query.range_days).await?;

    Ok(Json(PaymentsResponse {
        payments: entry.payments.iter().map(PaymentView::from).collect(),
        source: entry.source,
        range_days: entry.range_days,
        cached_at: entry.cached_at.to_rfc3339(),
    }))
}

/// Summary query parameters.
#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    /// Day-range bucket to summarize (default: 30).
    #[serde(default = "default_range_days")]
    pub range_days: u32,
    /// Days back the window ends (default: 0 = now).
    #[serde(default)]
    pub day_offset: u32,
}

/// Summary response.
#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    /// The payment summary.
    pub summary: PaymentSummary,
    /// When the underlying cache entry was written (ISO 8601).
    pub cached_at: String,
}

/// Serve the payment summary through the summary cache.
pub async fn payment_summary(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let account = bound_account(&state, auth.user_id)?;
    let entry = cache::get_or_fetch_summary(
        &state,
        auth.user_id,
        &account,
        query.range_days,
        query.day_offset,
    )
    .await?;

    Ok(Json(SummaryResponse {
        summary: entry.summary,
        cached_at: entry.cached_at.to_rfc3339(),
    }))
}

/// Subscriptions response.
#[derive(Debug, Serialize)]
pub struct SubscriptionsResponse {
    /// The subscriptions.
    pub subscriptions: Vec<SubscriptionInfo>,
    /// When the underlying cache entry was written (ISO 8601).
    pub cached_at: String,
}

/// List subscriptions through the subscriptions cache.
pub async fn list_subscriptions(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<SubscriptionsResponse>, ApiError> {
    let account = bound_account(&state, auth.user_id)?;
    let entry = cache::get_or_fetch_subscriptions(&state, auth.user_id, &account).await?;

    Ok(Json(SubscriptionsResponse {
        subscriptions: entry.subscriptions,
        cached_at: entry.cached_at.to_rfc3339(),
    }))
}
