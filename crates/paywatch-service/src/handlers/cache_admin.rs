//! Selective cache invalidation endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::invalidation::{invalidate_specific, CacheSelector, InvalidationReport};
use crate::state::AppState;

/// Selective invalidation request.
#[derive(Debug, Deserialize)]
pub struct InvalidateRequest {
    /// Purge the charges cache.
    #[serde(default)]
    pub charges: bool,
    /// Purge the subscriptions cache.
    #[serde(default)]
    pub subscriptions: bool,
    /// Purge the summary cache.
    #[serde(default)]
    pub summary: bool,
    /// Narrow charges/summary purging to one range bucket.
    #[serde(default)]
    pub range_days: Option<u32>,
}

/// Purge selected cache variants for the authed user.
///
/// Unlike the webhook fan-out, failures here propagate to the caller.
pub async fn invalidate_cache(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<InvalidateRequest>,
) -> Result<Json<InvalidationReport>, ApiError> {
    if !(body.charges || body.subscriptions || body.summary) {
        return Err(ApiError::BadRequest("No cache variant selected".into()));
    }

    let selector = CacheSelector {
        charges: body.charges,
        subscriptions: body.subscriptions,
        summary: body.summary,
        range_days: body.range_days,
    };

    let report = invalidate_specific(
        Arc::clone(&state.store),
        auth.user_id,
        selector,
        "admin_request",
    )
    .await?;

    Ok(Json(report))
}
