//! Connected-account binding handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use paywatch_core::{AccountId, UserRecord};
use paywatch_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::invalidation::invalidate_for_user;
use crate::state::AppState;

/// Account registration request.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    /// Stripe Connect account to bind immediately, if known.
    #[serde(default)]
    pub stripe_account_id: Option<String>,
    /// Contact email.
    #[serde(default)]
    pub email: Option<String>,
}

/// Account response.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    /// The local user ID.
    pub user_id: String,
    /// The bound Connect account, if any.
    pub stripe_account_id: Option<String>,
    /// Contact email, if any.
    pub email: Option<String>,
    /// Creation timestamp (ISO 8601).
    pub created_at: String,
    /// Last-update timestamp (ISO 8601).
    pub updated_at: String,
}

impl From<&UserRecord> for AccountResponse {
    fn from(user: &UserRecord) -> Self {
        Self {
            user_id: user.user_id.to_string(),
            stripe_account_id: user
                .stripe_account_id
                .as_ref()
                .map(|a| a.as_str().to_string()),
            email: user.email.clone(),
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.to_rfc3339(),
        }
    }
}

/// Register the authed user, optionally binding a Connect account.
///
/// Re-registration returns the existing record unchanged.
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<CreateAccountRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    if let Some(existing) = state.store.get_user(&auth.user_id)? {
        return Ok(Json(AccountResponse::from(&existing)));
    }

    let mut user = UserRecord::new(auth.user_id);
    user.email = body.email;

    if let Some(account_str) = body.stripe_account_id {
        let account = parse_account(&account_str)?;
        user.bind_account(account);
    }

    state.store.put_user(&user)?;

    tracing::info!(
        user_id = %user.user_id,
        account = ?user.stripe_account_id,
        "Account registered"
    );

    Ok(Json(AccountResponse::from(&user)))
}

/// Get the authed user's account binding.
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<AccountResponse>, ApiError> {
    let user = state
        .store
        .get_user(&auth.user_id)?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    Ok(Json(AccountResponse::from(&user)))
}

/// Account binding request.
#[derive(Debug, Deserialize)]
pub struct BindAccountRequest {
    /// The Connect account to bind.
    pub stripe_account_id: String,
}

/// Bind (or rebind) the authed user's Connect account.
///
/// Existing cache entries were fetched under the old account, so they are
/// purged here; unlike the webhook path, a purge failure is reported to
/// the caller.
pub async fn bind_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<BindAccountRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    let mut user = state
        .store
        .get_user(&auth.user_id)?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    let account = parse_account(&body.stripe_account_id)?;
    user.bind_account(account);
    state.store.put_user(&user)?;

    let report =
        invalidate_for_user(Arc::clone(&state.store), auth.user_id, "account_rebound").await?;

    tracing::info!(
        user_id = %user.user_id,
        account = ?user.stripe_account_id,
        invalidated = report.total(),
        "Account binding updated"
    );

    Ok(Json(AccountResponse::from(&user)))
}

fn parse_account(value: &str) -> Result<AccountId, ApiError> {
    value
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid account identifier: {value}")))
}
