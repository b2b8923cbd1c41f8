//! Webhook event log endpoint.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use paywatch_core::{EventStatus, WebhookEvent};
use paywatch_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Upper bound on one page of the event log.
const MAX_EVENT_PAGE: usize = 200;

/// Event log query parameters.
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// Maximum number of events to return (default: 50).
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

/// One event in the log view. The stored payload is deliberately omitted;
/// it can be large and is for replay tooling, not browsing.
#[derive(Debug, Serialize)]
pub struct EventView {
    /// Upstream event ID.
    pub id: String,
    /// Event type.
    pub event_type: String,
    /// Connect account, if the event was account-scoped.
    pub account: Option<String>,
    /// Upstream creation timestamp (ISO 8601).
    pub created_at: String,
    /// Live/test mode flag.
    pub livemode: bool,
    /// Processing status.
    pub status: EventStatus,
    /// Related object ID, if one was extracted.
    pub related_object_id: Option<String>,
    /// Upstream request ID, if any.
    pub request_id: Option<String>,
    /// API version the event was rendered with.
    pub api_version: Option<String>,
}

impl From<&WebhookEvent> for EventView {
    fn from(event: &WebhookEvent) -> Self {
        Self {
            id: event.event_id.clone(),
            event_type: event.event_type.clone(),
            account: event.account.as_ref().map(|a| a.as_str().to_string()),
            created_at: event.created.to_rfc3339(),
            livemode: event.livemode,
            status: event.status,
            related_object_id: event.related_object_id.clone(),
            request_id: event.request_id.clone(),
            api_version: event.api_version.clone(),
        }
    }
}

/// Event log response.
#[derive(Debug, Serialize)]
pub struct EventsResponse {
    /// The events, newest first.
    pub events: Vec<EventView>,
}

/// List recent webhook events, newest first.
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Query(query): Query<EventsQuery>,
) -> Result<Json<EventsResponse>, ApiError> {
    let limit = query.limit.min(MAX_EVENT_PAGE);
    let events = state.store.list_recent_events(limit)?;

    Ok(Json(EventsResponse {
        events: events.iter().map(EventView::from).collect(),
    }))
}
