//! Stripe webhook ingestion.
//!
//! The pipeline is: verify signature (or warn in dev mode), parse the
//! envelope, persist to the event log idempotently, classify, and fan out
//! cache invalidation for the event's account. The response is not sent
//! until persistence (or its duplicate outcome) is known; invalidation
//! failure is logged and recorded on the event but never fails the ack,
//! because Stripe retries on non-2xx and persistence already succeeded.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use paywatch_core::{
    classify, related_object_id, AccountId, EventClass, EventStatus, WebhookEvent,
};
use paywatch_store::{RecordOutcome, Store};

use crate::crypto::verify_stripe_signature;
use crate::error::ApiError;
use crate::invalidation::invalidate_for_account;
use crate::state::AppState;

/// Stripe event envelope: the fields the pipeline extracts.
#[derive(Debug, Deserialize)]
pub struct StripeEnvelope {
    /// Event ID.
    pub id: String,
    /// Event type.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event creation time (Unix seconds).
    pub created: i64,
    /// Event data.
    pub data: EnvelopeData,
    /// Live/test mode flag.
    #[serde(default)]
    pub livemode: bool,
    /// Connect account the event is scoped to.
    #[serde(default)]
    pub account: Option<String>,
    /// API version the event was rendered with.
    #[serde(default)]
    pub api_version: Option<String>,
    /// Either `{"id": ...}` or a bare request-ID string on older API
    /// versions.
    #[serde(default)]
    pub request: Option<serde_json::Value>,
}

/// Event data container.
#[derive(Debug, Deserialize)]
pub struct EnvelopeData {
    /// The event object.
    pub object: serde_json::Value,
}

/// Webhook acknowledgment.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// Whether the webhook was accepted.
    pub received: bool,
}

/// Handle Stripe webhooks.
pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookResponse>, ApiError> {
    if let Some(secret) = &state.config.stripe_webhook_secret {
        let signature = headers
            .get("stripe-signature")
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::SignatureInvalid)?;

        verify_stripe_signature(&body, signature, secret).map_err(|e| {
            tracing::warn!(error = %e, "Invalid Stripe webhook signature");
            ApiError::SignatureInvalid
        })?;
    } else {
        // No webhook secret configured - skip verification (development mode)
        tracing::warn!("Stripe webhook secret not configured - skipping signature verification");
    }

    // Parse once; the stored payload is the same value the envelope was
    // read from.
    let payload: serde_json::Value =
        serde_json::from_str(&body).map_err(|e| ApiError::MalformedPayload(e.to_string()))?;
    let envelope: StripeEnvelope = serde_json::from_value(payload.clone())
        .map_err(|e| ApiError::MalformedPayload(e.to_string()))?;

    let event = build_event(&envelope, payload)?;

    tracing::info!(
        event_id = %event.event_id,
        event_type = %event.event_type,
        account = ?event.account,
        livemode = event.livemode,
        "Received Stripe webhook"
    );

    let outcome = state.store.record_event(&event)?;
    if outcome == RecordOutcome::Duplicate {
        tracing::info!(event_id = %event.event_id, "Event already recorded, redelivery tolerated");
    }

    // Routing still runs for duplicates: redelivery is expected and the
    // invalidation it triggers is an idempotent set of deletes.
    route_event(&state, &event, outcome).await;

    Ok(Json(WebhookResponse { received: true }))
}

/// Build the stored event from a parsed envelope.
fn build_event(
    envelope: &StripeEnvelope,
    payload: serde_json::Value,
) -> Result<WebhookEvent, ApiError> {
    let account = envelope
        .account
        .as_deref()
        .map(str::parse::<AccountId>)
        .transpose()
        .map_err(|_| ApiError::MalformedPayload("invalid account identifier".into()))?;

    let created = DateTime::from_timestamp(envelope.created, 0)
        .ok_or_else(|| ApiError::MalformedPayload("created timestamp out of range".into()))?;

    Ok(WebhookEvent {
        event_id: envelope.id.clone(),
        event_type: envelope.event_type.clone(),
        account,
        api_version: envelope.api_version.clone(),
        created,
        livemode: envelope.livemode,
        request_id: extract_request_id(envelope.request.as_ref()),
        related_object_id: related_object_id(&envelope.data.object),
        status: EventStatus::Received,
        payload,
        received_at: Utc::now(),
    })
}

/// Pull the request ID out of either envelope form.
fn extract_request_id(request: Option<&serde_json::Value>) -> Option<String> {
    let request = request?;
    request
        .as_str()
        .or_else(|| request.get("id").and_then(serde_json::Value::as_str))
        .map(String::from)
}

/// Classify and route a recorded event.
async fn route_event(state: &AppState, event: &WebhookEvent, outcome: RecordOutcome) {
    let Some(account) = &event.account else {
        tracing::debug!(event_id = %event.event_id, "Platform-level event, no account routing");
        finish_event(state, event, outcome, EventStatus::Processed);
        return;
    };

    let class = classify(&event.event_type);
    if class == EventClass::Unclassified {
        tracing::debug!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            "Unclassified event stored without invalidation"
        );
        finish_event(state, event, outcome, EventStatus::Processed);
        return;
    }

    match invalidate_for_account(Arc::clone(&state.store), account, &event.event_type).await {
        Ok(report) => {
            tracing::info!(
                event_id = %event.event_id,
                account = %account,
                class = ?class,
                users_affected = report.users_affected,
                total_deleted = report.total_deleted,
                "Webhook-triggered cache invalidation complete"
            );
            finish_event(state, event, outcome, EventStatus::Processed);
        }
        Err(e) => {
            // The event is already durable; failing the ack here would only
            // provoke a retry storm for an invalidation-only failure.
            tracing::error!(
                event_id = %event.event_id,
                account = %account,
                error = %e,
                "Cache invalidation failed after webhook persistence"
            );
            finish_event(state, event, outcome, EventStatus::Failed);
        }
    }
}

/// Record the event's final processing status. Redeliveries keep the
/// original row's status.
fn finish_event(state: &AppState, event: &WebhookEvent, outcome: RecordOutcome, status: EventStatus) {
    if outcome == RecordOutcome::Duplicate {
        return;
    }

    if let Err(e) = state.store.set_event_status(&event.event_id, status) {
        tracing::error!(
            event_id = %event.event_id,
            error = %e,
            "Failed to update event status"
        );
    }
}
