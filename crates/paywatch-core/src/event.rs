//! Webhook event types for paywatch.
//!
//! This module defines the normalized webhook event stored in the event log
//! and the classification of Stripe's open-ended event-type taxonomy into
//! the closed set of classes the invalidation pipeline routes on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::AccountId;

/// Processing status of a stored webhook event.
///
/// Events are created as `Received` and transition at most once to
/// `Processed` or `Failed`. The status is audit state; idempotency is
/// enforced by the uniqueness of the event ID, not by status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Persisted, routing not yet finished.
    Received,
    /// Routing (including any invalidation fan-out) completed.
    Processed,
    /// Persisted, but downstream handling failed.
    Failed,
}

/// A normalized Stripe webhook event.
///
/// The full original payload is retained verbatim for replay and audit;
/// every other field is extracted from the envelope at ingestion time.
/// Immutable once stored, except for [`EventStatus`] transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Upstream event ID (`evt_...`). Unique; the idempotency key.
    pub event_id: String,

    /// Upstream event type (e.g. `charge.succeeded`). Open-ended.
    pub event_type: String,

    /// Connect account the event is scoped to. `None` for platform-level
    /// events.
    pub account: Option<AccountId>,

    /// Stripe API version the event was rendered with.
    pub api_version: Option<String>,

    /// Event creation time reported by Stripe (not ingestion time).
    pub created: DateTime<Utc>,

    /// Whether the event was generated in live mode.
    pub livemode: bool,

    /// Upstream request ID that caused the event, if any.
    pub request_id: Option<String>,

    /// Identifier of the object the event concerns, extracted
    /// heuristically. Used for cross-referencing only; never enforced as
    /// a foreign key.
    pub related_object_id: Option<String>,

    /// Processing status.
    pub status: EventStatus,

    /// The full original event payload, stored verbatim.
    pub payload: serde_json::Value,

    /// When this service ingested the event.
    pub received_at: DateTime<Utc>,
}

/// Classification of an event type for cache-invalidation routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventClass {
    /// Payment intents, charges, and checkout sessions: anything that can
    /// move a payment's state.
    Transactional,
    /// Subscription lifecycle and invoice payment events.
    SubscriptionRelated,
    /// Everything else: stored for audit, no invalidation.
    Unclassified,
}

/// Classify an upstream event type into a routing class.
///
/// The taxonomy is open-ended upstream, so unknown types deliberately land
/// in [`EventClass::Unclassified`] via the default arm rather than any
/// implicit fallthrough. `charge.updated` is intentionally transactional:
/// breadth of invalidation is preferred over serving stale payment data.
#[must_use]
pub fn classify(event_type: &str) -> EventClass {
    match event_type {
        "payment_intent.succeeded"
        | "payment_intent.payment_failed"
        | "payment_intent.canceled"
        | "charge.succeeded"
        | "charge.failed"
        | "charge.refunded"
        | "charge.updated"
        | "charge.expired"
        | "checkout.session.completed"
        | "checkout.session.expired"
        | "checkout.session.async_payment_succeeded"
        | "checkout.session.async_payment_failed" => EventClass::Transactional,

        "customer.subscription.created"
        | "customer.subscription.updated"
        | "customer.subscription.deleted"
        | "customer.subscription.trial_will_end"
        | "invoice.payment_succeeded"
        | "invoice.payment_failed" => EventClass::SubscriptionRelated,

        _ => EventClass::Unclassified,
    }
}

/// Extract the related-object identifier from an event's `data.object`.
///
/// Precedence: the object's own `id`, then its `payment_intent` reference,
/// then nothing.
#[must_use]
pub fn related_object_id(object: &serde_json::Value) -> Option<String> {
    object
        .get("id")
        .and_then(serde_json::Value::as_str)
        .or_else(|| object.get("payment_intent").and_then(serde_json::Value::as_str))
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn transactional_types() {
        for ty in [
            "payment_intent.succeeded",
            "charge.failed",
            "charge.refunded",
            "charge.updated",
            "checkout.session.completed",
            "checkout.session.async_payment_failed",
        ] {
            assert_eq!(classify(ty), EventClass::Transactional, "{ty}");
        }
    }

    #[test]
    fn subscription_types() {
        for ty in [
            "customer.subscription.created",
            "customer.subscription.deleted",
            "customer.subscription.trial_will_end",
            "invoice.payment_succeeded",
            "invoice.payment_failed",
        ] {
            assert_eq!(classify(ty), EventClass::SubscriptionRelated, "{ty}");
        }
    }

    #[test]
    fn unknown_types_are_unclassified() {
        assert_eq!(classify("account.updated"), EventClass::Unclassified);
        assert_eq!(classify("payout.paid"), EventClass::Unclassified);
        assert_eq!(classify(""), EventClass::Unclassified);
    }

    #[test]
    fn related_object_prefers_own_id() {
        let obj = json!({"id": "ch_123", "payment_intent": "pi_456"});
        assert_eq!(related_object_id(&obj).as_deref(), Some("ch_123"));
    }

    #[test]
    fn related_object_falls_back_to_payment_intent() {
        let obj = json!({"payment_intent": "pi_456", "amount": 100});
        assert_eq!(related_object_id(&obj).as_deref(), Some("pi_456"));
    }

    #[test]
    fn related_object_can_be_absent() {
        let obj = json!({"amount": 100});
        assert_eq!(related_object_id(&obj), None);
    }
}
