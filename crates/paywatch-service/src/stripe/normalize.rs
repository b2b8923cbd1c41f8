//! Normalization of upstream payment shapes.
//!
//! Failure fields follow a first-available precedence across several
//! places Stripe may report them. Each step is a named extractor and the
//! chain is an ordered slice, so the precedence is auditable and each
//! step testable on its own — rather than a one-off expression of chained
//! fallbacks.

use chrono::{DateTime, Utc};

use paywatch_core::{NormalizedPayment, PaymentSource, SubscriptionInfo};

use super::types::{Charge, PaymentIntent, Subscription};

/// A batch of normalized payments plus the endpoint that produced it.
#[derive(Debug, Clone)]
pub struct RecentPayments {
    /// The normalized payments, as returned upstream (newest first).
    pub payments: Vec<NormalizedPayment>,
    /// Which endpoint served the batch.
    pub used_source: PaymentSource,
}

/// Failure fields pulled out of an upstream object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureDetail {
    /// Machine-readable failure code.
    pub code: Option<String>,
    /// Human-readable failure message.
    pub message: Option<String>,
}

impl FailureDetail {
    fn is_empty(&self) -> bool {
        self.code.is_none() && self.message.is_none()
    }

    fn from_parts(code: Option<&str>, message: Option<&str>) -> Option<Self> {
        let detail = Self {
            code: code.map(String::from),
            message: message.map(String::from),
        };
        (!detail.is_empty()).then_some(detail)
    }
}

type IntentExtractor = fn(&PaymentIntent) -> Option<FailureDetail>;
type ChargeExtractor = fn(&Charge) -> Option<FailureDetail>;

/// Failure precedence for payment intents: the intent's own last error,
/// then the nested charge's failure fields, then the charge's outcome.
const INTENT_FAILURE_CHAIN: &[IntentExtractor] = &[
    intent_last_payment_error,
    intent_charge_failure,
    intent_charge_outcome,
];

/// Failure precedence for charges: the charge's own failure fields, then
/// its outcome.
const CHARGE_FAILURE_CHAIN: &[ChargeExtractor] = &[charge_failure, charge_outcome];

fn intent_last_payment_error(pi: &PaymentIntent) -> Option<FailureDetail> {
    let err = pi.last_payment_error.as_ref()?;
    FailureDetail::from_parts(err.code.as_deref(), err.message.as_deref())
}

fn intent_charge_failure(pi: &PaymentIntent) -> Option<FailureDetail> {
    charge_failure(pi.first_charge()?)
}

fn intent_charge_outcome(pi: &PaymentIntent) -> Option<FailureDetail> {
    charge_outcome(pi.first_charge()?)
}

fn charge_failure(charge: &Charge) -> Option<FailureDetail> {
    FailureDetail::from_parts(charge.failure_code.as_deref(), charge.failure_message.as_deref())
}

fn charge_outcome(charge: &Charge) -> Option<FailureDetail> {
    let outcome = charge.outcome.as_ref()?;
    FailureDetail::from_parts(outcome.reason.as_deref(), outcome.seller_message.as_deref())
}

/// Run an extractor chain, stopping at the first step that yields detail.
fn first_of<T>(chain: &[fn(&T) -> Option<FailureDetail>], value: &T) -> FailureDetail {
    chain
        .iter()
        .find_map(|extract| extract(value))
        .unwrap_or_default()
}

fn timestamp(epoch_secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(epoch_secs, 0).unwrap_or_default()
}

/// Normalize a payment intent into the source-agnostic payment shape.
#[must_use]
pub fn normalize_intent(pi: &PaymentIntent) -> NormalizedPayment {
    let failure = first_of(INTENT_FAILURE_CHAIN, pi);

    NormalizedPayment {
        id: pi.id.clone(),
        source: PaymentSource::PaymentIntents,
        amount: pi.amount,
        currency: pi.currency.clone(),
        created: timestamp(pi.created),
        status: pi.status.clone(),
        paid: pi.status == "succeeded",
        customer: pi.customer.clone(),
        failure_code: failure.code,
        failure_message: failure.message,
    }
}

/// Normalize a charge into the source-agnostic payment shape.
#[must_use]
pub fn normalize_charge(charge: &Charge) -> NormalizedPayment {
    let failure = first_of(CHARGE_FAILURE_CHAIN, charge);

    NormalizedPayment {
        id: charge.id.clone(),
        source: PaymentSource::Charges,
        amount: charge.amount,
        currency: charge.currency.clone(),
        created: timestamp(charge.created),
        status: charge.status.clone(),
        paid: charge.paid && charge.status == "succeeded",
        customer: charge.customer.clone(),
        failure_code: failure.code,
        failure_message: failure.message,
    }
}

/// Reduce a subscription to the fields the monitoring views use.
#[must_use]
pub fn normalize_subscription(sub: &Subscription) -> SubscriptionInfo {
    SubscriptionInfo {
        id: sub.id.clone(),
        status: sub.status.clone(),
        customer: sub.customer.clone(),
        current_period_end: sub.current_period_end.and_then(|t| DateTime::from_timestamp(t, 0)),
        cancel_at_period_end: sub.cancel_at_period_end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn intent(value: serde_json::Value) -> PaymentIntent {
        serde_json::from_value(value).unwrap()
    }

    fn charge(value: serde_json::Value) -> Charge {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn intent_failure_prefers_last_payment_error() {
        let pi = intent(json!({
            "id": "pi_1",
            "status": "requires_payment_method",
            "last_payment_error": {"code": "card_declined", "message": "Declined"},
            "latest_charge": {"id": "ch_1", "failure_code": "other_code"}
        }));
        let normalized = normalize_intent(&pi);
        assert_eq!(normalized.failure_code.as_deref(), Some("card_declined"));
        assert_eq!(normalized.failure_message.as_deref(), Some("Declined"));
    }

    #[test]
    fn intent_failure_falls_back_to_nested_charge() {
        let pi = intent(json!({
            "id": "pi_1",
            "status": "requires_payment_method",
            "latest_charge": {
                "id": "ch_1",
                "failure_code": "insufficient_funds",
                "failure_message": "Your card has insufficient funds."
            }
        }));
        let normalized = normalize_intent(&pi);
        assert_eq!(normalized.failure_code.as_deref(), Some("insufficient_funds"));
    }

    #[test]
    fn intent_failure_falls_back_to_charge_outcome() {
        let pi = intent(json!({
            "id": "pi_1",
            "status": "requires_payment_method",
            "latest_charge": {
                "id": "ch_1",
                "outcome": {"reason": "highest_risk_level", "seller_message": "Blocked"}
            }
        }));
        let normalized = normalize_intent(&pi);
        assert_eq!(normalized.failure_code.as_deref(), Some("highest_risk_level"));
        assert_eq!(normalized.failure_message.as_deref(), Some("Blocked"));
    }

    #[test]
    fn empty_last_payment_error_does_not_stop_the_chain() {
        let pi = intent(json!({
            "id": "pi_1",
            "status": "requires_payment_method",
            "last_payment_error": {},
            "latest_charge": {"id": "ch_1", "failure_code": "expired_card"}
        }));
        assert_eq!(
            normalize_intent(&pi).failure_code.as_deref(),
            Some("expired_card")
        );
    }

    #[test]
    fn succeeded_intent_is_paid_with_no_failure() {
        let pi = intent(json!({"id": "pi_1", "status": "succeeded", "amount": 2500}));
        let normalized = normalize_intent(&pi);
        assert!(normalized.paid);
        assert_eq!(normalized.failure_code, None);
        assert_eq!(normalized.amount, 2500);
    }

    #[test]
    fn charge_paid_requires_both_flags() {
        let settled = charge(json!({"id": "ch_1", "paid": true, "status": "succeeded"}));
        assert!(normalize_charge(&settled).paid);

        let pending = charge(json!({"id": "ch_2", "paid": true, "status": "pending"}));
        assert!(!normalize_charge(&pending).paid);

        let unpaid = charge(json!({"id": "ch_3", "paid": false, "status": "succeeded"}));
        assert!(!normalize_charge(&unpaid).paid);
    }

    #[test]
    fn charge_failure_falls_back_to_outcome() {
        let ch = charge(json!({
            "id": "ch_1",
            "status": "failed",
            "outcome": {"reason": "insufficient_funds", "seller_message": "NSF"}
        }));
        let normalized = normalize_charge(&ch);
        assert_eq!(normalized.failure_code.as_deref(), Some("insufficient_funds"));
    }

    #[test]
    fn both_sources_converge_on_one_shape() {
        let from_intent = normalize_intent(&intent(json!({
            "id": "pi_1", "status": "succeeded", "amount": 100, "currency": "usd",
            "created": 1_700_000_000, "customer": "cus_1"
        })));
        let from_charge = normalize_charge(&charge(json!({
            "id": "ch_1", "status": "succeeded", "paid": true, "amount": 100,
            "currency": "usd", "created": 1_700_000_000, "customer": "cus_1"
        })));

        assert_eq!(from_intent.amount, from_charge.amount);
        assert_eq!(from_intent.paid, from_charge.paid);
        assert_eq!(from_intent.currency, from_charge.currency);
        assert_eq!(from_intent.created, from_charge.created);
    }
}
