//! Stripe API types.

use serde::Deserialize;

/// A reference that Stripe may render as a bare ID or, when expanded, as
/// the full object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Expandable<T> {
    /// The full object (expansion requested and honored).
    Object(Box<T>),
    /// Just the object's ID.
    Id(String),
}

impl<T> Expandable<T> {
    /// The expanded object, if present.
    pub fn object(&self) -> Option<&T> {
        match self {
            Self::Object(obj) => Some(obj),
            Self::Id(_) => None,
        }
    }
}

/// Stripe `PaymentIntent` object.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    /// Payment intent ID.
    pub id: String,
    /// Amount in minor units.
    #[serde(default)]
    pub amount: i64,
    /// Currency (e.g., "usd").
    #[serde(default)]
    pub currency: String,
    /// Status (succeeded, processing, canceled, ...).
    #[serde(default)]
    pub status: String,
    /// Customer ID.
    #[serde(default)]
    pub customer: Option<String>,
    /// Created timestamp (Unix).
    #[serde(default)]
    pub created: i64,
    /// The most recent error on the intent, if any.
    #[serde(default)]
    pub last_payment_error: Option<LastPaymentError>,
    /// Latest charge, expanded when the listing requests it.
    #[serde(default)]
    pub latest_charge: Option<Expandable<Charge>>,
    /// Embedded charge list (older API versions render this instead).
    #[serde(default)]
    pub charges: Option<StripeList<Charge>>,
}

impl PaymentIntent {
    /// The first nested charge, regardless of which API shape carried it.
    #[must_use]
    pub fn first_charge(&self) -> Option<&Charge> {
        self.latest_charge
            .as_ref()
            .and_then(Expandable::object)
            .or_else(|| self.charges.as_ref().and_then(|list| list.data.first()))
    }
}

/// Error details attached to a failed payment intent.
#[derive(Debug, Clone, Deserialize)]
pub struct LastPaymentError {
    /// Error code (e.g., `card_declined`).
    #[serde(default)]
    pub code: Option<String>,
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
}

/// Stripe `Charge` object.
#[derive(Debug, Clone, Deserialize)]
pub struct Charge {
    /// Charge ID.
    pub id: String,
    /// Amount in minor units.
    #[serde(default)]
    pub amount: i64,
    /// Currency (e.g., "usd").
    #[serde(default)]
    pub currency: String,
    /// Status (succeeded, pending, failed).
    #[serde(default)]
    pub status: String,
    /// Whether the charge settled.
    #[serde(default)]
    pub paid: bool,
    /// Customer ID.
    #[serde(default)]
    pub customer: Option<String>,
    /// Created timestamp (Unix).
    #[serde(default)]
    pub created: i64,
    /// Failure code, if the charge failed.
    #[serde(default)]
    pub failure_code: Option<String>,
    /// Failure message, if the charge failed.
    #[serde(default)]
    pub failure_message: Option<String>,
    /// Risk/decline assessment.
    #[serde(default)]
    pub outcome: Option<ChargeOutcome>,
    /// Owning payment intent ID, if any.
    #[serde(default)]
    pub payment_intent: Option<String>,
}

/// Outcome block on a charge.
#[derive(Debug, Clone, Deserialize)]
pub struct ChargeOutcome {
    /// Machine-readable reason (e.g., `insufficient_funds`).
    #[serde(default)]
    pub reason: Option<String>,
    /// Message suitable for showing a merchant.
    #[serde(default)]
    pub seller_message: Option<String>,
}

/// Stripe `Subscription` object.
#[derive(Debug, Clone, Deserialize)]
pub struct Subscription {
    /// Subscription ID.
    pub id: String,
    /// Status (active, past_due, canceled, ...).
    #[serde(default)]
    pub status: String,
    /// Customer ID.
    #[serde(default)]
    pub customer: Option<String>,
    /// End of the current billing period (Unix).
    #[serde(default)]
    pub current_period_end: Option<i64>,
    /// Whether the subscription cancels at period end.
    #[serde(default)]
    pub cancel_at_period_end: bool,
}

/// Stripe list response wrapper.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeList<T> {
    /// Object type (always "list").
    #[serde(default)]
    pub object: String,
    /// Data items.
    pub data: Vec<T>,
    /// Whether there are more items.
    #[serde(default)]
    pub has_more: bool,
    /// URL for the list endpoint.
    #[serde(default)]
    pub url: Option<String>,
}

/// Stripe API error response.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorResponse {
    /// Error details.
    pub error: StripeErrorDetail,
}

/// Stripe error detail.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorDetail {
    /// Error type.
    #[serde(rename = "type", default)]
    pub error_type: String,
    /// Error message.
    #[serde(default)]
    pub message: String,
    /// Error code.
    #[serde(default)]
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expandable_parses_bare_id() {
        let pi: PaymentIntent =
            serde_json::from_value(serde_json::json!({"id": "pi_1", "latest_charge": "ch_1"}))
                .unwrap();
        assert!(pi.first_charge().is_none());
    }

    #[test]
    fn expandable_parses_object() {
        let pi: PaymentIntent = serde_json::from_value(serde_json::json!({
            "id": "pi_1",
            "latest_charge": {"id": "ch_1", "amount": 500}
        }))
        .unwrap();
        assert_eq!(pi.first_charge().unwrap().id, "ch_1");
    }

    #[test]
    fn first_charge_falls_back_to_embedded_list() {
        let pi: PaymentIntent = serde_json::from_value(serde_json::json!({
            "id": "pi_1",
            "charges": {"object": "list", "data": [{"id": "ch_2"}], "has_more": false}
        }))
        .unwrap();
        assert_eq!(pi.first_charge().unwrap().id, "ch_2");
    }
}
