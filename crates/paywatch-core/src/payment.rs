//! Normalized payment types.
//!
//! The upstream fetcher can serve payment data from two Stripe endpoints
//! with different shapes. Everything downstream of the fetcher (caches,
//! summaries, API responses) consumes only the types in this module, so
//! consumers never learn which endpoint produced the data.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which upstream listing produced a batch of payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentSource {
    /// Primary path: `/v1/payment_intents`.
    PaymentIntents,
    /// Fallback path: `/v1/charges`.
    Charges,
}

/// A single payment, normalized from either upstream shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedPayment {
    /// Upstream object ID (`pi_...` or `ch_...`).
    pub id: String,

    /// Which endpoint the record came from.
    pub source: PaymentSource,

    /// Amount in minor units.
    pub amount: i64,

    /// ISO currency code, lowercase as Stripe reports it.
    pub currency: String,

    /// Creation time reported upstream.
    pub created: DateTime<Utc>,

    /// Upstream status string (`succeeded`, `requires_payment_method`, ...).
    pub status: String,

    /// Whether the payment actually settled.
    pub paid: bool,

    /// Stripe customer ID, if attached.
    pub customer: Option<String>,

    /// Failure code, if the payment failed.
    pub failure_code: Option<String>,

    /// Human-readable failure message, if the payment failed.
    pub failure_message: Option<String>,
}

/// A subscription, reduced to the fields the monitoring views need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionInfo {
    /// Upstream subscription ID (`sub_...`).
    pub id: String,

    /// Upstream status (`active`, `past_due`, `canceled`, ...).
    pub status: String,

    /// Stripe customer ID.
    pub customer: Option<String>,

    /// End of the current billing period.
    pub current_period_end: Option<DateTime<Utc>>,

    /// Whether the subscription is scheduled to cancel at period end.
    pub cancel_at_period_end: bool,
}

/// Aggregate view over a window of normalized payments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSummary {
    /// Width of the window in days.
    pub range_days: u32,

    /// How many days back the window ends (0 = ends now).
    pub day_offset: u32,

    /// Total payments in the window.
    pub total_count: usize,

    /// Payments that settled.
    pub succeeded_count: usize,

    /// Payments with a terminal failure.
    pub failed_count: usize,

    /// Sum of all amounts in minor units, settled or not.
    pub gross_amount: i64,

    /// Sum of settled amounts in minor units.
    pub succeeded_amount: i64,

    /// Most frequent currency in the window, if any payments exist.
    pub currency: Option<String>,
}

impl PaymentSummary {
    /// Build a summary over a batch of normalized payments.
    ///
    /// A payment counts as failed when it did not settle and carries a
    /// failure code or a terminal `canceled` status; payments still in
    /// flight count toward totals only.
    #[must_use]
    pub fn compute(range_days: u32, day_offset: u32, payments: &[NormalizedPayment]) -> Self {
        let mut succeeded_count = 0;
        let mut failed_count = 0;
        let mut gross_amount = 0i64;
        let mut succeeded_amount = 0i64;
        let mut currencies: HashMap<&str, usize> = HashMap::new();

        for p in payments {
            gross_amount += p.amount;
            *currencies.entry(p.currency.as_str()).or_default() += 1;

            if p.paid {
                succeeded_count += 1;
                succeeded_amount += p.amount;
            } else if p.failure_code.is_some() || p.status == "canceled" {
                failed_count += 1;
            }
        }

        let currency = currencies
            .into_iter()
            .max_by_key(|&(_, n)| n)
            .map(|(c, _)| c.to_string());

        Self {
            range_days,
            day_offset,
            total_count: payments.len(),
            succeeded_count,
            failed_count,
            gross_amount,
            succeeded_amount,
            currency,
        }
    }
}
