//! Stripe API client implementation.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;

use paywatch_core::{AccountId, PaymentSource};

use super::normalize::{normalize_charge, normalize_intent, RecentPayments};
use super::types::{Charge, PaymentIntent, StripeErrorResponse, StripeList, Subscription};

/// Error type for Stripe operations.
#[derive(Debug, thiserror::Error)]
pub enum StripeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stripe API returned an error.
    #[error("Stripe API error: {error_type} - {message}")]
    Api {
        /// Error type.
        error_type: String,
        /// Error message.
        message: String,
        /// Error code.
        code: Option<String>,
    },
}

/// Time window and page size for a listing call.
#[derive(Debug, Clone)]
pub struct ListWindow {
    /// Maximum number of results (1-100).
    pub limit: u32,
    /// Only objects created at or after this instant.
    pub created_gte: Option<DateTime<Utc>>,
    /// Only objects created at or before this instant.
    pub created_lte: Option<DateTime<Utc>>,
}

impl Default for ListWindow {
    fn default() -> Self {
        Self {
            limit: 100,
            created_gte: None,
            created_lte: None,
        }
    }
}

/// Stripe API client.
///
/// All listing calls are scoped to a Connect account via the
/// `Stripe-Account` header.
#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl StripeClient {
    /// Stripe API base URL.
    const BASE_URL: &'static str = "https://api.stripe.com/v1";

    /// Timeout applied to every upstream call.
    const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

    /// Create a new Stripe client.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Stripe secret API key (`sk_test_...` or `sk_live_...`)
    /// * `base_url` - Override of the API base URL (development/testing)
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>, base_url: Option<String>) -> Result<Self, StripeError> {
        let client = Client::builder()
            .timeout(Self::UPSTREAM_TIMEOUT)
            .build()
            .map_err(StripeError::Http)?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.unwrap_or_else(|| Self::BASE_URL.to_string()),
        })
    }

    /// Fetch recent payments for an account, normalized.
    ///
    /// Primary path is the payment-intents listing (nested charge
    /// expanded); if it errors *or* returns nothing, the charges listing
    /// is tried under the same filters. Only when both paths fail does an
    /// error propagate. There is no retry beyond the single fallback.
    pub async fn recent_payments(
        &self,
        account: &AccountId,
        window: &ListWindow,
    ) -> Result<RecentPayments, StripeError> {
        match self.list_payment_intents(account, window).await {
            Ok(list) if !list.data.is_empty() => Ok(RecentPayments {
                payments: list.data.iter().map(normalize_intent).collect(),
                used_source: PaymentSource::PaymentIntents,
            }),
            Ok(_) => {
                tracing::debug!(account = %account, "No payment intents, falling back to charges");
                self.charges_fallback(account, window).await
            }
            Err(e) => {
                tracing::warn!(account = %account, error = %e, "Payment intents listing failed, falling back to charges");
                self.charges_fallback(account, window).await
            }
        }
    }

    async fn charges_fallback(
        &self,
        account: &AccountId,
        window: &ListWindow,
    ) -> Result<RecentPayments, StripeError> {
        let list = self.list_charges(account, window).await?;
        Ok(RecentPayments {
            payments: list.data.iter().map(normalize_charge).collect(),
            used_source: PaymentSource::Charges,
        })
    }

    /// List payment intents for an account, nested charge expanded.
    pub async fn list_payment_intents(
        &self,
        account: &AccountId,
        window: &ListWindow,
    ) -> Result<StripeList<PaymentIntent>, StripeError> {
        let mut query = window_query(window);
        query.push(("expand[]", "data.latest_charge".to_string()));

        let response = self
            .client
            .get(format!("{}/payment_intents", self.base_url))
            .basic_auth(&self.api_key, Option::<&str>::None)
            .header("Stripe-Account", account.as_str())
            .query(&query)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// List charges for an account.
    pub async fn list_charges(
        &self,
        account: &AccountId,
        window: &ListWindow,
    ) -> Result<StripeList<Charge>, StripeError> {
        let query = window_query(window);

        let response = self
            .client
            .get(format!("{}/charges", self.base_url))
            .basic_auth(&self.api_key, Option::<&str>::None)
            .header("Stripe-Account", account.as_str())
            .query(&query)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// List subscriptions for an account, all statuses.
    pub async fn list_subscriptions(
        &self,
        account: &AccountId,
        limit: u32,
    ) -> Result<StripeList<Subscription>, StripeError> {
        let response = self
            .client
            .get(format!("{}/subscriptions", self.base_url))
            .basic_auth(&self.api_key, Option::<&str>::None)
            .header("Stripe-Account", account.as_str())
            .query(&[
                ("limit", clamp_limit(limit).to_string()),
                ("status", "all".to_string()),
            ])
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, StripeError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        // Try to parse error response
        let error_body: Result<StripeErrorResponse, _> = response.json().await;

        match error_body {
            Ok(stripe_error) => Err(StripeError::Api {
                error_type: stripe_error.error.error_type,
                message: stripe_error.error.message,
                code: stripe_error.error.code,
            }),
            Err(_) => Err(StripeError::Api {
                error_type: "unknown".to_string(),
                message: format!("HTTP {status}"),
                code: None,
            }),
        }
    }
}

fn clamp_limit(limit: u32) -> u32 {
    limit.clamp(1, 100)
}

fn window_query(window: &ListWindow) -> Vec<(&'static str, String)> {
    let mut query = vec![("limit", clamp_limit(window.limit).to_string())];
    if let Some(gte) = window.created_gte {
        query.push(("created[gte]", gte.timestamp().to_string()));
    }
    if let Some(lte) = window.created_lte {
        query.push(("created[lte]", lte.timestamp().to_string()));
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn account() -> AccountId {
        "acct_test1".parse().unwrap()
    }

    fn client_for(server: &MockServer) -> StripeClient {
        StripeClient::new("sk_test_xxx", Some(server.uri())).unwrap()
    }

    fn list_body(data: serde_json::Value) -> serde_json::Value {
        json!({"object": "list", "data": data, "has_more": false})
    }

    #[tokio::test]
    async fn primary_path_serves_payment_intents() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/payment_intents"))
            .and(header("Stripe-Account", "acct_test1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(list_body(json!([
                {"id": "pi_1", "amount": 1000, "currency": "usd", "status": "succeeded"}
            ]))))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client
            .recent_payments(&account(), &ListWindow::default())
            .await
            .unwrap();

        assert_eq!(result.used_source, PaymentSource::PaymentIntents);
        assert_eq!(result.payments.len(), 1);
        assert!(result.payments[0].paid);
    }

    #[tokio::test]
    async fn empty_primary_falls_back_to_charges() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/payment_intents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(list_body(json!([]))))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/charges"))
            .respond_with(ResponseTemplate::new(200).set_body_json(list_body(json!([
                {"id": "ch_1", "amount": 700, "currency": "usd", "status": "succeeded", "paid": true}
            ]))))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client
            .recent_payments(&account(), &ListWindow::default())
            .await
            .unwrap();

        assert_eq!(result.used_source, PaymentSource::Charges);
        assert_eq!(result.payments[0].id, "ch_1");
    }

    #[tokio::test]
    async fn failing_primary_falls_back_to_charges() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/payment_intents"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/charges"))
            .respond_with(ResponseTemplate::new(200).set_body_json(list_body(json!([
                {"id": "ch_9", "status": "failed", "failure_code": "card_declined"}
            ]))))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client
            .recent_payments(&account(), &ListWindow::default())
            .await
            .unwrap();

        assert_eq!(result.used_source, PaymentSource::Charges);
        assert_eq!(result.payments[0].failure_code.as_deref(), Some("card_declined"));
    }

    #[tokio::test]
    async fn both_paths_failing_is_a_hard_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/payment_intents"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/charges"))
            .respond_with(ResponseTemplate::new(502).set_body_json(json!({
                "error": {"type": "api_error", "message": "upstream down"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .recent_payments(&account(), &ListWindow::default())
            .await
            .unwrap_err();

        assert!(matches!(err, StripeError::Api { .. }));
    }

    #[tokio::test]
    async fn window_filters_are_forwarded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/payment_intents"))
            .and(query_param("limit", "50"))
            .and(query_param("created[gte]", "1700000000"))
            .and(query_param("created[lte]", "1700003600"))
            .and(query_param("expand[]", "data.latest_charge"))
            .respond_with(ResponseTemplate::new(200).set_body_json(list_body(json!([
                {"id": "pi_1", "status": "succeeded"}
            ]))))
            .expect(1)
            .mount(&server)
            .await;

        let window = ListWindow {
            limit: 50,
            created_gte: DateTime::from_timestamp(1_700_000_000, 0),
            created_lte: DateTime::from_timestamp(1_700_003_600, 0),
        };

        let client = client_for(&server);
        client.recent_payments(&account(), &window).await.unwrap();
    }

    #[tokio::test]
    async fn subscriptions_listing_decodes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/subscriptions"))
            .and(query_param("status", "all"))
            .respond_with(ResponseTemplate::new(200).set_body_json(list_body(json!([
                {"id": "sub_1", "status": "active", "current_period_end": 1700003600}
            ]))))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let list = client.list_subscriptions(&account(), 10).await.unwrap();
        assert_eq!(list.data[0].id, "sub_1");
    }
}
