//! Common test utilities for paywatch integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use chrono::{DateTime, Utc};
use tempfile::TempDir;

use paywatch_core::{
    AccountId, CachedCharges, CachedSubscriptions, CachedSummary, NormalizedPayment,
    PaymentSource, PaymentSummary, UserId, UserRecord,
};
use paywatch_service::{create_router, AppState, ServiceConfig};
use paywatch_store::{RocksStore, Store};

/// Knobs a test can turn before the harness is built.
#[derive(Default)]
pub struct HarnessOptions {
    /// Webhook signing secret; `None` runs the unsigned development mode.
    pub webhook_secret: Option<String>,
    /// Stripe API base URL (a wiremock server in tests). Setting this also
    /// configures an API key so the client is constructed.
    pub stripe_api_url: Option<String>,
}

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Direct handle to the store backing the server.
    pub store: Arc<RocksStore>,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: TempDir,
    /// A test user ID for authenticated requests.
    pub test_user_id: UserId,
}

impl TestHarness {
    /// Create a new test harness with a fresh database and default options.
    pub fn new() -> Self {
        Self::with_options(HarnessOptions::default())
    }

    /// Create a new test harness with explicit options.
    pub fn with_options(options: HarnessOptions) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = Arc::new(RocksStore::open(temp_dir.path()).expect("Failed to open store"));

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: temp_dir.path().to_string_lossy().to_string(),
            auth_jwt_secret: None,
            stripe_api_key: options.stripe_api_url.as_ref().map(|_| "sk_test_harness".into()),
            stripe_api_url: options.stripe_api_url,
            stripe_webhook_secret: options.webhook_secret,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            reaper_interval_seconds: 600,
        };

        let state = AppState::new(Arc::clone(&store), config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");
        let test_user_id = UserId::generate();

        Self {
            server,
            store,
            _temp_dir: temp_dir,
            test_user_id,
        }
    }

    /// Get the authorization header for the default test user.
    pub fn user_auth_header(&self) -> String {
        auth_header(&self.test_user_id)
    }

    /// Create a user bound to the given account, directly in the store.
    pub fn bind_user(&self, user_id: UserId, account: &str) {
        let mut user = UserRecord::new(user_id);
        user.bind_account(account.parse().expect("valid account id"));
        self.store.put_user(&user).expect("put user");
    }

    /// Seed one entry in every cache variant for a user, stamped `cached_at`.
    pub fn seed_caches(&self, user_id: UserId, account: &str, cached_at: DateTime<Utc>) {
        self.store
            .put_charges(&charges_entry(user_id, account, 30, cached_at))
            .expect("seed charges");
        self.store
            .put_subscriptions(&CachedSubscriptions {
                user_id,
                account: account_id(account),
                subscriptions: vec![],
                cached_at,
            })
            .expect("seed subscriptions");
        self.store
            .put_summary(&CachedSummary {
                user_id,
                account: account_id(account),
                range_days: 30,
                day_offset: 0,
                summary: PaymentSummary::compute(30, 0, &[]),
                cached_at,
            })
            .expect("seed summary");
    }

    /// Count live entries across all cache variants for a user.
    pub fn cache_count(&self, user_id: UserId, account: &str) -> usize {
        let account = account_id(account);
        usize::from(self.store.get_charges(&user_id, &account, 30).unwrap().is_some())
            + usize::from(self.store.get_subscriptions(&user_id, &account).unwrap().is_some())
            + usize::from(self.store.get_summary(&user_id, &account, 30, 0).unwrap().is_some())
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Get the authorization header for an arbitrary user.
pub fn auth_header(user_id: &UserId) -> String {
    format!("Bearer test-token:{user_id}")
}

/// Parse an account ID, panicking on invalid test input.
pub fn account_id(account: &str) -> AccountId {
    account.parse().expect("valid account id")
}

/// Build a charges-cache entry with one payment.
pub fn charges_entry(
    user_id: UserId,
    account: &str,
    range_days: u32,
    cached_at: DateTime<Utc>,
) -> CachedCharges {
    CachedCharges {
        user_id,
        account: account_id(account),
        range_days,
        payments: vec![NormalizedPayment {
            id: "pi_seeded".into(),
            source: PaymentSource::PaymentIntents,
            amount: 4200,
            currency: "usd".into(),
            created: cached_at,
            status: "succeeded".into(),
            paid: true,
            customer: Some("cus_seed".into()),
            failure_code: None,
            failure_message: None,
        }],
        source: PaymentSource::PaymentIntents,
        cached_at,
    }
}

/// Build a raw Stripe event body.
pub fn stripe_event_body(event_id: &str, event_type: &str, account: Option<&str>) -> String {
    let mut event = serde_json::json!({
        "id": event_id,
        "object": "event",
        "type": event_type,
        "created": 1_700_000_000,
        "livemode": false,
        "api_version": "2024-06-20",
        "request": {"id": "req_test", "idempotency_key": null},
        "data": {"object": {"id": "ch_test_1", "payment_intent": "pi_test_1"}}
    });
    if let Some(account) = account {
        event["account"] = serde_json::Value::String(account.to_string());
    }
    event.to_string()
}
