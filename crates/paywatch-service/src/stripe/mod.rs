//! Stripe API integration.
//!
//! `client` talks to the Stripe API (payment intents, charges,
//! subscriptions) with Connect account scoping; `types` mirrors the
//! upstream response shapes; `normalize` converges both payment shapes
//! onto the source-agnostic domain model.

pub mod client;
pub mod normalize;
pub mod types;

pub use client::{ListWindow, StripeClient, StripeError};
pub use normalize::{normalize_charge, normalize_intent, normalize_subscription, RecentPayments};
pub use types::{Charge, PaymentIntent, StripeList, Subscription};
