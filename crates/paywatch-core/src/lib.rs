//! Core types and utilities for paywatch.
//!
//! This crate provides the foundational types used throughout the paywatch
//! platform:
//!
//! - **Identifiers**: `UserId`, `AccountId`
//! - **Events**: `WebhookEvent`, `EventStatus`, `EventClass`
//! - **Payments**: `NormalizedPayment`, `PaymentSource`, `PaymentSummary`
//! - **Caching**: `CachedCharges`, `CachedSubscriptions`, `CachedSummary`
//! - **Bindings**: `UserRecord` (local user to Connect account)
//!
//! # Monetary amounts
//!
//! All amounts are integer minor units (cents for USD) carried through from
//! the Stripe API unchanged. They are stored as `i64` to avoid floating
//! point precision issues; formatting for display happens at the API edge.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cache;
pub mod event;
pub mod ids;
pub mod payment;
pub mod user;

pub use cache::{CachedCharges, CachedSubscriptions, CachedSummary, CACHE_TTL_SECS};
pub use event::{classify, related_object_id, EventClass, EventStatus, WebhookEvent};
pub use ids::{AccountId, IdError, UserId};
pub use payment::{NormalizedPayment, PaymentSource, PaymentSummary, SubscriptionInfo};
pub use user::UserRecord;
