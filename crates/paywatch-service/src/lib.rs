//! Paywatch HTTP API Service.
//!
//! This crate provides the HTTP API for the paywatch service, including:
//!
//! - Stripe webhook ingestion (signature verification, idempotent event
//!   log, cache-invalidation routing)
//! - Read-through caches over Stripe payment, subscription, and summary
//!   reads
//! - Connected-account bindings and admin cache controls
//!
//! # Authentication
//!
//! Consumer endpoints under `/v1` require a bearer JWT minted by the
//! platform's identity provider. The webhook endpoint authenticates via
//! Stripe's signature scheme instead.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers stay async for router consistency

pub mod auth;
pub mod cache;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod invalidation;
pub mod routes;
pub mod state;
pub mod stripe;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use invalidation::{AccountInvalidationReport, CacheSelector, InvalidationReport};
pub use routes::create_router;
pub use state::AppState;
pub use stripe::{ListWindow, RecentPayments, StripeClient, StripeError};
