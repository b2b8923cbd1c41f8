//! API handlers.

// Allow precision loss in handlers - amounts displayed are well within f64 precision
#![allow(clippy::cast_precision_loss)]

pub mod accounts;
pub mod cache_admin;
pub mod events;
pub mod health;
pub mod payments;
pub mod webhooks;
