//! HTTP route handlers.

pub mod alerts;
pub mod analysis;
pub mod health;
pub mod subscriptions;
