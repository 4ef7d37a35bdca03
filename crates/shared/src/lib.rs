//! Shared utilities and common types for the Drishti backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Cursor pagination for alert history
//! - Common validation logic
//! - Text normalization helpers

pub mod pagination;
pub mod text;
pub mod validation;
