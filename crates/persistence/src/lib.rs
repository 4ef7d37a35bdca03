//! Persistence layer for the Drishti alert backend.
//!
//! This crate contains:
//! - Database connection management and migrations
//! - Entity definitions (database row mappings)
//! - Repository implementations of the domain storage ports

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;
