//! Domain layer for the Drishti backend.
//!
//! This crate contains:
//! - Domain models (Alert, Subscription, DetectedObject)
//! - The alert-detection pipeline (rule table, classifier, object extractor)
//! - Business services (notification dispatch, analysis orchestration)
//! - Domain error types

pub mod detection;
pub mod error;
pub mod models;
pub mod services;
