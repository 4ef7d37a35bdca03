//! Domain error types.

use thiserror::Error;

use crate::detection::Classification;
use crate::models::DetectedObject;

/// Invalid detection configuration. Raised while building tables at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Alert rule table has no tiers")]
    EmptyRuleTable,

    #[error("Alert rule tier '{0}' has no keywords")]
    EmptyTier(String),

    #[error("Alert rule tier '{0}' contains a blank keyword")]
    BlankKeyword(String),

    #[error("Alert rule tier name must not be blank")]
    BlankTierName,

    #[error("Distance search window must be greater than zero")]
    ZeroDistanceWindow,

    #[error("Invalid object pattern '{pattern}': {reason}")]
    InvalidObjectPattern { pattern: String, reason: String },
}

/// Failure of a storage collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Failure to deliver one notification.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotificationError {
    #[error("Notification delivery is disabled")]
    Disabled,

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),
}

/// Failure of an analysis request.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The alert could not be saved. The computed results are kept for diagnostics.
    #[error("Failed to persist alert: {source}")]
    Persistence {
        #[source]
        source: StoreError,
        classification: Box<Classification>,
        detected_objects: Vec<DetectedObject>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_display() {
        assert_eq!(
            ConfigurationError::EmptyTier("medium".to_string()).to_string(),
            "Alert rule tier 'medium' has no keywords"
        );
        assert_eq!(
            ConfigurationError::EmptyRuleTable.to_string(),
            "Alert rule table has no tiers"
        );
    }

    #[test]
    fn test_analysis_error_wraps_store_error() {
        let err = AnalysisError::Persistence {
            source: StoreError::Backend("connection reset".to_string()),
            classification: Box::new(Classification::not_detected()),
            detected_objects: vec![],
        };
        assert_eq!(
            err.to_string(),
            "Failed to persist alert: Storage backend error: connection reset"
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
