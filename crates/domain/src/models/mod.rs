//! Domain models for Drishti.

pub mod alert;
pub mod detected_object;
pub mod subscription;
pub mod user;

pub use alert::{
    Alert, AlertResponse, AlertSnapshot, AlertStats, AlertType, DeliveryStatus,
    ListAlertsQuery, ListAlertsResponse, NewAlert, NotificationRecord, Severity,
};
pub use detected_object::{DetectedObject, ObjectCategory, OBJECT_CONFIDENCE, UNKNOWN_DISTANCE};
pub use subscription::{
    AlertTypeFilter, CreateSubscriptionRequest, ListSubscriptionsResponse, Recipient,
    Subscription, SubscriptionResponse, UpdateSubscriptionRequest,
};
pub use user::UserRef;
