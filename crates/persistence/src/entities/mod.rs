//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod alert;
pub mod subscription;
pub mod user;

pub use alert::{AlertEntity, AlertNotificationEntity, SeverityCountEntity};
pub use subscription::SubscriptionEntity;
pub use user::UserEntity;
