//! Repository implementations for database operations.

pub mod alert;
pub mod subscription;
pub mod user;

pub use alert::{AlertListQuery, AlertRepository};
pub use subscription::SubscriptionRepository;
pub use user::UserRepository;

use domain::error::StoreError;

/// Maps a database error onto the storage port's error type.
pub fn to_store_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound("row".to_string()),
        other => StoreError::Backend(other.to_string()),
    }
}
