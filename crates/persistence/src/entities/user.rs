//! User entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::UserRef;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the users table.
#[derive(Debug, Clone, FromRow)]
pub struct UserEntity {
    pub id: Uuid,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserEntity> for UserRef {
    fn from(entity: UserEntity) -> Self {
        UserRef::new(entity.id, entity.display_name.as_deref())
    }
}
