use async_trait::async_trait;
use sqlx::Row;

use cotiza_core::domain::profile::{UserId, UserIdentity};

use super::{IdentityRepository, RepositoryError};
use crate::DbPool;

pub struct SqlIdentityRepository {
    pool: DbPool,
}

impl SqlIdentityRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityRepository for SqlIdentityRepository {
    async fn find_email(&self, user_id: &UserId) -> Result<Option<UserIdentity>, RepositoryError> {
        let row = sqlx::query("SELECT email FROM users WHERE id = ?1")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(UserIdentity { user_id: *user_id, email: row.try_get("email")? }))
    }
}
