use async_trait::async_trait;
use sqlx::Row;

use cotiza_core::domain::profile::{CustomerProfile, UserId};

use super::{ProfileRepository, RepositoryError};
use crate::DbPool;

pub struct SqlProfileRepository {
    pool: DbPool,
}

impl SqlProfileRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileRepository for SqlProfileRepository {
    async fn find_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<CustomerProfile>, RepositoryError> {
        let row = sqlx::query("SELECT full_name, company_name FROM profiles WHERE id = ?1")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(CustomerProfile {
            user_id: *user_id,
            full_name: row.try_get("full_name")?,
            company_name: row.try_get("company_name")?,
        }))
    }
}
