use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use cotiza_core::domain::quotation::{QuotationId, QuotationRequest, QuotationStatus};

use super::{QuotationRequestRepository, RepositoryError};
use crate::DbPool;

const REQUEST_COLUMNS: &str = "id, user_id, article_number, model, quantity, delivery_place, \
                               comments, price, lead_time, status, created_at, updated_at";

pub struct SqlQuotationRepository {
    pool: DbPool,
}

impl SqlQuotationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_request(row: &SqliteRow) -> Result<QuotationRequest, RepositoryError> {
    let id: String = row.try_get("id")?;
    let user_id: String = row.try_get("user_id")?;
    let quantity: i64 = row.try_get("quantity")?;
    let price: Option<String> = row.try_get("price")?;
    let status: String = row.try_get("status")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    let id = Uuid::parse_str(&id)
        .map_err(|error| RepositoryError::Decode(format!("request id `{id}`: {error}")))?;
    let user_id = Uuid::parse_str(&user_id)
        .map_err(|error| RepositoryError::Decode(format!("user id `{user_id}`: {error}")))?;
    let status = status
        .parse::<QuotationStatus>()
        .map_err(|error| RepositoryError::Decode(error.to_string()))?;
    let price = price
        .map(|raw| {
            raw.parse::<Decimal>()
                .map_err(|error| RepositoryError::Decode(format!("price `{raw}`: {error}")))
        })
        .transpose()?;
    let quantity = u32::try_from(quantity)
        .map_err(|_| RepositoryError::Decode(format!("quantity `{quantity}` out of range")))?;

    Ok(QuotationRequest {
        id: QuotationId(id),
        user_id,
        article_number: row.try_get("article_number")?,
        model: row.try_get("model")?,
        quantity,
        delivery_place: row.try_get("delivery_place")?,
        comments: row.try_get("comments")?,
        price,
        lead_time: row.try_get("lead_time")?,
        status,
        created_at,
        updated_at,
    })
}

#[async_trait]
impl QuotationRequestRepository for SqlQuotationRepository {
    async fn insert(&self, request: &QuotationRequest) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO quotation_requests \
             (id, user_id, article_number, model, quantity, delivery_place, comments, price, \
              lead_time, status, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )
        .bind(request.id.to_string())
        .bind(request.user_id.to_string())
        .bind(&request.article_number)
        .bind(&request.model)
        .bind(i64::from(request.quantity))
        .bind(&request.delivery_place)
        .bind(&request.comments)
        .bind(request.price.map(|price| price.to_string()))
        .bind(&request.lead_time)
        .bind(request.status.as_str())
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &QuotationId,
    ) -> Result<Option<QuotationRequest>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM quotation_requests WHERE id = ?1"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_request).transpose()
    }

    async fn apply_reply(
        &self,
        id: &QuotationId,
        price: Decimal,
        lead_time: &str,
    ) -> Result<Option<QuotationRequest>, RepositoryError> {
        let row = sqlx::query(&format!(
            "UPDATE quotation_requests \
             SET price = ?1, lead_time = ?2, status = ?3, updated_at = ?4 \
             WHERE id = ?5 \
             RETURNING {REQUEST_COLUMNS}"
        ))
        .bind(price.to_string())
        .bind(lead_time)
        .bind(QuotationStatus::Processing.as_str())
        .bind(Utc::now())
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_request).transpose()
    }

    async fn set_status(
        &self,
        id: &QuotationId,
        status: QuotationStatus,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE quotation_requests SET status = ?1, updated_at = ?2 WHERE id = ?3",
        )
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
