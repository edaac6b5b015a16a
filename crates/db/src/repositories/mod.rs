use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use cotiza_core::domain::profile::{CustomerProfile, UserId, UserIdentity};
use cotiza_core::domain::quotation::{QuotationId, QuotationRequest, QuotationStatus};

pub mod identity;
pub mod memory;
pub mod profile;
pub mod quotation;

pub use identity::SqlIdentityRepository;
pub use memory::{InMemoryIdentityRepository, InMemoryProfileRepository, InMemoryQuotationRepository};
pub use profile::SqlProfileRepository;
pub use quotation::SqlQuotationRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait QuotationRequestRepository: Send + Sync {
    async fn insert(&self, request: &QuotationRequest) -> Result<(), RepositoryError>;

    async fn find_by_id(
        &self,
        id: &QuotationId,
    ) -> Result<Option<QuotationRequest>, RepositoryError>;

    /// Apply an operator reply: set price and lead time, move the
    /// request to `processing`, and return the updated row. Matches
    /// strictly by identifier; `None` means no row matched.
    async fn apply_reply(
        &self,
        id: &QuotationId,
        price: Decimal,
        lead_time: &str,
    ) -> Result<Option<QuotationRequest>, RepositoryError>;

    /// Write a bare status transition. Returns false when no row
    /// matched the identifier.
    async fn set_status(
        &self,
        id: &QuotationId,
        status: QuotationStatus,
    ) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<CustomerProfile>, RepositoryError>;
}

#[async_trait]
pub trait IdentityRepository: Send + Sync {
    async fn find_email(&self, user_id: &UserId) -> Result<Option<UserIdentity>, RepositoryError>;
}
