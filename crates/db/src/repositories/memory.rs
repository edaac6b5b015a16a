//! In-memory repository implementations for tests and wiring checks.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use cotiza_core::domain::profile::{CustomerProfile, UserId, UserIdentity};
use cotiza_core::domain::quotation::{QuotationId, QuotationRequest, QuotationStatus};

use super::{
    IdentityRepository, ProfileRepository, QuotationRequestRepository, RepositoryError,
};

#[derive(Default)]
pub struct InMemoryQuotationRepository {
    rows: Mutex<HashMap<QuotationId, QuotationRequest>>,
}

impl InMemoryQuotationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_requests(requests: impl IntoIterator<Item = QuotationRequest>) -> Self {
        let rows = requests.into_iter().map(|request| (request.id, request)).collect();
        Self { rows: Mutex::new(rows) }
    }
}

#[async_trait]
impl QuotationRequestRepository for InMemoryQuotationRepository {
    async fn insert(&self, request: &QuotationRequest) -> Result<(), RepositoryError> {
        self.rows.lock().expect("lock").insert(request.id, request.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &QuotationId,
    ) -> Result<Option<QuotationRequest>, RepositoryError> {
        Ok(self.rows.lock().expect("lock").get(id).cloned())
    }

    async fn apply_reply(
        &self,
        id: &QuotationId,
        price: Decimal,
        lead_time: &str,
    ) -> Result<Option<QuotationRequest>, RepositoryError> {
        let mut rows = self.rows.lock().expect("lock");
        let Some(request) = rows.get_mut(id) else {
            return Ok(None);
        };

        request.price = Some(price);
        request.lead_time = Some(lead_time.to_string());
        request.status = QuotationStatus::Processing;
        request.updated_at = Utc::now();
        Ok(Some(request.clone()))
    }

    async fn set_status(
        &self,
        id: &QuotationId,
        status: QuotationStatus,
    ) -> Result<bool, RepositoryError> {
        let mut rows = self.rows.lock().expect("lock");
        let Some(request) = rows.get_mut(id) else {
            return Ok(false);
        };

        request.status = status;
        request.updated_at = Utc::now();
        Ok(true)
    }
}

#[derive(Default)]
pub struct InMemoryProfileRepository {
    rows: Mutex<HashMap<UserId, CustomerProfile>>,
}

impl InMemoryProfileRepository {
    pub fn with_profiles(profiles: impl IntoIterator<Item = CustomerProfile>) -> Self {
        let rows = profiles.into_iter().map(|profile| (profile.user_id, profile)).collect();
        Self { rows: Mutex::new(rows) }
    }
}

#[async_trait]
impl ProfileRepository for InMemoryProfileRepository {
    async fn find_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<CustomerProfile>, RepositoryError> {
        Ok(self.rows.lock().expect("lock").get(user_id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryIdentityRepository {
    rows: Mutex<HashMap<UserId, UserIdentity>>,
}

impl InMemoryIdentityRepository {
    pub fn with_identities(identities: impl IntoIterator<Item = UserIdentity>) -> Self {
        let rows = identities.into_iter().map(|identity| (identity.user_id, identity)).collect();
        Self { rows: Mutex::new(rows) }
    }
}

#[async_trait]
impl IdentityRepository for InMemoryIdentityRepository {
    async fn find_email(&self, user_id: &UserId) -> Result<Option<UserIdentity>, RepositoryError> {
        Ok(self.rows.lock().expect("lock").get(user_id).cloned())
    }
}
