use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;

/// Denormalized identity info for a requesting user. Both fields are
/// optional by schema; the document renderer substitutes `N/A` when
/// they are missing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub user_id: UserId,
    pub full_name: Option<String>,
    pub company_name: Option<String>,
}

/// Contact email for the owning user, looked up from the identity
/// store by the same identifier that owns the quotation request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub user_id: UserId,
    pub email: String,
}
