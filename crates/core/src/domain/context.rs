use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::domain::profile::{CustomerProfile, UserIdentity};
use crate::domain::quotation::{QuotationId, QuotationRequest};

/// Everything the document renderer needs for one quotation, assembled
/// from the request row, the customer profile, and the identity lookup.
/// Lives for a single fulfillment attempt and is never shared.
#[derive(Clone, Debug, PartialEq)]
pub struct QuotationDocumentContext {
    pub id: QuotationId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub customer_company_name: Option<String>,
    pub customer_full_name: Option<String>,
    pub customer_email: String,
    pub article_number: String,
    pub model: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub lead_time: String,
}

impl QuotationDocumentContext {
    /// Aggregate a quoted request with its related records. Requires
    /// the reply to have been applied already; a request without price
    /// and lead time cannot be rendered.
    pub fn assemble(
        request: &QuotationRequest,
        profile: &CustomerProfile,
        identity: &UserIdentity,
    ) -> Option<Self> {
        let unit_price = request.price?;
        let lead_time = request.lead_time.clone()?;

        Some(Self {
            id: request.id,
            issued_at: request.created_at,
            expires_at: request.created_at + Duration::days(1),
            customer_company_name: profile.company_name.clone(),
            customer_full_name: profile.full_name.clone(),
            customer_email: identity.email.clone(),
            article_number: request.article_number.clone(),
            model: request.model.clone(),
            quantity: request.quantity,
            unit_price,
            lead_time,
        })
    }
}
