use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuotationId(pub Uuid);

impl QuotationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Abbreviated reference used in email subjects, attachment names,
    /// and the document metadata block.
    pub fn short_ref(&self) -> String {
        self.0.to_string().chars().take(8).collect()
    }
}

impl Default for QuotationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for QuotationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotationStatus {
    Pending,
    Processing,
    Completed,
    Cancelled,
}

impl QuotationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for QuotationStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for QuotationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One customer request for a price/lead-time quote on a part.
///
/// `price` and `lead_time` stay `None` until an operator reply has been
/// applied; from then on the status has left `Pending`. Cancellation is
/// written by an external surface, never by the fulfillment pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuotationRequest {
    pub id: QuotationId,
    pub user_id: Uuid,
    pub article_number: String,
    pub model: String,
    pub quantity: u32,
    pub delivery_place: String,
    pub comments: Option<String>,
    pub price: Option<Decimal>,
    pub lead_time: Option<String>,
    pub status: QuotationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QuotationRequest {
    /// Lifecycle table. Completion is only reachable from a request
    /// that is `processing`; cancellation is written by an external
    /// surface and allowed from anywhere.
    pub fn can_transition_to(&self, next: QuotationStatus) -> bool {
        matches!(
            (&self.status, next),
            (QuotationStatus::Pending, QuotationStatus::Processing)
                | (QuotationStatus::Processing, QuotationStatus::Completed)
                | (_, QuotationStatus::Cancelled)
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::{QuotationId, QuotationRequest, QuotationStatus};

    fn request(status: QuotationStatus) -> QuotationRequest {
        QuotationRequest {
            id: QuotationId::new(),
            user_id: Uuid::new_v4(),
            article_number: "AN-100".to_string(),
            model: "FE2owlet".to_string(),
            quantity: 3,
            delivery_place: "Monterrey".to_string(),
            comments: None,
            price: None,
            lead_time: None,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn allows_pending_to_processing_and_processing_to_completed() {
        assert!(request(QuotationStatus::Pending).can_transition_to(QuotationStatus::Processing));
        assert!(request(QuotationStatus::Processing).can_transition_to(QuotationStatus::Completed));
    }

    #[test]
    fn blocks_completion_unless_processing() {
        assert!(!request(QuotationStatus::Pending).can_transition_to(QuotationStatus::Completed));
        assert!(!request(QuotationStatus::Cancelled).can_transition_to(QuotationStatus::Completed));
        assert!(!request(QuotationStatus::Completed).can_transition_to(QuotationStatus::Completed));
    }

    #[test]
    fn cancellation_is_reachable_from_any_status() {
        for status in [
            QuotationStatus::Pending,
            QuotationStatus::Processing,
            QuotationStatus::Completed,
        ] {
            assert!(request(status).can_transition_to(QuotationStatus::Cancelled));
        }
    }

    #[test]
    fn short_ref_is_first_eight_characters() {
        let id = QuotationId(Uuid::parse_str("123e4567-e89b-12d3-a456-426614174000").unwrap());
        assert_eq!(id.short_ref(), "123e4567");
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            QuotationStatus::Pending,
            QuotationStatus::Processing,
            QuotationStatus::Completed,
            QuotationStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<QuotationStatus>().unwrap(), status);
        }
    }
}
