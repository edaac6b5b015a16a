use thiserror::Error;

use crate::domain::quotation::QuotationId;
use crate::domain::reply::ReplyField;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("unknown quotation status `{0}`")]
    UnknownStatus(String),
}

/// Everything that can end a single fulfillment attempt.
///
/// None of these propagate to the triggering transport as a hard
/// failure; the webhook acknowledges receipt and the orchestrator
/// records the diagnostic for operator review.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FulfillmentError {
    /// One or more labeled fields could not be extracted from the
    /// reply body. No state was mutated; a corrected follow-up reply
    /// recovers.
    #[error("reply extraction incomplete: missing {}", field_labels(.0))]
    ExtractionIncomplete(Vec<ReplyField>),
    /// The extracted price text is not a decimal number. Same recovery
    /// path as an incomplete extraction.
    #[error("price `{raw}` is not a valid decimal amount")]
    InvalidPrice { raw: String },
    /// The reply referenced an identifier no stored request matches.
    #[error("quotation request {0} not found")]
    RequestNotFound(QuotationId),
    /// A repository step between extraction and rendering failed: the
    /// reply update itself, or the follow-up fetch of the request,
    /// profile, or identity. Whatever the update already persisted is
    /// kept for a manual resend; nothing is rolled back.
    #[error("aggregation failed for request {id}: {detail}")]
    AggregationFailed { id: QuotationId, detail: String },
    /// Document construction failed; no partial output exists.
    #[error("document rendering failed for request {id}: {detail}")]
    RenderingFailed { id: QuotationId, detail: String },
    /// The outbound transport rejected or could not send the message.
    /// The persisted price/lead-time/`processing` state is kept.
    #[error("delivery failed for request {id}: {detail}")]
    DeliveryFailed { id: QuotationId, detail: String },
    /// The completed-status write failed after a successful delivery.
    /// Logged only; the customer already has the document.
    #[error("finalization failed for request {id}: {detail}")]
    FinalizationFailed { id: QuotationId, detail: String },
}

impl FulfillmentError {
    /// Stable tag for structured log events and test assertions.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ExtractionIncomplete(_) => "extraction_incomplete",
            Self::InvalidPrice { .. } => "invalid_price",
            Self::RequestNotFound(_) => "request_not_found",
            Self::AggregationFailed { .. } => "aggregation_failed",
            Self::RenderingFailed { .. } => "rendering_failed",
            Self::DeliveryFailed { .. } => "delivery_failed",
            Self::FinalizationFailed { .. } => "finalization_failed",
        }
    }

    /// True when the attempt left no partial state behind, meaning a
    /// corrected reply can simply be sent again.
    pub fn left_no_state(&self) -> bool {
        matches!(
            self,
            Self::ExtractionIncomplete(_) | Self::InvalidPrice { .. } | Self::RequestNotFound(_)
        )
    }
}

fn field_labels(fields: &[ReplyField]) -> String {
    let labels: Vec<&'static str> = fields.iter().map(ReplyField::label).collect();
    labels.join(", ")
}
