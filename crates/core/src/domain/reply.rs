use serde::{Deserialize, Serialize};

use crate::domain::quotation::QuotationId;

/// The three labeled fields an operator reply must carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplyField {
    QuotationId,
    Price,
    LeadTime,
}

impl ReplyField {
    pub fn label(&self) -> &'static str {
        match self {
            Self::QuotationId => "Quotation ID",
            Self::Price => "Price",
            Self::LeadTime => "Lead Time",
        }
    }
}

/// Structured result of parsing one operator reply body.
///
/// The price is kept as raw text here; coercing it to a decimal is the
/// orchestrator's job so a non-numeric price is reported as its own
/// failure kind rather than a parse miss.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedReply {
    pub quotation_id: QuotationId,
    pub price: String,
    pub lead_time: String,
}
