pub mod config;
pub mod domain;
pub mod errors;
pub mod extractor;
pub mod money;

pub use domain::context::QuotationDocumentContext;
pub use domain::profile::{CustomerProfile, UserId, UserIdentity};
pub use domain::quotation::{QuotationId, QuotationRequest, QuotationStatus};
pub use domain::reply::{ParsedReply, ReplyField};
pub use errors::{DomainError, FulfillmentError};
pub use extractor::extract_reply;
pub use money::{format_usd, QuoteTotals, IVA_RATE};
