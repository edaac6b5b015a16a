//! Field extraction for inbound operator replies.
//!
//! The outbound request notification embeds a literal reply template,
//! so the three fields are recovered with label-anchored patterns over
//! the raw plain-text body. No HTML stripping, no quoted-reply
//! handling: the labels are expected verbatim.

use std::sync::OnceLock;

use regex::Regex;
use uuid::Uuid;

use crate::domain::quotation::QuotationId;
use crate::domain::reply::{ParsedReply, ReplyField};

fn quotation_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)Quotation ID:\s*([0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12})",
        )
        .expect("quotation id pattern compiles")
    })
}

fn price_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)Price:[ \t]*(.+)").expect("price pattern compiles"))
}

fn lead_time_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)Lead Time:[ \t]*(.+)").expect("lead time pattern compiles"))
}

/// Parse a reply body into its three labeled fields.
///
/// Each field is matched independently; on failure the error lists
/// every field that could not be extracted, so the operator gets the
/// complete picture from a single bounced reply. Pure function, no
/// side effects.
pub fn extract_reply(body: &str) -> Result<ParsedReply, Vec<ReplyField>> {
    let quotation_id = quotation_id_pattern()
        .captures(body)
        .and_then(|captures| Uuid::parse_str(&captures[1]).ok())
        .map(QuotationId);

    let price = price_pattern().captures(body).map(|captures| captures[1].trim().to_string());

    let lead_time =
        lead_time_pattern().captures(body).map(|captures| captures[1].trim().to_string());

    let mut missing = Vec::new();
    if quotation_id.is_none() {
        missing.push(ReplyField::QuotationId);
    }
    if price.is_none() {
        missing.push(ReplyField::Price);
    }
    if lead_time.is_none() {
        missing.push(ReplyField::LeadTime);
    }

    match (quotation_id, price, lead_time) {
        (Some(quotation_id), Some(price), Some(lead_time)) => {
            Ok(ParsedReply { quotation_id, price, lead_time })
        }
        _ => Err(missing),
    }
}
