//! Inbound email webhook.
//!
//! The mail provider posts every reply to the operator address here as
//! multipart form data. Only the plain-text part matters; everything
//! else in the form is drained and dropped. Processing failures are
//! acknowledged with 200 so the provider never retries a reply the
//! operator has to correct anyway.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;
use tracing::{error, info};

use crate::fulfillment::FulfillmentPipeline;

#[derive(Clone)]
pub struct WebhookState {
    pub pipeline: Arc<FulfillmentPipeline>,
}

pub fn router(pipeline: Arc<FulfillmentPipeline>) -> Router {
    Router::new()
        .route("/api/email-reply", post(handle_email_reply))
        .with_state(WebhookState { pipeline })
}

pub async fn handle_email_reply(
    State(state): State<WebhookState>,
    mut multipart: Multipart,
) -> (StatusCode, Json<serde_json::Value>) {
    let mut body: Option<String> = None;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() == Some("text") {
                    match field.text().await {
                        Ok(text) => body = Some(text),
                        Err(error) => {
                            return (
                                StatusCode::BAD_REQUEST,
                                Json(json!({ "error": format!("unreadable text part: {error}") })),
                            );
                        }
                    }
                } else {
                    // Attachments and headers from the provider are not used.
                    let _ = field.bytes().await;
                }
            }
            Ok(None) => break,
            Err(error) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": format!("malformed multipart payload: {error}") })),
                );
            }
        }
    }

    let Some(body) = body else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "missing `text` part in inbound payload" })),
        );
    };

    match state.pipeline.process_reply(&body).await {
        Ok(report) => {
            info!(
                event_name = "webhook.reply_processed",
                quotation_id = %report.request_id,
                recipient = %report.recipient,
                finalized = report.finalized,
                "inbound reply fulfilled"
            );
            (
                StatusCode::OK,
                Json(json!({
                    "message": "quotation processed",
                    "quotation_id": report.request_id.to_string(),
                })),
            )
        }
        Err(failure) => {
            error!(
                event_name = "webhook.reply_failed",
                kind = failure.kind(),
                state_mutated = !failure.left_no_state(),
                error = %failure,
                "inbound reply could not be fulfilled"
            );
            (StatusCode::OK, Json(json!({ "message": "reply received" })))
        }
    }
}
