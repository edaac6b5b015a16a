//! Quotation request intake.
//!
//! Accepts up to two products per submission, stores one pending
//! request per product, and notifies the operator inbox with the
//! labeled reply template the fulfillment pipeline parses back.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use cotiza_core::domain::quotation::{QuotationId, QuotationRequest, QuotationStatus};
use cotiza_core::CustomerProfile;
use cotiza_db::repositories::{
    IdentityRepository, ProfileRepository, QuotationRequestRepository,
};
use cotiza_mail::{DeliveryGateway, OutboundEmail};

use crate::emails::EmailTemplates;

pub const MAX_PRODUCTS_PER_SUBMISSION: usize = 2;

#[derive(Clone)]
pub struct IntakeState {
    pub requests: Arc<dyn QuotationRequestRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub identities: Arc<dyn IdentityRepository>,
    pub gateway: Arc<dyn DeliveryGateway>,
    pub templates: Arc<EmailTemplates>,
    pub sender: String,
    pub operator_inbox: String,
}

#[derive(Debug, Deserialize)]
pub struct IntakePayload {
    pub user_id: Uuid,
    pub products: Vec<ProductInput>,
}

#[derive(Debug, Deserialize)]
pub struct ProductInput {
    pub article_number: String,
    pub model: String,
    pub quantity: u32,
    pub delivery_place: String,
    #[serde(default)]
    pub comments: Option<String>,
}

pub fn router(state: IntakeState) -> Router {
    Router::new().route("/api/quotations", post(create_quotations)).with_state(state)
}

pub async fn create_quotations(
    State(state): State<IntakeState>,
    Json(payload): Json<IntakePayload>,
) -> (StatusCode, Json<serde_json::Value>) {
    if let Err(message) = validate(&payload) {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": message })));
    }

    let identity = match state.identities.find_email(&payload.user_id).await {
        Ok(Some(identity)) => identity,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": format!("unknown user {}", payload.user_id) })),
            );
        }
        Err(error) => return internal_error("identity lookup failed", &error.to_string()),
    };

    let profile = match state.profiles.find_by_user(&payload.user_id).await {
        Ok(found) => found.unwrap_or(CustomerProfile {
            user_id: payload.user_id,
            full_name: None,
            company_name: None,
        }),
        Err(error) => return internal_error("profile lookup failed", &error.to_string()),
    };

    let now = Utc::now();
    let requests: Vec<QuotationRequest> = payload
        .products
        .into_iter()
        .map(|product| QuotationRequest {
            id: QuotationId::new(),
            user_id: payload.user_id,
            article_number: product.article_number,
            model: product.model,
            quantity: product.quantity,
            delivery_place: product.delivery_place,
            comments: product.comments,
            price: None,
            lead_time: None,
            status: QuotationStatus::Pending,
            created_at: now,
            updated_at: now,
        })
        .collect();

    for request in &requests {
        if let Err(error) = state.requests.insert(request).await {
            return internal_error("request persistence failed", &error.to_string());
        }
    }

    let html_body = match state.templates.new_request(&profile, &identity.email, &requests) {
        Ok(html) => html,
        Err(error) => return internal_error("notification rendering failed", &error.to_string()),
    };
    let notification = OutboundEmail {
        to: state.operator_inbox.clone(),
        from: state.sender.clone(),
        subject: format!("New Quotation Request - {}", identity.email),
        html_body,
        attachments: Vec::new(),
    };
    if let Err(error) = state.gateway.send(&notification).await {
        return internal_error("operator notification failed", &error.to_string());
    }

    let ids: Vec<String> = requests.iter().map(|request| request.id.to_string()).collect();
    info!(
        event_name = "intake.requests_created",
        user_id = %payload.user_id,
        count = ids.len(),
        "quotation requests stored and operator notified"
    );

    (StatusCode::CREATED, Json(json!({ "request_ids": ids })))
}

fn validate(payload: &IntakePayload) -> Result<(), String> {
    if payload.products.is_empty() {
        return Err("at least one product is required".to_string());
    }
    if payload.products.len() > MAX_PRODUCTS_PER_SUBMISSION {
        return Err(format!(
            "at most {MAX_PRODUCTS_PER_SUBMISSION} products per submission"
        ));
    }

    for (index, product) in payload.products.iter().enumerate() {
        let position = index + 1;
        if product.article_number.trim().is_empty() {
            return Err(format!("product {position}: article_number must not be empty"));
        }
        if product.model.trim().is_empty() {
            return Err(format!("product {position}: model must not be empty"));
        }
        if product.delivery_place.trim().is_empty() {
            return Err(format!("product {position}: delivery_place must not be empty"));
        }
        if product.quantity == 0 {
            return Err(format!("product {position}: quantity must be at least 1"));
        }
    }

    Ok(())
}

fn internal_error(stage: &str, detail: &str) -> (StatusCode, Json<serde_json::Value>) {
    error!(event_name = "intake.failed", stage, error = detail, "intake submission failed");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": stage })))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::util::ServiceExt;
    use uuid::Uuid;

    use cotiza_core::{CustomerProfile, UserIdentity};
    use cotiza_db::repositories::{
        InMemoryIdentityRepository, InMemoryProfileRepository, InMemoryQuotationRepository,
    };
    use cotiza_mail::RecordingGateway;

    use crate::emails::EmailTemplates;

    use super::{router, IntakeState};

    struct Fixture {
        app: axum::Router,
        gateway: Arc<RecordingGateway>,
        user_id: Uuid,
    }

    fn fixture() -> Fixture {
        let user_id = Uuid::new_v4();
        let gateway = Arc::new(RecordingGateway::new());
        let state = IntakeState {
            requests: Arc::new(InMemoryQuotationRepository::new()),
            profiles: Arc::new(InMemoryProfileRepository::with_profiles([CustomerProfile {
                user_id,
                full_name: Some("Maria Lopez".to_string()),
                company_name: Some("Acme HVAC".to_string()),
            }])),
            identities: Arc::new(InMemoryIdentityRepository::with_identities([UserIdentity {
                user_id,
                email: "maria@acme.example".to_string(),
            }])),
            gateway: gateway.clone(),
            templates: Arc::new(EmailTemplates::new().expect("templates")),
            sender: "quotes@cotiza.example".to_string(),
            operator_inbox: "operator@cotiza.example".to_string(),
        };

        Fixture { app: router(state), gateway, user_id }
    }

    fn post_json(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/quotations")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request builds")
    }

    fn product(article: &str) -> serde_json::Value {
        serde_json::json!({
            "article_number": article,
            "model": "FE2owlet",
            "quantity": 3,
            "delivery_place": "Monterrey",
        })
    }

    #[tokio::test]
    async fn submission_stores_requests_and_notifies_the_operator() {
        let fixture = fixture();

        let response = fixture
            .app
            .oneshot(post_json(serde_json::json!({
                "user_id": fixture.user_id,
                "products": [product("AN-1"), product("AN-2")],
            })))
            .await
            .expect("handler responds");

        assert_eq!(response.status(), StatusCode::CREATED);

        let sent = fixture.gateway.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "operator@cotiza.example");
        assert!(sent[0].html_body.contains("AN-1"));
        assert!(sent[0].html_body.contains("AN-2"));
        assert!(sent[0].html_body.contains("Quotation ID:"));
    }

    #[tokio::test]
    async fn more_than_two_products_is_rejected() {
        let fixture = fixture();

        let response = fixture
            .app
            .oneshot(post_json(serde_json::json!({
                "user_id": fixture.user_id,
                "products": [product("AN-1"), product("AN-2"), product("AN-3")],
            })))
            .await
            .expect("handler responds");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(fixture.gateway.sent().is_empty());
    }

    #[tokio::test]
    async fn zero_quantity_is_rejected() {
        let fixture = fixture();
        let mut bad = product("AN-1");
        bad["quantity"] = serde_json::json!(0);

        let response = fixture
            .app
            .oneshot(post_json(serde_json::json!({
                "user_id": fixture.user_id,
                "products": [bad],
            })))
            .await
            .expect("handler responds");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let fixture = fixture();

        let response = fixture
            .app
            .oneshot(post_json(serde_json::json!({
                "user_id": Uuid::new_v4(),
                "products": [product("AN-1")],
            })))
            .await
            .expect("handler responds");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(fixture.gateway.sent().is_empty());
    }
}
