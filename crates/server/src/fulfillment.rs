//! The reply-fulfillment pipeline.
//!
//! One inbound operator reply drives one sequential attempt:
//! parse → coerce price → persist the reply → re-fetch and aggregate
//! related records → render the document → deliver it → finalize the
//! status. Failures are mapped onto the [`FulfillmentError`] taxonomy
//! and recorded at the webhook boundary; nothing here retries.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, warn};

use cotiza_core::domain::quotation::{QuotationId, QuotationRequest, QuotationStatus};
use cotiza_core::{extract_reply, FulfillmentError, QuotationDocumentContext};
use cotiza_db::repositories::{
    IdentityRepository, ProfileRepository, QuotationRequestRepository,
};
use cotiza_mail::{DeliveryGateway, EmailAttachment, OutboundEmail};
use cotiza_pdf::QuotationRenderer;

use crate::emails::EmailTemplates;

/// Outcome of a successful fulfillment attempt.
#[derive(Clone, Debug)]
pub struct FulfillmentReport {
    pub request_id: QuotationId,
    pub recipient: String,
    /// False when delivery succeeded but the completed-status write
    /// did not; reconciled out-of-band, never by re-sending.
    pub finalized: bool,
}

pub struct FulfillmentPipeline {
    requests: Arc<dyn QuotationRequestRepository>,
    profiles: Arc<dyn ProfileRepository>,
    identities: Arc<dyn IdentityRepository>,
    renderer: Arc<QuotationRenderer>,
    gateway: Arc<dyn DeliveryGateway>,
    templates: Arc<EmailTemplates>,
    sender: String,
}

impl FulfillmentPipeline {
    pub fn new(
        requests: Arc<dyn QuotationRequestRepository>,
        profiles: Arc<dyn ProfileRepository>,
        identities: Arc<dyn IdentityRepository>,
        renderer: Arc<QuotationRenderer>,
        gateway: Arc<dyn DeliveryGateway>,
        templates: Arc<EmailTemplates>,
        sender: String,
    ) -> Self {
        Self { requests, profiles, identities, renderer, gateway, templates, sender }
    }

    pub async fn process_reply(&self, body: &str) -> Result<FulfillmentReport, FulfillmentError> {
        let reply = extract_reply(body).map_err(FulfillmentError::ExtractionIncomplete)?;
        let id = reply.quotation_id;
        info!(
            event_name = "fulfillment.reply_parsed",
            quotation_id = %id,
            "operator reply parsed"
        );

        let price: Decimal = reply
            .price
            .parse()
            .map_err(|_| FulfillmentError::InvalidPrice { raw: reply.price.clone() })?;

        let updated = self
            .requests
            .apply_reply(&id, price, &reply.lead_time)
            .await
            .map_err(|error| FulfillmentError::AggregationFailed {
                id,
                detail: format!("reply update failed: {error}"),
            })?
            .ok_or(FulfillmentError::RequestNotFound(id))?;
        info!(
            event_name = "fulfillment.reply_applied",
            quotation_id = %id,
            status = %updated.status,
            "price and lead time persisted"
        );

        // Re-fetch by the same identifier so the rendered document is
        // built from the freshest row, not the update's return value.
        let request = self
            .requests
            .find_by_id(&id)
            .await
            .map_err(|error| FulfillmentError::AggregationFailed {
                id,
                detail: format!("request re-fetch failed: {error}"),
            })?
            .ok_or_else(|| FulfillmentError::AggregationFailed {
                id,
                detail: "request row vanished after update".to_string(),
            })?;

        let profile = self
            .profiles
            .find_by_user(&request.user_id)
            .await
            .map_err(|error| FulfillmentError::AggregationFailed {
                id,
                detail: format!("profile fetch failed: {error}"),
            })?
            .ok_or_else(|| FulfillmentError::AggregationFailed {
                id,
                detail: format!("no profile for user {}", request.user_id),
            })?;

        let identity = self
            .identities
            .find_email(&request.user_id)
            .await
            .map_err(|error| FulfillmentError::AggregationFailed {
                id,
                detail: format!("identity fetch failed: {error}"),
            })?
            .ok_or_else(|| FulfillmentError::AggregationFailed {
                id,
                detail: format!("no identity for user {}", request.user_id),
            })?;

        let context = QuotationDocumentContext::assemble(&request, &profile, &identity).ok_or_else(
            || FulfillmentError::AggregationFailed {
                id,
                detail: "updated request is missing price or lead time".to_string(),
            },
        )?;

        let document = self
            .renderer
            .render(&context)
            .map_err(|error| FulfillmentError::RenderingFailed { id, detail: error.to_string() })?;
        info!(
            event_name = "fulfillment.document_rendered",
            quotation_id = %id,
            bytes = document.len(),
            "quotation document rendered"
        );

        let html_body = self
            .templates
            .quotation_ready(context.customer_full_name.as_deref(), &id)
            .map_err(|error| FulfillmentError::DeliveryFailed {
                id,
                detail: format!("message construction failed: {error}"),
            })?;
        let email = OutboundEmail {
            to: identity.email.clone(),
            from: self.sender.clone(),
            subject: format!("Your Quotation is Ready - Ref: {}", id.short_ref()),
            html_body,
            attachments: vec![EmailAttachment {
                content: document,
                filename: format!("Quotation_{}.pdf", id.short_ref()),
                mime_type: "application/pdf".to_string(),
            }],
        };

        self.gateway
            .send(&email)
            .await
            .map_err(|error| FulfillmentError::DeliveryFailed { id, detail: error.to_string() })?;
        info!(
            event_name = "fulfillment.document_delivered",
            quotation_id = %id,
            recipient = %identity.email,
            "quotation document delivered"
        );

        let finalized = self.finalize(&request).await;

        Ok(FulfillmentReport { request_id: id, recipient: identity.email, finalized })
    }

    // The customer already has the document by the time this runs; a
    // failed or refused status write is an inconsistency to reconcile,
    // never a reason to re-send.
    async fn finalize(&self, request: &QuotationRequest) -> bool {
        let id = request.id;

        if !request.can_transition_to(QuotationStatus::Completed) {
            let error = FulfillmentError::FinalizationFailed {
                id,
                detail: format!("request is {} and cannot complete", request.status),
            };
            warn!(
                event_name = "fulfillment.finalization_failed",
                quotation_id = %id,
                kind = error.kind(),
                error = %error,
                "request left the completable lifecycle mid-attempt"
            );
            return false;
        }

        match self.requests.set_status(&id, QuotationStatus::Completed).await {
            Ok(true) => true,
            Ok(false) => {
                let error = FulfillmentError::FinalizationFailed {
                    id,
                    detail: "no row matched the completed-status write".to_string(),
                };
                warn!(
                    event_name = "fulfillment.finalization_failed",
                    quotation_id = %id,
                    kind = error.kind(),
                    error = %error,
                    "completed-status write did not apply"
                );
                false
            }
            Err(repo_error) => {
                let error =
                    FulfillmentError::FinalizationFailed { id, detail: repo_error.to_string() };
                warn!(
                    event_name = "fulfillment.finalization_failed",
                    quotation_id = %id,
                    kind = error.kind(),
                    error = %error,
                    "completed-status write failed"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use cotiza_core::domain::quotation::{QuotationId, QuotationRequest, QuotationStatus};
    use cotiza_core::{CustomerProfile, FulfillmentError, UserIdentity};
    use cotiza_db::repositories::{
        InMemoryIdentityRepository, InMemoryProfileRepository, InMemoryQuotationRepository,
        QuotationRequestRepository, RepositoryError,
    };
    use cotiza_mail::RecordingGateway;
    use cotiza_pdf::QuotationRenderer;

    use crate::emails::EmailTemplates;

    use super::FulfillmentPipeline;

    /// Delegates everything except the completed-status write, which
    /// always fails as if the database dropped out after delivery.
    struct BrokenFinalizeRepository {
        inner: Arc<InMemoryQuotationRepository>,
    }

    #[async_trait]
    impl QuotationRequestRepository for BrokenFinalizeRepository {
        async fn insert(&self, request: &QuotationRequest) -> Result<(), RepositoryError> {
            self.inner.insert(request).await
        }

        async fn find_by_id(
            &self,
            id: &QuotationId,
        ) -> Result<Option<QuotationRequest>, RepositoryError> {
            self.inner.find_by_id(id).await
        }

        async fn apply_reply(
            &self,
            id: &QuotationId,
            price: Decimal,
            lead_time: &str,
        ) -> Result<Option<QuotationRequest>, RepositoryError> {
            self.inner.apply_reply(id, price, lead_time).await
        }

        async fn set_status(
            &self,
            _id: &QuotationId,
            _status: QuotationStatus,
        ) -> Result<bool, RepositoryError> {
            Err(RepositoryError::Database(sqlx::Error::PoolClosed))
        }
    }

    /// Simulates an external cancellation landing between the reply
    /// update and the re-fetch: reads always come back `cancelled`.
    struct CancelledMidFlightRepository {
        inner: Arc<InMemoryQuotationRepository>,
    }

    #[async_trait]
    impl QuotationRequestRepository for CancelledMidFlightRepository {
        async fn insert(&self, request: &QuotationRequest) -> Result<(), RepositoryError> {
            self.inner.insert(request).await
        }

        async fn find_by_id(
            &self,
            id: &QuotationId,
        ) -> Result<Option<QuotationRequest>, RepositoryError> {
            Ok(self.inner.find_by_id(id).await?.map(|mut request| {
                request.status = QuotationStatus::Cancelled;
                request
            }))
        }

        async fn apply_reply(
            &self,
            id: &QuotationId,
            price: Decimal,
            lead_time: &str,
        ) -> Result<Option<QuotationRequest>, RepositoryError> {
            self.inner.apply_reply(id, price, lead_time).await
        }

        async fn set_status(
            &self,
            id: &QuotationId,
            status: QuotationStatus,
        ) -> Result<bool, RepositoryError> {
            self.inner.set_status(id, status).await
        }
    }

    fn pending_request(id: QuotationId, user_id: Uuid) -> QuotationRequest {
        QuotationRequest {
            id,
            user_id,
            article_number: "AN-1".to_string(),
            model: "M-1".to_string(),
            quantity: 2,
            delivery_place: "Monterrey".to_string(),
            comments: None,
            price: None,
            lead_time: None,
            status: QuotationStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    struct Fixture {
        requests: Arc<InMemoryQuotationRepository>,
        gateway: Arc<RecordingGateway>,
        pipeline: FulfillmentPipeline,
        id: QuotationId,
    }

    fn fixture(gateway: RecordingGateway) -> Fixture {
        let id = QuotationId::new();
        let user_id = Uuid::new_v4();

        let requests =
            Arc::new(InMemoryQuotationRepository::with_requests([pending_request(id, user_id)]));
        let gateway = Arc::new(gateway);
        let pipeline = pipeline_with(
            requests.clone(),
            profiles_for(user_id),
            identities_for(user_id),
            gateway.clone(),
        );

        Fixture { requests, gateway, pipeline, id }
    }

    fn reply_body(id: &QuotationId) -> String {
        format!("Quotation ID: {id}\nPrice: 50\nLead Time: 3 days")
    }

    fn profiles_for(user_id: Uuid) -> Arc<InMemoryProfileRepository> {
        Arc::new(InMemoryProfileRepository::with_profiles([CustomerProfile {
            user_id,
            full_name: Some("Maria Lopez".to_string()),
            company_name: Some("Acme HVAC".to_string()),
        }]))
    }

    fn identities_for(user_id: Uuid) -> Arc<InMemoryIdentityRepository> {
        Arc::new(InMemoryIdentityRepository::with_identities([UserIdentity {
            user_id,
            email: "maria@acme.example".to_string(),
        }]))
    }

    fn pipeline_with(
        requests: Arc<dyn QuotationRequestRepository>,
        profiles: Arc<InMemoryProfileRepository>,
        identities: Arc<InMemoryIdentityRepository>,
        gateway: Arc<RecordingGateway>,
    ) -> FulfillmentPipeline {
        FulfillmentPipeline::new(
            requests,
            profiles,
            identities,
            Arc::new(QuotationRenderer::new(None)),
            gateway,
            Arc::new(EmailTemplates::new().expect("templates")),
            "quotes@cotiza.example".to_string(),
        )
    }

    #[tokio::test]
    async fn valid_reply_completes_the_request_and_sends_one_attachment() {
        let fixture = fixture(RecordingGateway::new());

        let report =
            fixture.pipeline.process_reply(&reply_body(&fixture.id)).await.expect("attempt");
        assert!(report.finalized);
        assert_eq!(report.recipient, "maria@acme.example");

        let stored = fixture
            .requests
            .find_by_id(&fixture.id)
            .await
            .expect("find")
            .expect("request exists");
        assert_eq!(stored.status, QuotationStatus::Completed);
        assert_eq!(stored.price, Some(Decimal::new(50, 0)));
        assert_eq!(stored.lead_time.as_deref(), Some("3 days"));

        let sent = fixture.gateway.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "maria@acme.example");
        assert_eq!(
            sent[0].subject,
            format!("Your Quotation is Ready - Ref: {}", fixture.id.short_ref())
        );
        assert_eq!(sent[0].attachments.len(), 1);
        assert_eq!(sent[0].attachments[0].mime_type, "application/pdf");
        assert!(sent[0].attachments[0].content.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn incomplete_reply_mutates_nothing() {
        let fixture = fixture(RecordingGateway::new());

        let error = fixture
            .pipeline
            .process_reply("Price: 50")
            .await
            .expect_err("missing id and lead time");
        assert!(matches!(error, FulfillmentError::ExtractionIncomplete(_)));

        let stored = fixture.requests.find_by_id(&fixture.id).await.expect("find").expect("row");
        assert_eq!(stored.status, QuotationStatus::Pending);
        assert!(fixture.gateway.sent().is_empty());
    }

    #[tokio::test]
    async fn non_numeric_price_is_terminal_without_mutation() {
        let fixture = fixture(RecordingGateway::new());
        let body = format!("Quotation ID: {}\nPrice: abc\nLead Time: 3 days", fixture.id);

        let error = fixture.pipeline.process_reply(&body).await.expect_err("invalid price");
        assert!(matches!(error, FulfillmentError::InvalidPrice { ref raw } if raw == "abc"));

        let stored = fixture.requests.find_by_id(&fixture.id).await.expect("find").expect("row");
        assert_eq!(stored.status, QuotationStatus::Pending);
        assert_eq!(stored.price, None);
    }

    #[tokio::test]
    async fn unknown_identifier_is_request_not_found() {
        let fixture = fixture(RecordingGateway::new());
        let unknown = QuotationId::new();

        let error = fixture
            .pipeline
            .process_reply(&reply_body(&unknown))
            .await
            .expect_err("no matching request");
        assert_eq!(error, FulfillmentError::RequestNotFound(unknown));
        assert!(fixture.gateway.sent().is_empty());
    }

    #[tokio::test]
    async fn delivery_failure_leaves_the_request_processing() {
        let fixture = fixture(RecordingGateway::failing());

        let error = fixture
            .pipeline
            .process_reply(&reply_body(&fixture.id))
            .await
            .expect_err("transport down");
        assert!(matches!(error, FulfillmentError::DeliveryFailed { .. }));

        // Applied reply state persists for a manual resend.
        let stored = fixture.requests.find_by_id(&fixture.id).await.expect("find").expect("row");
        assert_eq!(stored.status, QuotationStatus::Processing);
        assert_eq!(stored.price, Some(Decimal::new(50, 0)));
        assert_eq!(stored.lead_time.as_deref(), Some("3 days"));
    }

    #[tokio::test]
    async fn failed_completed_write_still_reports_a_delivered_attempt() {
        let id = QuotationId::new();
        let user_id = Uuid::new_v4();
        let inner =
            Arc::new(InMemoryQuotationRepository::with_requests([pending_request(id, user_id)]));
        let gateway = Arc::new(RecordingGateway::new());
        let pipeline = pipeline_with(
            Arc::new(BrokenFinalizeRepository { inner: inner.clone() }),
            profiles_for(user_id),
            identities_for(user_id),
            gateway.clone(),
        );

        let report = pipeline.process_reply(&reply_body(&id)).await.expect("delivery succeeded");
        assert!(!report.finalized);
        assert_eq!(report.recipient, "maria@acme.example");
        assert_eq!(gateway.sent().len(), 1);

        // The customer has the document; the request is left where the
        // reply update put it, to be reconciled rather than re-sent.
        let stored = inner.find_by_id(&id).await.expect("find").expect("row");
        assert_eq!(stored.status, QuotationStatus::Processing);
        assert_eq!(stored.price, Some(Decimal::new(50, 0)));
    }

    #[tokio::test]
    async fn cancelled_request_is_delivered_but_never_marked_completed() {
        let id = QuotationId::new();
        let user_id = Uuid::new_v4();
        let inner =
            Arc::new(InMemoryQuotationRepository::with_requests([pending_request(id, user_id)]));
        let gateway = Arc::new(RecordingGateway::new());
        let pipeline = pipeline_with(
            Arc::new(CancelledMidFlightRepository { inner: inner.clone() }),
            profiles_for(user_id),
            identities_for(user_id),
            gateway.clone(),
        );

        let report = pipeline.process_reply(&reply_body(&id)).await.expect("delivery succeeded");
        assert!(!report.finalized);
        assert_eq!(gateway.sent().len(), 1);

        // The completed-status write is refused outright, so the inner
        // row keeps the status the reply update gave it.
        let stored = inner.find_by_id(&id).await.expect("find").expect("row");
        assert_eq!(stored.status, QuotationStatus::Processing);
    }

    #[tokio::test]
    async fn missing_profile_is_terminal_and_keeps_the_applied_reply() {
        let id = QuotationId::new();
        let user_id = Uuid::new_v4();
        let requests =
            Arc::new(InMemoryQuotationRepository::with_requests([pending_request(id, user_id)]));
        let gateway = Arc::new(RecordingGateway::new());
        let pipeline = pipeline_with(
            requests.clone(),
            Arc::new(InMemoryProfileRepository::default()),
            identities_for(user_id),
            gateway.clone(),
        );

        let error = pipeline.process_reply(&reply_body(&id)).await.expect_err("no profile");
        assert!(matches!(error, FulfillmentError::AggregationFailed { .. }));
        assert!(gateway.sent().is_empty());

        let stored = requests.find_by_id(&id).await.expect("find").expect("row");
        assert_eq!(stored.status, QuotationStatus::Processing);
        assert_eq!(stored.price, Some(Decimal::new(50, 0)));
    }

    #[tokio::test]
    async fn missing_identity_is_terminal_and_keeps_the_applied_reply() {
        let id = QuotationId::new();
        let user_id = Uuid::new_v4();
        let requests =
            Arc::new(InMemoryQuotationRepository::with_requests([pending_request(id, user_id)]));
        let gateway = Arc::new(RecordingGateway::new());
        let pipeline = pipeline_with(
            requests.clone(),
            profiles_for(user_id),
            Arc::new(InMemoryIdentityRepository::default()),
            gateway.clone(),
        );

        let error = pipeline.process_reply(&reply_body(&id)).await.expect_err("no identity");
        assert!(matches!(error, FulfillmentError::AggregationFailed { .. }));
        assert!(gateway.sent().is_empty());

        let stored = requests.find_by_id(&id).await.expect("find").expect("row");
        assert_eq!(stored.status, QuotationStatus::Processing);
    }
}
