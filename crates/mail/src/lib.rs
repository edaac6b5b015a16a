//! Outbound email delivery.
//!
//! [`DeliveryGateway`] is the transport seam the fulfillment pipeline
//! and the intake notifier send through. The production implementation
//! posts the SendGrid v3 mail-send JSON shape over an injected
//! `reqwest` client; [`RecordingGateway`] captures messages for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailAttachment {
    pub content: Vec<u8>,
    pub filename: String,
    pub mime_type: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub html_body: String,
    pub attachments: Vec<EmailAttachment>,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("delivery rejected with status {status}: {detail}")]
    Rejected { status: u16, detail: String },
}

#[async_trait]
pub trait DeliveryGateway: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<(), DeliveryError>;
}

// ---------------------------------------------------------------------------
// SendGrid wire format
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct MailSendBody<'a> {
    personalizations: [Personalization<'a>; 1],
    from: Address<'a>,
    subject: &'a str,
    content: [Content<'a>; 1],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<WireAttachment<'a>>,
}

#[derive(Serialize)]
struct Personalization<'a> {
    to: [Address<'a>; 1],
}

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    content_type: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
struct WireAttachment<'a> {
    content: String,
    filename: &'a str,
    #[serde(rename = "type")]
    mime_type: &'a str,
    disposition: &'static str,
}

fn wire_body(email: &OutboundEmail) -> MailSendBody<'_> {
    MailSendBody {
        personalizations: [Personalization { to: [Address { email: &email.to }] }],
        from: Address { email: &email.from },
        subject: &email.subject,
        content: [Content { content_type: "text/html", value: &email.html_body }],
        attachments: email
            .attachments
            .iter()
            .map(|attachment| WireAttachment {
                content: BASE64.encode(&attachment.content),
                filename: &attachment.filename,
                mime_type: &attachment.mime_type,
                disposition: "attachment",
            })
            .collect(),
    }
}

/// SendGrid-compatible HTTP delivery gateway.
pub struct SendGridGateway {
    client: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
}

impl SendGridGateway {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, api_key: SecretString) -> Self {
        Self { client, endpoint: endpoint.into(), api_key }
    }
}

#[async_trait]
impl DeliveryGateway for SendGridGateway {
    async fn send(&self, email: &OutboundEmail) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&wire_body(email))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected { status: status.as_u16(), detail });
        }

        info!(
            event_name = "mail.delivery.sent",
            to = %email.to,
            subject = %email.subject,
            attachments = email.attachments.len(),
            "outbound email accepted by transport"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Test double
// ---------------------------------------------------------------------------

/// Gateway double that records every message instead of sending it.
/// Optionally fails each send to exercise delivery-failure paths.
#[derive(Default)]
pub struct RecordingGateway {
    sent: Mutex<Vec<OutboundEmail>>,
    fail_sends: bool,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self { sent: Mutex::new(Vec::new()), fail_sends: true }
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().expect("lock").clone()
    }
}

#[async_trait]
impl DeliveryGateway for RecordingGateway {
    async fn send(&self, email: &OutboundEmail) -> Result<(), DeliveryError> {
        if self.fail_sends {
            return Err(DeliveryError::Rejected {
                status: 503,
                detail: "transport unavailable".to_string(),
            });
        }

        self.sent.lock().expect("lock").push(email.clone());
        Ok(())
    }
}
