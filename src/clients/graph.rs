//! Outbound mail via the Microsoft Graph sendMail API.
//!
//! Two-step contract: acquire a bearer token with the client-credentials
//! flow against the tenant's token endpoint, then POST the message to
//! `/v1.0/users/{sender}/sendMail`. Tokens are not cached — each send
//! fetches a fresh one.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use secrecy::ExposeSecret;
use serde_json::{Value, json};
use tracing::debug;

use crate::clients::{API_TIMEOUT, status_error};
use crate::config::GraphConfig;
use crate::error::DispatchError;
use crate::intake::Attachment;

const SERVICE: &str = "graph";

/// At most this many attachments are forwarded per message.
const MAX_FORWARDED_ATTACHMENTS: usize = 10;

/// One outbound mail message.
#[derive(Debug, Clone)]
pub struct MailMessage {
    pub subject: String,
    pub html_body: String,
    pub to: Vec<String>,
    pub high_importance: bool,
    pub attachments: Vec<Attachment>,
}

/// Graph mail client.
pub struct GraphMailer {
    config: GraphConfig,
    http: reqwest::Client,
}

impl GraphMailer {
    pub fn new(config: GraphConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    async fn fetch_token(&self) -> Result<String, DispatchError> {
        let url = format!(
            "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
            self.config.tenant_id
        );
        let response = self
            .http
            .post(&url)
            .timeout(API_TIMEOUT)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.expose_secret()),
                ("scope", "https://graph.microsoft.com/.default"),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await
            .map_err(|e| DispatchError::request("graph", e))?;

        if !response.status().is_success() {
            return Err(status_error(SERVICE, response).await);
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| DispatchError::request(SERVICE, e))?;
        payload["access_token"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| DispatchError::InvalidResponse {
                service: SERVICE,
                reason: "token response missing access_token".into(),
            })
    }

    /// Send one message as the configured sender.
    pub async fn send(&self, message: &MailMessage) -> Result<(), DispatchError> {
        let token = self.fetch_token().await?;

        let url = format!(
            "https://graph.microsoft.com/v1.0/users/{}/sendMail",
            self.config.sender
        );
        let payload = build_send_payload(message);

        debug!(
            subject = %message.subject,
            recipients = message.to.len(),
            attachments = message.attachments.len().min(MAX_FORWARDED_ATTACHMENTS),
            "Sending mail via Graph"
        );

        let response = self
            .http
            .post(&url)
            .timeout(API_TIMEOUT)
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| DispatchError::request(SERVICE, e))?;

        if !response.status().is_success() {
            return Err(status_error(SERVICE, response).await);
        }
        Ok(())
    }
}

/// Build the sendMail JSON body. Attachments beyond the forwarding cap
/// are dropped; each kept one is base64-encoded.
pub(crate) fn build_send_payload(message: &MailMessage) -> Value {
    let recipients: Vec<Value> = message
        .to
        .iter()
        .map(|addr| json!({ "emailAddress": { "address": addr } }))
        .collect();

    let attachments: Vec<Value> = message
        .attachments
        .iter()
        .take(MAX_FORWARDED_ATTACHMENTS)
        .map(|a| {
            json!({
                "@odata.type": "#microsoft.graph.fileAttachment",
                "name": a.filename,
                "contentType": a.content_type,
                "contentBytes": BASE64.encode(&a.data),
            })
        })
        .collect();

    json!({
        "message": {
            "subject": message.subject,
            "body": { "contentType": "HTML", "content": message.html_body },
            "toRecipients": recipients,
            "importance": if message.high_importance { "high" } else { "normal" },
            "attachments": attachments,
        },
        "saveToSentItems": true,
    })
}
