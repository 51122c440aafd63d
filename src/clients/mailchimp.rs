//! Marketing-list sync via the Mailchimp members API.
//!
//! Upsert semantics: POST a new member; a 400 response is taken as
//! "already exists" and retried as a PATCH keyed by the subscriber hash
//! (MD5 of the trimmed, lowercased email).

use md5::{Digest, Md5};
use secrecy::ExposeSecret;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::clients::{API_TIMEOUT, status_error};
use crate::config::MailchimpConfig;
use crate::error::DispatchError;

const SERVICE: &str = "mailchimp";

/// Contact record for list upsert.
#[derive(Debug, Clone)]
pub struct ContactRecord {
    pub email: String,
    pub merge_fields: Map<String, Value>,
    pub tags: Vec<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Mailchimp member identifier: MD5 of the trimmed, lowercased email.
pub fn subscriber_hash(email: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(email.trim().to_lowercase().as_bytes());
    hex::encode(hasher.finalize())
}

/// Mailchimp audience client.
pub struct MailchimpClient {
    config: MailchimpConfig,
    http: reqwest::Client,
}

impl MailchimpClient {
    pub fn new(config: MailchimpConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn members_url(&self) -> String {
        format!(
            "https://{}.api.mailchimp.com/3.0/lists/{}/members",
            self.config.server, self.config.audience_id
        )
    }

    /// Upsert one contact: POST, then PATCH-by-hash on conflict.
    pub async fn upsert(&self, contact: &ContactRecord) -> Result<(), DispatchError> {
        let body = json!({
            "email_address": contact.email,
            "status": "subscribed",
            "merge_fields": contact.merge_fields,
            "tags": contact.tags,
            "timestamp_signup": contact.timestamp.to_rfc3339(),
        });

        let response = self
            .http
            .post(self.members_url())
            .timeout(API_TIMEOUT)
            .basic_auth("anystring", Some(self.config.api_key.expose_secret()))
            .json(&body)
            .send()
            .await
            .map_err(|e| DispatchError::request(SERVICE, e))?;

        let status = response.status();
        if status.is_success() {
            debug!(email = %contact.email, "Added new list member");
            return Ok(());
        }

        // 400 means the member already exists — update instead.
        if status.as_u16() == 400 {
            return self.patch_existing(contact).await;
        }

        Err(status_error(SERVICE, response).await)
    }

    async fn patch_existing(&self, contact: &ContactRecord) -> Result<(), DispatchError> {
        let url = format!(
            "{}/{}",
            self.members_url(),
            subscriber_hash(&contact.email)
        );
        let body = json!({
            "merge_fields": contact.merge_fields,
            "tags": contact.tags,
        });

        let response = self
            .http
            .patch(&url)
            .timeout(API_TIMEOUT)
            .basic_auth("anystring", Some(self.config.api_key.expose_secret()))
            .json(&body)
            .send()
            .await
            .map_err(|e| DispatchError::request(SERVICE, e))?;

        if !response.status().is_success() {
            return Err(status_error(SERVICE, response).await);
        }
        debug!(email = %contact.email, "Updated existing list member");
        Ok(())
    }
}
