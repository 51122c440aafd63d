//! CRM intake push — posts an inbox lead to Clio Grow.
//!
//! The lead message body is a newline-joined, kind-specific summary so
//! the CRM shows the salient facts without opening the alert email.

use secrecy::ExposeSecret;
use serde_json::json;

use crate::clients::{API_TIMEOUT, status_error};
use crate::config::ClioConfig;
use crate::error::DispatchError;
use crate::intake::scoring::LeadScore;
use crate::intake::{IntakeKind, Submission, split_name};

const SERVICE: &str = "clio";

/// Clio Grow inbox client.
pub struct ClioClient {
    config: ClioConfig,
    http: reqwest::Client,
}

impl ClioClient {
    pub fn new(config: ClioConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Push one lead record.
    pub async fn push_lead(
        &self,
        sub: &Submission,
        kind: IntakeKind,
        score: &LeadScore,
    ) -> Result<(), DispatchError> {
        let (first, last) = lead_name(sub, kind);
        let body = json!({
            "inbox_lead": {
                "from_first": first,
                "from_last": last,
                "from_email": sub.email(),
                "from_phone": sub.phone(),
                "from_message": build_message(sub, kind, score),
                "referring_url": sub.referer.as_deref().unwrap_or(""),
                "from_source": format!("Website intake: {}", kind.label()),
            },
            "inbox_lead_token": self.config.inbox_token.expose_secret(),
        });

        let response = self
            .http
            .post(format!("{}/inbox_leads", self.config.base_url))
            .timeout(API_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| DispatchError::request(SERVICE, e))?;

        if !response.status().is_success() {
            return Err(status_error(SERVICE, response).await);
        }
        Ok(())
    }
}

/// Per-kind name extraction: estate forms carry split fields, the others
/// carry a single full-name style field.
pub(crate) fn lead_name(sub: &Submission, kind: IntakeKind) -> (String, String) {
    match kind {
        IntakeKind::EstateIntake => (
            sub.field("firstName").to_string(),
            sub.field("lastName").to_string(),
        ),
        IntakeKind::BusinessFormation if sub.has("founderName") => {
            split_name(sub.field("founderName"))
        }
        IntakeKind::BrandProtection if sub.has("fullName") => split_name(sub.field("fullName")),
        IntakeKind::OutsideCounsel if sub.has("contactName") => {
            split_name(sub.field("contactName"))
        }
        _ => sub.name_parts(),
    }
}

/// Build the kind-specific lead summary.
pub(crate) fn build_message(sub: &Submission, kind: IntakeKind, score: &LeadScore) -> String {
    let mut lines = vec![
        format!("{} intake", kind.label()),
        format!("Lead score: {}/100", score.score),
    ];

    let mut line = |label: &str, key: &str| {
        if sub.has(key) {
            lines.push(format!("{label}: {}", sub.field(key)));
        }
    };

    match kind {
        IntakeKind::EstateIntake => {
            line("State", "state");
            line("Marital status", "maritalStatus");
            line("Package", "packagePreference");
            line("Gross estate", "grossEstate");
        }
        IntakeKind::BusinessFormation => {
            line("Business", "businessName");
            line("Business type", "businessType");
            line("Investment plan", "investmentPlan");
            line("Package", "selectedPackage");
        }
        IntakeKind::BrandProtection => {
            line("Protection goal", "protectionGoal");
            line("Geographic scope", "geographicScope");
            line("Service preference", "servicePreference");
        }
        IntakeKind::OutsideCounsel => {
            line("Budget", "budget");
            line("Timeline", "timeline");
            line("Stage", "stage");
            line("Services", "services");
        }
        _ => {
            line("Source", "source");
            line("Message", "message");
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score() -> LeadScore {
        LeadScore {
            score: 65,
            factors: vec![],
        }
    }

    #[test]
    fn estate_uses_split_fields_directly() {
        let sub = Submission::from_fields([("firstName", "Jane"), ("lastName", "Doe")]);
        assert_eq!(
            lead_name(&sub, IntakeKind::EstateIntake),
            ("Jane".into(), "Doe".into())
        );
    }

    #[test]
    fn business_splits_founder_name() {
        let sub = Submission::from_fields([("founderName", "Grace Brewster Hopper")]);
        assert_eq!(
            lead_name(&sub, IntakeKind::BusinessFormation),
            ("Grace".into(), "Brewster Hopper".into())
        );
    }

    #[test]
    fn counsel_splits_contact_name() {
        let sub = Submission::from_fields([("contactName", "Ada Lovelace")]);
        assert_eq!(
            lead_name(&sub, IntakeKind::OutsideCounsel),
            ("Ada".into(), "Lovelace".into())
        );
    }

    #[test]
    fn missing_kind_field_falls_back_to_generic_extraction() {
        let sub = Submission::from_fields([("firstName", "Jo"), ("lastName", "March")]);
        assert_eq!(
            lead_name(&sub, IntakeKind::BrandProtection),
            ("Jo".into(), "March".into())
        );
    }

    #[test]
    fn estate_message_lists_salient_fields() {
        let sub = Submission::from_fields([
            ("state", "NY"),
            ("maritalStatus", "Married"),
            ("packagePreference", "Trust"),
            ("grossEstate", "$2,500,000"),
        ]);
        let message = build_message(&sub, IntakeKind::EstateIntake, &score());
        assert!(message.starts_with("Estate Planning intake\nLead score: 65/100"));
        assert!(message.contains("State: NY"));
        assert!(message.contains("Package: Trust"));
        assert!(message.contains("Gross estate: $2,500,000"));
    }

    #[test]
    fn business_message_lists_business_fields() {
        let sub = Submission::from_fields([
            ("businessName", "Acme Robotics"),
            ("investmentPlan", "vc"),
            ("selectedPackage", "gold"),
        ]);
        let message = build_message(&sub, IntakeKind::BusinessFormation, &score());
        assert!(message.contains("Business: Acme Robotics"));
        assert!(message.contains("Investment plan: vc"));
        assert!(message.contains("Package: gold"));
    }

    #[test]
    fn empty_fields_are_omitted() {
        let sub = Submission::new();
        let message = build_message(&sub, IntakeKind::OutsideCounsel, &score());
        assert_eq!(message, "Outside Counsel intake\nLead score: 65/100");
    }
}
