//! Core intake types — submissions, intake kinds, attachments.
//!
//! A `Submission` is the unified inbound record: every route (multipart or
//! JSON) converts its request into this struct before the pipeline runs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod analysis;
pub mod pricing;
pub mod scoring;
pub mod tags;

// ── Intake kind ─────────────────────────────────────────────────────

/// Category of form submission. Determines the scoring table, the
/// downstream sequence tags, and the shape of the CRM message body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntakeKind {
    EstateIntake,
    BusinessFormation,
    BrandProtection,
    OutsideCounsel,
    LegalStrategyBuilder,
    LegalGuideDownload,
    ChatIntake,
}

impl IntakeKind {
    /// Kebab-case identifier used in tags, submission ids, and labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EstateIntake => "estate-intake",
            Self::BusinessFormation => "business-formation",
            Self::BrandProtection => "brand-protection",
            Self::OutsideCounsel => "outside-counsel",
            Self::LegalStrategyBuilder => "legal-strategy-builder",
            Self::LegalGuideDownload => "legal-guide-download",
            Self::ChatIntake => "chat-intake",
        }
    }

    /// Human-readable service label for emails and CRM records.
    pub fn label(&self) -> &'static str {
        match self {
            Self::EstateIntake => "Estate Planning",
            Self::BusinessFormation => "Business Formation",
            Self::BrandProtection => "Brand Protection",
            Self::OutsideCounsel => "Outside Counsel",
            Self::LegalStrategyBuilder => "Legal Strategy Assessment",
            Self::LegalGuideDownload => "Legal Guide Download",
            Self::ChatIntake => "Chat Intake",
        }
    }

    /// Parse a kebab-case identifier. Unknown strings return `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "estate-intake" => Some(Self::EstateIntake),
            "business-formation" => Some(Self::BusinessFormation),
            "brand-protection" => Some(Self::BrandProtection),
            "outside-counsel" => Some(Self::OutsideCounsel),
            "legal-strategy-builder" => Some(Self::LegalStrategyBuilder),
            "legal-guide-download" => Some(Self::LegalGuideDownload),
            "chat-intake" => Some(Self::ChatIntake),
            _ => None,
        }
    }
}

impl std::fmt::Display for IntakeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Attachments ─────────────────────────────────────────────────────

/// An uploaded file, held in memory for the duration of the request.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

// ── Submission ──────────────────────────────────────────────────────

/// Unified inbound form submission.
///
/// Keys are not statically known — the same submission may carry keys
/// from any intake kind. The pipeline annotates it with
/// `conversionSource` / `conversionType` before downstream calls; it is
/// otherwise never mutated after scoring.
#[derive(Debug, Clone)]
pub struct Submission {
    fields: BTreeMap<String, String>,
    pub attachments: Vec<Attachment>,
    pub received_at: DateTime<Utc>,
    /// Referer header, when the HTTP layer captured one.
    pub referer: Option<String>,
}

impl Submission {
    pub fn new() -> Self {
        Self {
            fields: BTreeMap::new(),
            attachments: Vec::new(),
            received_at: Utc::now(),
            referer: None,
        }
    }

    pub fn from_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut sub = Self::new();
        for (k, v) in fields {
            sub.set(k, v);
        }
        sub
    }

    /// Field value, trimmed. Missing keys read as the empty string.
    pub fn field(&self, key: &str) -> &str {
        self.fields.get(key).map(|v| v.trim()).unwrap_or("")
    }

    pub fn has(&self, key: &str) -> bool {
        !self.field(key).is_empty()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Iterate non-empty fields in key order (stable for prompts/emails).
    pub fn iter_fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .map(|(k, v)| (k.as_str(), v.trim()))
    }

    pub fn email(&self) -> &str {
        self.field("email")
    }

    pub fn phone(&self) -> &str {
        self.field("phone")
    }

    /// First/last name, preferring explicit fields and falling back to a
    /// whitespace split of the first present full-name style field.
    pub fn name_parts(&self) -> (String, String) {
        let first = self.field("firstName");
        let last = self.field("lastName");
        if !first.is_empty() || !last.is_empty() {
            return (first.to_string(), last.to_string());
        }
        for key in ["fullName", "contactName", "founderName", "name"] {
            let full = self.field(key);
            if !full.is_empty() {
                return split_name(full);
            }
        }
        (String::new(), String::new())
    }

    /// Display name for email subjects and CRM project names.
    pub fn display_name(&self) -> String {
        let (first, last) = self.name_parts();
        let name = format!("{first} {last}").trim().to_string();
        if name.is_empty() {
            let email = self.email();
            if email.is_empty() {
                "Unknown".to_string()
            } else {
                email.to_string()
            }
        } else {
            name
        }
    }
}

impl Default for Submission {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a full name on whitespace: first token → first name, remainder
/// rejoined → last name.
pub fn split_name(full: &str) -> (String, String) {
    let mut parts = full.split_whitespace();
    let first = parts.next().unwrap_or("").to_string();
    let last = parts.collect::<Vec<_>>().join(" ");
    (first, last)
}

/// Case-insensitive substring check (the scoring/tagging rule primitive).
pub fn ci_contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_identifiers() {
        for kind in [
            IntakeKind::EstateIntake,
            IntakeKind::BusinessFormation,
            IntakeKind::BrandProtection,
            IntakeKind::OutsideCounsel,
            IntakeKind::LegalStrategyBuilder,
            IntakeKind::LegalGuideDownload,
            IntakeKind::ChatIntake,
        ] {
            assert_eq!(IntakeKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(IntakeKind::parse("estate"), None);
    }

    #[test]
    fn field_access_trims_and_defaults() {
        let sub = Submission::from_fields([("email", "  jane@acme.io  ")]);
        assert_eq!(sub.field("email"), "jane@acme.io");
        assert_eq!(sub.field("missing"), "");
        assert!(sub.has("email"));
        assert!(!sub.has("missing"));
    }

    #[test]
    fn name_parts_prefers_explicit_fields() {
        let sub = Submission::from_fields([
            ("firstName", "Jane"),
            ("lastName", "Doe"),
            ("fullName", "Ignored Person"),
        ]);
        assert_eq!(sub.name_parts(), ("Jane".into(), "Doe".into()));
    }

    #[test]
    fn name_parts_splits_full_name() {
        let sub = Submission::from_fields([("fullName", "Mary Anne van der Berg")]);
        assert_eq!(
            sub.name_parts(),
            ("Mary".into(), "Anne van der Berg".into())
        );
    }

    #[test]
    fn name_parts_falls_back_through_candidates() {
        let sub = Submission::from_fields([("founderName", "Ada Lovelace")]);
        assert_eq!(sub.name_parts(), ("Ada".into(), "Lovelace".into()));
    }

    #[test]
    fn display_name_falls_back_to_email() {
        let sub = Submission::from_fields([("email", "x@firm.com")]);
        assert_eq!(sub.display_name(), "x@firm.com");
        assert_eq!(Submission::new().display_name(), "Unknown");
    }

    #[test]
    fn ci_contains_ignores_case() {
        assert!(ci_contains("Portfolio-7500", "portfolio"));
        assert!(ci_contains("IMMEDIATE need", "Immediate"));
        assert!(!ci_contains("exploratory", "immediate"));
    }
}
