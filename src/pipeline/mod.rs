//! Per-request intake orchestration.
//!
//! Flow: assign id → detect assessment conversion → filter attachments →
//! score → analyze (best-effort) → price → fan out to the collaborators,
//! each step independently. A step failure is logged and never aborts the
//! remaining steps; the caller always gets a success envelope.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info};

use crate::clients::StepOutcome;
use crate::clients::clio::ClioClient;
use crate::clients::graph::GraphMailer;
use crate::clients::mailchimp::{ContactRecord, MailchimpClient};
use crate::clients::motion::{MotionClient, TASK_SCORE_THRESHOLD};
use crate::config::AppConfig;
use crate::emails;
use crate::intake::analysis::{AiAnalysis, Analyzer};
use crate::intake::pricing::{self, PriceEstimate};
use crate::intake::scoring::{self, LeadScore};
use crate::intake::tags::{self, TagSet};
use crate::intake::{IntakeKind, Submission};
use crate::llm::LlmProvider;

/// Attachments above this size are dropped before fan-out.
const MAX_ATTACHMENT_BYTES: usize = 5 * 1024 * 1024;

/// At most this many attachments survive filtering.
const MAX_ATTACHMENTS: usize = 10;

/// What the HTTP layer needs to build the response envelope.
#[derive(Debug, Clone)]
pub struct IntakeReceipt {
    pub submission_id: String,
    pub lead_score: LeadScore,
    pub price: Option<PriceEstimate>,
    pub ai_analysis_available: bool,
}

/// Per-request orchestrator. Holds the immutable process-wide config and
/// one client per configured collaborator.
pub struct IntakePipeline {
    config: Arc<AppConfig>,
    analyzer: Analyzer,
    mailer: Option<GraphMailer>,
    mailchimp: Option<MailchimpClient>,
    motion: Option<MotionClient>,
    clio: Option<ClioClient>,
}

impl IntakePipeline {
    pub fn new(config: Arc<AppConfig>, llm: Option<Arc<dyn LlmProvider>>) -> Self {
        let mailer = config.graph.clone().map(GraphMailer::new);
        let mailchimp = config.mailchimp.clone().map(MailchimpClient::new);
        let motion = config.motion.clone().map(MotionClient::new);
        let clio = config.clio.clone().map(ClioClient::new);

        Self {
            config,
            analyzer: Analyzer::new(llm),
            mailer,
            mailchimp,
            motion,
            clio,
        }
    }

    /// Process one submission end to end. Infallible by contract: every
    /// downstream failure is caught, logged, and reflected only in the
    /// step outcomes.
    pub async fn process(&self, mut sub: Submission, kind: IntakeKind) -> IntakeReceipt {
        let submission_id = ensure_submission_id(&mut sub, kind);
        detect_conversion(&mut sub, kind);
        filter_attachments(&mut sub);

        let score = scoring::score(&sub, kind);
        info!(
            submission_id = %submission_id,
            kind = %kind,
            score = score.score,
            priority = score.priority(),
            "Scored intake submission"
        );

        // The analyzer completes before any dispatch so its output can be
        // embedded in the alert email and the task description.
        let analysis = self.analyzer.analyze(&sub, kind, &score).await;
        let price = pricing::estimate(&sub, kind);
        let tag_set = tags::derive(&sub, &score, kind);

        let steps = [
            (
                "internal-alert",
                self.send_alert(&sub, kind, &score, &analysis, price.as_ref())
                    .await,
            ),
            ("list-sync", self.sync_list(&sub, &tag_set).await),
            (
                "task-create",
                self.create_task(&sub, kind, &score, &analysis).await,
            ),
            ("crm-push", self.push_crm(&sub, kind, &score).await),
            (
                "client-confirmation",
                self.send_confirmation(&sub, kind, price.as_ref()).await,
            ),
        ];

        for (step, outcome) in &steps {
            match outcome {
                StepOutcome::Ok => info!(submission_id = %submission_id, step, "Step completed"),
                StepOutcome::Skipped { reason } => {
                    debug!(submission_id = %submission_id, step, reason, "Step skipped")
                }
                StepOutcome::Failed { message } => {
                    error!(submission_id = %submission_id, step, error = %message, "Step failed")
                }
            }
        }

        IntakeReceipt {
            submission_id,
            ai_analysis_available: analysis.is_available(),
            lead_score: score,
            price,
        }
    }

    async fn send_alert(
        &self,
        sub: &Submission,
        kind: IntakeKind,
        score: &LeadScore,
        analysis: &AiAnalysis,
        price: Option<&PriceEstimate>,
    ) -> StepOutcome {
        let Some(mailer) = &self.mailer else {
            return StepOutcome::Skipped {
                reason: "mail not configured",
            };
        };
        let Some(notify_to) = &self.config.notify_to else {
            return StepOutcome::Skipped {
                reason: "no alert recipient configured",
            };
        };

        let message = emails::internal_alert(
            sub,
            kind,
            score,
            analysis,
            price,
            notify_to,
            self.config.high_value_notify_to.as_deref(),
        );
        StepOutcome::from_result(mailer.send(&message).await)
    }

    async fn sync_list(&self, sub: &Submission, tag_set: &TagSet) -> StepOutcome {
        let Some(mailchimp) = &self.mailchimp else {
            return StepOutcome::Skipped {
                reason: "mailchimp not configured",
            };
        };
        if sub.email().is_empty() {
            return StepOutcome::Skipped {
                reason: "no email on submission",
            };
        }

        let contact = ContactRecord {
            email: sub.email().to_string(),
            merge_fields: tag_set.merge_fields.clone(),
            tags: tag_set.tags.clone(),
            timestamp: sub.received_at,
        };
        StepOutcome::from_result(mailchimp.upsert(&contact).await)
    }

    async fn create_task(
        &self,
        sub: &Submission,
        kind: IntakeKind,
        score: &LeadScore,
        analysis: &AiAnalysis,
    ) -> StepOutcome {
        let Some(motion) = &self.motion else {
            return StepOutcome::Skipped {
                reason: "motion not configured",
            };
        };
        if score.score < TASK_SCORE_THRESHOLD {
            return StepOutcome::Skipped {
                reason: "score below task threshold",
            };
        }
        StepOutcome::from_result(motion.create_project(sub, kind, score, analysis).await)
    }

    async fn push_crm(&self, sub: &Submission, kind: IntakeKind, score: &LeadScore) -> StepOutcome {
        let Some(clio) = &self.clio else {
            return StepOutcome::Skipped {
                reason: "clio not configured",
            };
        };
        StepOutcome::from_result(clio.push_lead(sub, kind, score).await)
    }

    async fn send_confirmation(
        &self,
        sub: &Submission,
        kind: IntakeKind,
        price: Option<&PriceEstimate>,
    ) -> StepOutcome {
        let Some(mailer) = &self.mailer else {
            return StepOutcome::Skipped {
                reason: "mail not configured",
            };
        };
        let Some(message) = emails::client_confirmation(
            sub,
            kind,
            price,
            self.config.notify_to.as_deref(),
            self.config.guide_pdf_url.as_deref(),
        ) else {
            return StepOutcome::Skipped {
                reason: "no client email",
            };
        };
        StepOutcome::from_result(mailer.send(&message).await)
    }

    /// Direct list subscription (`/add-subscriber`): no scoring, just an
    /// upsert with the caller-supplied tags and merge fields.
    pub async fn add_subscriber(
        &self,
        email: &str,
        tags: Vec<String>,
        merge_fields: serde_json::Map<String, serde_json::Value>,
    ) -> StepOutcome {
        let Some(mailchimp) = &self.mailchimp else {
            return StepOutcome::Skipped {
                reason: "mailchimp not configured",
            };
        };
        let contact = ContactRecord {
            email: email.to_string(),
            merge_fields,
            tags,
            timestamp: Utc::now(),
        };
        StepOutcome::from_result(mailchimp.upsert(&contact).await)
    }

    /// Record a cross-service conversion as list tags.
    pub async fn record_conversion(&self, email: &str, from: &str, to: &str) -> StepOutcome {
        let tags = vec![
            format!("converted-from-{from}"),
            format!("converted-to-{to}"),
        ];
        self.add_subscriber(email, tags, serde_json::Map::new())
            .await
    }
}

/// Assign `<kind>-<unix-ms>` when the caller did not provide an id.
fn ensure_submission_id(sub: &mut Submission, kind: IntakeKind) -> String {
    let existing = sub.field("submissionId");
    if !existing.is_empty() {
        return existing.to_string();
    }
    let id = format!("{kind}-{}", Utc::now().timestamp_millis());
    sub.set("submissionId", id.clone());
    id
}

/// Any positive signal marks the submission as an assessment conversion.
fn detect_conversion(sub: &mut Submission, kind: IntakeKind) {
    let from_referer = sub
        .referer
        .as_deref()
        .is_some_and(|r| r.contains("legal-strategy-builder"));
    let converted = sub.field("fromAssessment") == "true"
        || sub.field("source") == "legal-strategy-builder-conversion"
        || from_referer;

    if converted {
        sub.set("conversionSource", "legal-strategy-builder");
        sub.set("conversionType", format!("assessment-to-{kind}"));
    }
}

/// Drop oversized attachments, keep at most [`MAX_ATTACHMENTS`].
fn filter_attachments(sub: &mut Submission) {
    let before = sub.attachments.len();
    sub.attachments.retain(|a| a.size() <= MAX_ATTACHMENT_BYTES);
    sub.attachments.truncate(MAX_ATTACHMENTS);
    let dropped = before - sub.attachments.len();
    if dropped > 0 {
        debug!(dropped, kept = sub.attachments.len(), "Filtered attachments");
    }
}
