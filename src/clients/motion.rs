//! Task-management integration: creates a Motion project for qualified
//! leads (score at or above the threshold).

use chrono::{Duration, Utc};
use secrecy::ExposeSecret;
use serde_json::{Value, json};

use crate::clients::{API_TIMEOUT, status_error};
use crate::config::MotionConfig;
use crate::error::DispatchError;
use crate::intake::analysis::AiAnalysis;
use crate::intake::scoring::LeadScore;
use crate::intake::{IntakeKind, Submission};

const SERVICE: &str = "motion";
const API_BASE: &str = "https://api.usemotion.com";

/// Minimum score for project creation.
pub const TASK_SCORE_THRESHOLD: u32 = 60;

/// Motion API client.
pub struct MotionClient {
    config: MotionConfig,
    http: reqwest::Client,
}

impl MotionClient {
    pub fn new(config: MotionConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Create a follow-up project for a qualified lead.
    pub async fn create_project(
        &self,
        sub: &Submission,
        kind: IntakeKind,
        score: &LeadScore,
        analysis: &AiAnalysis,
    ) -> Result<(), DispatchError> {
        let payload = build_project_payload(
            sub,
            kind,
            score,
            analysis,
            self.config.workspace_id.as_deref(),
        );

        let response = self
            .http
            .post(format!("{API_BASE}/v1/projects"))
            .timeout(API_TIMEOUT)
            .header("X-API-Key", self.config.api_key.expose_secret())
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

pub(crate) fn build_project_payload(
    sub: &Submission,
    kind: IntakeKind,
    score: &LeadScore,
    analysis: &AiAnalysis,
    workspace_id: Option<&str>,
) -> Value {
    let name = format!(
        "{}: {}",
        kind.as_str().to_uppercase(),
        sub.display_name()
    );
    let priority = if score.score >= 80 { "HIGH" } else { "MEDIUM" };
    let due_date = (Utc::now() + Duration::days(7)).to_rfc3339();
    let score_band = score.score / 10 * 10;

    let mut payload = json!({
        "name": name,
        "description": build_description(sub, score, analysis),
        "priority": priority,
        "dueDate": due_date,
        "labels": [kind.as_str(), format!("score-{score_band}")],
    });
    if let Some(workspace) = workspace_id {
        payload["workspaceId"] = json!(workspace);
    }
    payload
}

fn build_description(sub: &Submission, score: &LeadScore, analysis: &AiAnalysis) -> String {
    let fallback = "(not available)";
    [
        format!("Lead score: {}/100", score.score),
        format!("Contact: {} <{}>", sub.display_name(), sub.email()),
        format!("Phone: {}", sub.phone()),
        String::new(),
        format!(
            "Analysis: {}",
            analysis.analysis.as_deref().unwrap_or(fallback)
        ),
        format!(
            "Recommendations: {}",
            analysis.recommendations.as_deref().unwrap_or(fallback)
        ),
        format!(
            "Risk flags: {}",
            analysis.risk_flags.as_deref().unwrap_or(fallback)
        ),
        format!(
            "Engagement: {}",
            analysis.engagement_strategy.as_deref().unwrap_or(fallback)
        ),
    ]
    .join("\n")
}
