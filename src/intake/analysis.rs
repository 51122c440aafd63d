//! AI-assisted strategic analysis of a scored submission.
//!
//! One chat-completion call with a fixed legal-strategist system prompt;
//! the model is asked for five labeled sections which are split back out
//! of the free-text reply. Best-effort by contract: any failure (no API
//! key, network, non-2xx, missing markers) degrades to null fields and
//! the pipeline continues.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::intake::scoring::LeadScore;
use crate::intake::{IntakeKind, Submission};
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};

const ANALYSIS_TEMPERATURE: f32 = 0.3;
const ANALYSIS_MAX_TOKENS: u32 = 1000;

const MARKERS: [&str; 5] = [
    "STRATEGIC_ANALYSIS:",
    "RECOMMENDATIONS:",
    "RISK_FLAGS:",
    "ENGAGEMENT_STRATEGY:",
    "CLIENT_LIFETIME_VALUE:",
];

/// A section ends at the next `LABEL:` style marker or end-of-text.
static NEXT_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Z_]{2,}:").expect("marker regex"));

/// Parsed analysis. A null field means the call failed or the marker was
/// absent from the model output.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnalysis {
    pub analysis: Option<String>,
    pub recommendations: Option<String>,
    pub risk_flags: Option<String>,
    pub engagement_strategy: Option<String>,
    pub lifetime_value: Option<String>,
}

impl AiAnalysis {
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when at least one section was extracted.
    pub fn is_available(&self) -> bool {
        self.analysis.is_some()
            || self.recommendations.is_some()
            || self.risk_flags.is_some()
            || self.engagement_strategy.is_some()
            || self.lifetime_value.is_some()
    }
}

/// Analyzer wrapping an optional LLM provider.
pub struct Analyzer {
    llm: Option<Arc<dyn LlmProvider>>,
}

impl Analyzer {
    pub fn new(llm: Option<Arc<dyn LlmProvider>>) -> Self {
        Self { llm }
    }

    /// Analyze a scored submission. Never fails; logs and returns empty
    /// on any provider error.
    pub async fn analyze(
        &self,
        sub: &Submission,
        kind: IntakeKind,
        score: &LeadScore,
    ) -> AiAnalysis {
        let Some(llm) = &self.llm else {
            debug!("Analyzer disabled (no API key), skipping");
            return AiAnalysis::empty();
        };

        let request = CompletionRequest::new(vec![
            ChatMessage::system(build_system_prompt()),
            ChatMessage::user(build_user_prompt(sub, kind, score)),
        ])
        .with_temperature(ANALYSIS_TEMPERATURE)
        .with_max_tokens(ANALYSIS_MAX_TOKENS);

        match llm.complete(request).await {
            Ok(response) => parse_sections(&response.content),
            Err(e) => {
                warn!(error = %e, "AI analysis failed, continuing with null analysis");
                AiAnalysis::empty()
            }
        }
    }
}

fn build_system_prompt() -> String {
    "You are a senior legal strategist at a boutique law practice reviewing a new \
     client intake. Assess the submission for commercial fit, legal risk, and \
     engagement approach.\n\n\
     Respond with exactly these five labeled sections, in order:\n\
     STRATEGIC_ANALYSIS: two or three sentences on the client's situation and needs.\n\
     RECOMMENDATIONS: the concrete services and packages to propose.\n\
     RISK_FLAGS: anything that needs attorney attention before engagement.\n\
     ENGAGEMENT_STRATEGY: how and how fast to follow up.\n\
     CLIENT_LIFETIME_VALUE: a dollar range estimate with one line of reasoning.\n\n\
     Use plain prose under each label. Do not add other sections."
        .to_string()
}

fn build_user_prompt(sub: &Submission, kind: IntakeKind, score: &LeadScore) -> String {
    let mut prompt = String::with_capacity(512);
    prompt.push_str(&format!("Intake type: {}\n", kind.label()));
    prompt.push_str(&format!("Lead score: {}/100\n", score.score));
    if !score.factors.is_empty() {
        prompt.push_str(&format!("Score factors: {}\n", score.factors.join("; ")));
    }
    prompt.push_str("\nSubmission:\n");
    for (key, value) in sub.iter_fields() {
        prompt.push_str(&format!("  {key}: {value}\n"));
    }
    prompt
}

/// Split the model reply into the five labeled sections.
///
/// For each marker: content runs from just past the marker to the next
/// `[A-Z_]+:` occurrence (or end of text), trimmed. Absent marker → null.
pub(crate) fn parse_sections(text: &str) -> AiAnalysis {
    let section = |marker: &str| -> Option<String> {
        let start = text.find(marker)? + marker.len();
        let rest = &text[start..];
        let end = NEXT_MARKER.find(rest).map(|m| m.start()).unwrap_or(rest.len());
        let content = rest[..end].trim();
        if content.is_empty() {
            None
        } else {
            Some(content.to_string())
        }
    };

    AiAnalysis {
        analysis: section(MARKERS[0]),
        recommendations: section(MARKERS[1]),
        risk_flags: section(MARKERS[2]),
        engagement_strategy: section(MARKERS[3]),
        lifetime_value: section(MARKERS[4]),
    }
}
