//! HTTP surface: axum router, request → `Submission` extraction, and the
//! per-form route handlers.
//!
//! Every intake route accepts JSON, form-urlencoded, or multipart bodies
//! and converts them into the same `Submission` before handing off to the
//! pipeline. Only validation and upload-limit errors surface to callers;
//! downstream failures never do.

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, FromRequest, Multipart, Request, State};
use axum::http::header;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::intake::pricing::PriceEstimate;
use crate::intake::scoring;
use crate::intake::{Attachment, IntakeKind, Submission};
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::pipeline::IntakePipeline;

// ── Upload limits ───────────────────────────────────────────────────

const MAX_FILE_BYTES: usize = 15 * 1024 * 1024;
const MAX_FILES: usize = 15;
const MAX_TEXT_BYTES: usize = 5 * 1024 * 1024;

/// Whole-body cap: the per-file and per-count limits are enforced field
/// by field below, so this only has to cover the worst legal case.
const REQUEST_BODY_LIMIT: usize = MAX_FILES * MAX_FILE_BYTES + MAX_TEXT_BYTES;

/// Multipart field names that may carry a file. Anything else with a
/// filename is rejected with 400.
const FILE_FIELDS: [&str; 5] = ["document", "documents", "brandDocument", "file", "attachment"];

// ── State and router ────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<IntakePipeline>,
    pub llm: Option<Arc<dyn LlmProvider>>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/estate-intake", post(estate_intake))
        .route("/business-formation-intake", post(business_formation_intake))
        .route("/brand-protection-intake", post(brand_protection_intake))
        .route("/outside-counsel", post(outside_counsel_intake))
        .route("/legal-strategy-builder", post(strategy_builder_intake))
        .route("/add-subscriber", post(add_subscriber))
        .route("/legal-guide", post(guide_download))
        .route("/download-primary-guide", post(guide_download))
        .route("/download-specialized-guide", post(guide_download))
        .route("/api/chat-intake", post(chat_intake))
        .route("/api/generate-document", post(generate_document))
        .route("/api/predict-clv", post(predict_clv))
        .route("/api/analytics/form-event", post(analytics_form_event))
        .route("/api/analytics/conversion", post(analytics_conversion))
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(REQUEST_BODY_LIMIT))
        .with_state(state)
}

// ── Submission extraction ───────────────────────────────────────────

/// Convert any accepted body (multipart, JSON, form-urlencoded) into a
/// `Submission`, capturing the Referer header along the way.
async fn read_submission(request: Request) -> Result<Submission, ApiError> {
    let referer = request
        .headers()
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let mut sub = if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| ApiError::Validation(format!("Malformed multipart body: {e}")))?;
        read_multipart(multipart).await?
    } else {
        // Non-multipart bodies are text: the 5 MiB text cap applies to
        // the whole body, not just multipart fields.
        let (parts, body) = request.into_parts();
        let bytes = axum::body::to_bytes(body, MAX_TEXT_BYTES).await.map_err(|_| {
            ApiError::FileLimit(format!(
                "Request body exceeds the {} MiB limit",
                MAX_TEXT_BYTES / (1024 * 1024)
            ))
        })?;

        if content_type.starts_with("application/json") || content_type.is_empty() {
            let value: Value = if bytes.is_empty() {
                Value::Object(Default::default())
            } else {
                serde_json::from_slice(&bytes)
                    .map_err(|e| ApiError::Validation(format!("Invalid JSON body: {e}")))?
            };
            let mut sub = Submission::new();
            flatten_json(&mut sub, &value);
            sub
        } else {
            let request = Request::from_parts(parts, axum::body::Body::from(bytes));
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(request, &())
                .await
                .map_err(|e| ApiError::Validation(format!("Invalid form body: {e}")))?;
            let mut sub = Submission::new();
            for (key, value) in pairs {
                sub.set(key, value);
            }
            sub
        }
    };

    sub.referer = referer;
    Ok(sub)
}

async fn read_multipart(mut multipart: Multipart) -> Result<Submission, ApiError> {
    let mut sub = Submission::new();
    let mut text_bytes = 0usize;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Malformed multipart field: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        let filename = field.file_name().map(str::to_string);
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        match filename {
            Some(filename) => {
                if !is_file_field(&name) {
                    return Err(ApiError::UnexpectedField(name));
                }
                if sub.attachments.len() >= MAX_FILES {
                    return Err(ApiError::FileLimit(format!(
                        "Too many files (limit {MAX_FILES})"
                    )));
                }
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::FileLimit(format!("Upload failed: {e}")))?;
                if data.len() > MAX_FILE_BYTES {
                    return Err(ApiError::FileLimit(format!(
                        "File {filename} exceeds the {} MiB limit",
                        MAX_FILE_BYTES / (1024 * 1024)
                    )));
                }
                sub.attachments.push(Attachment {
                    filename,
                    content_type,
                    data: data.to_vec(),
                });
            }
            None => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Validation(format!("Unreadable field {name}: {e}")))?;
                text_bytes += text.len();
                if text_bytes > MAX_TEXT_BYTES {
                    return Err(ApiError::FileLimit("Form data too large".to_string()));
                }
                sub.set(name, text);
            }
        }
    }

    Ok(sub)
}

fn is_file_field(name: &str) -> bool {
    let base = name.strip_suffix("[]").unwrap_or(name);
    FILE_FIELDS.contains(&base)
}

/// Flatten a JSON object into string fields: scalars stringified, arrays
/// comma-joined, nested objects kept as raw JSON, nulls dropped.
fn flatten_json(sub: &mut Submission, value: &Value) {
    let Value::Object(map) = value else { return };
    for (key, v) in map {
        let key = key.as_str();
        match v {
            Value::String(s) => sub.set(key, s.clone()),
            Value::Number(n) => sub.set(key, n.to_string()),
            Value::Bool(b) => sub.set(key, b.to_string()),
            Value::Array(items) => {
                let joined = items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(",");
                sub.set(key, joined);
            }
            Value::Object(_) => sub.set(key, v.to_string()),
            Value::Null => {}
        }
    }
}

// ── Intake routes ───────────────────────────────────────────────────

async fn service_info() -> Json<Value> {
    Json(json!({
        "ok": true,
        "service": "intake-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "/estate-intake",
            "/business-formation-intake",
            "/brand-protection-intake",
            "/outside-counsel",
            "/legal-strategy-builder",
            "/add-subscriber",
            "/legal-guide",
            "/api/chat-intake",
            "/api/generate-document",
            "/api/predict-clv",
        ],
        "features": ["lead-scoring", "ai-analysis", "pricing", "crm-sync"],
    }))
}

async fn estate_intake(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<Value>, ApiError> {
    intake_response(&state, IntakeKind::EstateIntake, request).await
}

async fn business_formation_intake(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<Value>, ApiError> {
    intake_response(&state, IntakeKind::BusinessFormation, request).await
}

async fn brand_protection_intake(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<Value>, ApiError> {
    intake_response(&state, IntakeKind::BrandProtection, request).await
}

async fn outside_counsel_intake(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<Value>, ApiError> {
    intake_response(&state, IntakeKind::OutsideCounsel, request).await
}

async fn strategy_builder_intake(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<Value>, ApiError> {
    intake_response(&state, IntakeKind::LegalStrategyBuilder, request).await
}

async fn intake_response(
    state: &AppState,
    kind: IntakeKind,
    request: Request,
) -> Result<Json<Value>, ApiError> {
    let sub = read_submission(request).await?;
    let receipt = state.pipeline.process(sub, kind).await;

    let mut body = json!({
        "ok": true,
        "submissionId": receipt.submission_id,
        "leadScore": {
            "score": receipt.lead_score.score,
            "factors": receipt.lead_score.factors,
        },
        "aiAnalysisAvailable": receipt.ai_analysis_available,
    });
    match receipt.price {
        Some(PriceEstimate::Fixed(amount)) => body["price"] = json!(amount),
        Some(PriceEstimate::Display(text)) => body["priceEstimate"] = json!(text),
        None => {}
    }
    Ok(Json(body))
}

/// Guide downloads run the full pipeline (nurture tags, confirmation
/// with the PDF link) but answer with a minimal envelope.
async fn guide_download(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<Value>, ApiError> {
    let sub = read_submission(request).await?;
    let receipt = state
        .pipeline
        .process(sub, IntakeKind::LegalGuideDownload)
        .await;
    Ok(Json(json!({ "ok": true, "submissionId": receipt.submission_id })))
}

async fn add_subscriber(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let email = body
        .get("email")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::Validation("email is required".to_string()))?;

    let tags = collect_tags(&body);

    let mut merge_fields = body
        .get("merge_fields")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let source = body
        .get("source")
        .and_then(Value::as_str)
        .unwrap_or("website");
    merge_fields
        .entry("LEAD_SOURCE".to_string())
        .or_insert_with(|| json!(source));

    let outcome = state.pipeline.add_subscriber(email, tags, merge_fields).await;
    info!(email, outcome = outcome.label(), "Subscriber request handled");
    Ok(Json(json!({ "ok": true })))
}

/// Caller-supplied tags, deduplicated with insertion order preserved.
fn collect_tags(body: &Value) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    if let Some(items) = body.get("tags").and_then(Value::as_array) {
        for tag in items.iter().filter_map(Value::as_str) {
            if !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }
    }
    tags
}

// ── AI routes ───────────────────────────────────────────────────────

const CHAT_MAX_TOKENS: u32 = 600;

fn chat_system_prompt() -> String {
    "You are the intake assistant for a boutique law practice covering estate \
     planning, business formation, brand protection, and outside counsel. Answer \
     the visitor's question helpfully in two or three sentences and guide them \
     toward the right service.\n\n\
     After your reply, on a new line, emit:\n\
     EXTRACTED_DATA: a single JSON object with any contact details the visitor \
     has shared so far (keys among firstName, lastName, email, phone, \
     businessName, serviceInterest, message). Emit {} if nothing was shared."
        .to_string()
}

async fn chat_intake(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let session_id = body
        .get("sessionId")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let message = body.get("message").and_then(Value::as_str).unwrap_or("");

    let Some(llm) = &state.llm else {
        return Ok(Json(json!({
            "success": false,
            "response": "Our assistant is offline right now. Please use the contact form and we will follow up within one business day.",
            "extractedData": Value::Null,
            "sessionId": session_id,
        })));
    };

    let mut messages = vec![ChatMessage::system(chat_system_prompt())];
    if let Some(context) = body.get("context").and_then(Value::as_array) {
        for turn in context {
            let role = turn.get("role").and_then(Value::as_str).unwrap_or("user");
            let content = turn.get("content").and_then(Value::as_str).unwrap_or("");
            if content.is_empty() {
                continue;
            }
            messages.push(match role {
                "assistant" => ChatMessage::assistant(content),
                _ => ChatMessage::user(content),
            });
        }
    }
    messages.push(ChatMessage::user(message));

    let request = CompletionRequest::new(messages).with_max_tokens(CHAT_MAX_TOKENS);
    let (reply, extracted) = match llm.complete(request).await {
        Ok(response) => split_extracted_data(&response.content),
        Err(e) => {
            tracing::warn!(error = %e, "Chat completion failed");
            (
                "Sorry, something went wrong on our end. Please try again in a moment.".to_string(),
                None,
            )
        }
    };

    // A shared email means the chat produced a real lead: run it through
    // the normal pipeline so it gets tagged, synced, and alerted on.
    if let Some(data) = &extracted {
        if data.get("email").and_then(Value::as_str).is_some_and(|e| !e.is_empty()) {
            let mut sub = Submission::new();
            flatten_json(&mut sub, data);
            sub.set("source", "chat");
            sub.set("message", message);
            let receipt = state.pipeline.process(sub, IntakeKind::ChatIntake).await;
            info!(%session_id, submission_id = %receipt.submission_id, "Chat lead captured");
        }
    }

    Ok(Json(json!({
        "success": true,
        "response": reply,
        "extractedData": extracted.unwrap_or(Value::Null),
        "sessionId": session_id,
    })))
}

/// Split a chat reply into the visible text and the trailing
/// `EXTRACTED_DATA:` JSON object, when present and parseable.
fn split_extracted_data(content: &str) -> (String, Option<Value>) {
    let Some(idx) = content.find("EXTRACTED_DATA:") else {
        return (content.trim().to_string(), None);
    };
    let visible = content[..idx].trim().to_string();
    let tail = &content[idx + "EXTRACTED_DATA:".len()..];
    let data = tail.find('{').and_then(|start| {
        let candidate = &tail[start..];
        let end = candidate.rfind('}')?;
        serde_json::from_str::<Value>(&candidate[..=end]).ok()
    });
    (visible, data)
}

async fn generate_document(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let document_type = body
        .get("documentType")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Validation("documentType is required".to_string()))?;
    let client_data = body.get("clientData").cloned().unwrap_or(Value::Null);

    let Some(llm) = &state.llm else {
        return Ok(Json(json!({
            "success": false,
            "error": "Document generation is unavailable without the AI provider.",
        })));
    };

    let request = CompletionRequest::new(vec![
        ChatMessage::system(
            "You draft first-pass legal documents for attorney review at a boutique \
             law practice. Produce a complete, well-structured draft. Mark every \
             assumption with [REVIEW]. Never present the draft as final legal advice.",
        ),
        ChatMessage::user(format!(
            "Draft a {document_type}. Client data:\n{client_data}"
        )),
    ]);

    match llm.complete(request).await {
        Ok(response) => Ok(Json(json!({
            "success": true,
            "documentId": format!("doc-{}", Uuid::new_v4()),
            "document": response.content,
        }))),
        Err(e) => {
            tracing::warn!(error = %e, "Document generation failed");
            Ok(Json(json!({
                "success": false,
                "error": "Document generation failed. Please try again.",
            })))
        }
    }
}

/// Deterministic lifetime-value bands keyed off the lead score. No LLM.
async fn predict_clv(
    State(_state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let form_data = body.get("formData").cloned().unwrap_or(Value::Null);
    let mut sub = Submission::new();
    flatten_json(&mut sub, &form_data);

    let kind = IntakeKind::parse(sub.field("serviceType"))
        .unwrap_or(IntakeKind::LegalStrategyBuilder);
    let score = scoring::score(&sub, kind);

    let (tier, value) = match score.score {
        80.. => ("platinum", "$25,000+"),
        60..=79 => ("gold", "$10,000 - $25,000"),
        40..=59 => ("silver", "$5,000 - $10,000"),
        _ => ("bronze", "under $5,000"),
    };

    Ok(Json(json!({
        "success": true,
        "leadScore": score.score,
        "prediction": { "tier": tier, "estimatedValue": value },
    })))
}

// ── Analytics routes ────────────────────────────────────────────────

async fn analytics_form_event(Json(body): Json<Value>) -> Json<Value> {
    let event = body.get("event").and_then(Value::as_str).unwrap_or("");
    let form_type = body.get("formType").and_then(Value::as_str).unwrap_or("");
    let step = body.get("step").and_then(Value::as_str).unwrap_or("");
    info!(event, form_type, step, "Form event");
    Json(json!({ "received": true }))
}

async fn analytics_conversion(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let email = body.get("email").and_then(Value::as_str).unwrap_or("");
    let from = body.get("fromService").and_then(Value::as_str).unwrap_or("");
    let to = body.get("toService").and_then(Value::as_str).unwrap_or("");
    info!(email, from, to, "Cross-service conversion");

    if !email.is_empty() && !from.is_empty() && !to.is_empty() {
        let outcome = state.pipeline.record_conversion(email, from, to).await;
        info!(outcome = outcome.label(), "Conversion recorded");
    }
    Ok(Json(json!({ "success": true })))
}
