//! Integration tests for the intake HTTP surface.
//!
//! Each test spins up the real Axum server on a random port and drives it
//! with reqwest, exercising the JSON and multipart contracts end to end.
//! All collaborators are unconfigured, so fan-out steps skip and the
//! envelope reflects scoring/pricing alone.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use intake_gateway::config::AppConfig;
use intake_gateway::error::LlmError;
use intake_gateway::llm::{CompletionRequest, CompletionResponse, LlmProvider};
use intake_gateway::pipeline::IntakePipeline;
use intake_gateway::server::{AppState, router};

/// Stub LLM provider for integration tests (no real API calls).
struct StubLlm {
    reply: &'static str,
}

#[async_trait]
impl LlmProvider for StubLlm {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        Ok(CompletionResponse {
            content: self.reply.to_string(),
        })
    }
}

/// Start the gateway on a random port, return its base URL.
async fn start_server(llm: Option<Arc<dyn LlmProvider>>) -> String {
    let config = Arc::new(AppConfig::disabled());
    let pipeline = Arc::new(IntakePipeline::new(config, llm.clone()));
    let app = router(AppState { pipeline, llm });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    format!("http://127.0.0.1:{port}")
}

#[tokio::test]
async fn service_info_lists_endpoints() {
    let base = start_server(None).await;
    let body: Value = reqwest::get(&base).await.unwrap().json().await.unwrap();

    assert_eq!(body["ok"], true);
    assert_eq!(body["service"], "intake-gateway");
    let endpoints = body["endpoints"].as_array().unwrap();
    assert!(endpoints.iter().any(|e| e == "/estate-intake"));
}

#[tokio::test]
async fn estate_intake_minimal_scenario() {
    let base = start_server(None).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/estate-intake"))
        .json(&json!({
            "firstName": "Jane",
            "lastName": "Doe",
            "email": "jane@acme.io",
            "state": "NY",
            "maritalStatus": "Married",
            "packagePreference": "Will",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["leadScore"]["score"], 65);
    assert_eq!(body["price"], 1900);
    assert_eq!(body["aiAnalysisAvailable"], false);

    let factors = body["leadScore"]["factors"].as_array().unwrap();
    assert!(factors.iter().all(|f| f.as_str().unwrap().contains(": +")));
}

#[tokio::test]
async fn assessment_conversion_scores_to_cap() {
    let base = start_server(None).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/estate-intake"))
        .json(&json!({
            "fromAssessment": "true",
            "assessmentScore": "72",
            "email": "x@firm.com",
            "state": "OH",
        }))
        .send()
        .await
        .unwrap();

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["leadScore"]["score"], 100);
}

#[tokio::test]
async fn multipart_estate_intake_accepts_document() {
    let base = start_server(None).await;
    let client = reqwest::Client::new();

    let form = reqwest::multipart::Form::new()
        .text("firstName", "Jane")
        .text("email", "jane@acme.io")
        .text("maritalStatus", "Single")
        .text("packagePreference", "Will")
        .part(
            "document",
            reqwest::multipart::Part::bytes(b"deed scan".to_vec())
                .file_name("deed.pdf")
                .mime_str("application/pdf")
                .unwrap(),
        );

    let response = client
        .post(format!("{base}/estate-intake"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["price"], 1500);
}

#[tokio::test]
async fn unexpected_file_field_is_rejected() {
    let base = start_server(None).await;
    let client = reqwest::Client::new();

    let form = reqwest::multipart::Form::new().part(
        "avatar",
        reqwest::multipart::Part::bytes(b"png".to_vec())
            .file_name("avatar.png")
            .mime_str("image/png")
            .unwrap(),
    );

    let response = client
        .post(format!("{base}/estate-intake"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["ok"], false);
    assert!(body["error"].as_str().unwrap().contains("avatar"));
}

#[tokio::test]
async fn add_subscriber_without_email_is_400() {
    let base = start_server(None).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/add-subscriber"))
        .json(&json!({ "source": "footer", "tags": ["newsletter"] }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn chat_intake_extracts_contact_data() {
    let llm: Arc<dyn LlmProvider> = Arc::new(StubLlm {
        reply: "We handle trademarks regularly, happy to help.\n\
                EXTRACTED_DATA: {\"firstName\": \"Sam\", \"email\": \"sam@brand.co\"}",
    });
    let base = start_server(Some(llm)).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/api/chat-intake"))
        .json(&json!({ "message": "Can you register my trademark? I'm sam@brand.co" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["extractedData"]["email"], "sam@brand.co");
    assert!(!body["response"].as_str().unwrap().contains("EXTRACTED_DATA"));
    assert!(!body["sessionId"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn generate_document_drafts_via_llm() {
    let llm: Arc<dyn LlmProvider> = Arc::new(StubLlm {
        reply: "OPERATING AGREEMENT\n\n[REVIEW] Draft for attorney review.",
    });
    let base = start_server(Some(llm)).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/api/generate-document"))
        .json(&json!({
            "documentType": "operating agreement",
            "clientData": { "businessName": "Acme Robotics" },
        }))
        .send()
        .await
        .unwrap();

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert!(body["documentId"].as_str().unwrap().starts_with("doc-"));
    assert!(body["document"].as_str().unwrap().contains("OPERATING AGREEMENT"));
}

#[tokio::test]
async fn predict_clv_bands_low_scores() {
    let base = start_server(None).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/api/predict-clv"))
        .json(&json!({ "formData": { "serviceType": "chat-intake", "email": "a@yahoo.com" } }))
        .send()
        .await
        .unwrap();

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["leadScore"], 30);
    assert_eq!(body["prediction"]["tier"], "bronze");
}

#[tokio::test]
async fn analytics_endpoints_acknowledge() {
    let base = start_server(None).await;
    let client = reqwest::Client::new();

    let event: Value = client
        .post(format!("{base}/api/analytics/form-event"))
        .json(&json!({ "event": "start", "formType": "estate", "step": "1" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(event["received"], true);

    let conversion: Value = client
        .post(format!("{base}/api/analytics/conversion"))
        .json(&json!({
            "email": "x@firm.com",
            "fromService": "legal-strategy-builder",
            "toService": "estate-intake",
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(conversion["success"], true);
}
