//! LLM integration.
//!
//! A single provider is supported: the OpenAI chat-completions endpoint,
//! called directly over reqwest. The `LlmProvider` trait keeps the
//! analyzer and the chat routes testable with mock providers.

pub mod provider;

pub use provider::{ChatMessage, CompletionRequest, CompletionResponse, LlmProvider};

use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use serde_json::json;

use crate::config::OpenAiConfig;
use crate::error::LlmError;

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Per-call timeout for LLM requests.
const LLM_TIMEOUT: Duration = Duration::from_secs(20);

/// OpenAI chat-completions provider.
pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: secrecy::SecretString,
    model: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(config: &OpenAiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: OPENAI_API_BASE.to_string(),
        }
    }

    /// Point at a compatible endpoint (Azure front-ends, local test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let mut body = json!({
            "model": self.model,
            "messages": request.messages,
        });
        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .timeout(LLM_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: "openai".to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::RequestFailed {
                provider: "openai".to_string(),
                reason: format!("status {status}: {body}"),
            });
        }

        let payload: serde_json::Value = response.json().await.map_err(|e| {
            LlmError::InvalidResponse {
                provider: "openai".to_string(),
                reason: e.to_string(),
            }
        })?;

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| LlmError::InvalidResponse {
                provider: "openai".to_string(),
                reason: "missing choices[0].message.content".to_string(),
            })?
            .to_string();

        Ok(CompletionResponse { content })
    }
}

/// Create an LLM provider from configuration, or `None` when the API key
/// is unset (the analyzer then returns all-null without calling out).
pub fn create_provider(config: Option<&OpenAiConfig>) -> Option<Arc<dyn LlmProvider>> {
    let config = config?;
    tracing::info!(model = %config.model, "Using OpenAI chat completions");
    Some(Arc::new(OpenAiProvider::new(config)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_reports_model_name() {
        let config = OpenAiConfig {
            api_key: secrecy::SecretString::from("sk-test"),
            model: "gpt-4o-mini".to_string(),
        };
        let provider = OpenAiProvider::new(&config);
        assert_eq!(provider.model_name(), "gpt-4o-mini");
    }

    #[test]
    fn create_provider_requires_config() {
        assert!(create_provider(None).is_none());
    }
}
