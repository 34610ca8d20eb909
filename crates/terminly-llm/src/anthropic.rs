use reqwest::Client;
use serde_json::json;
use terminly_core::error::{Result, TerminError};

use crate::provider::{CompletionRequest, LlmProvider};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Claude LLM provider.
pub struct AnthropicLlm {
    client: Client,
    api_key: String,
    model: String,
}

impl AnthropicLlm {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
        }
    }
}

impl LlmProvider for AnthropicLlm {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = json!({
            "model": self.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "system": request.system,
            "messages": [
                { "role": "user", "content": request.user },
            ],
        });

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| TerminError::Llm {
                provider: "anthropic".to_string(),
                message: format!("request failed: {e}"),
            })?;

        let status = response.status().as_u16();
        let response_text = response.text().await.map_err(|e| TerminError::Llm {
            provider: "anthropic".to_string(),
            message: format!("failed to read response body: {e}"),
        })?;

        if status < 200 || status >= 300 {
            return Err(TerminError::Http {
                status,
                body: response_text,
            });
        }

        let parsed: serde_json::Value =
            serde_json::from_str(&response_text).map_err(|e| TerminError::Llm {
                provider: "anthropic".to_string(),
                message: format!("failed to parse response JSON: {e}"),
            })?;

        let content = parsed["content"]
            .as_array()
            .and_then(|arr| arr.first())
            .and_then(|block| block["text"].as_str())
            .unwrap_or("")
            .to_string();

        Ok(content)
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}
