use reqwest::Client;
use serde_json::json;
use terminly_core::error::{Result, TerminError};

use crate::provider::{CompletionRequest, LlmProvider};

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI chat completion provider.
pub struct OpenAiLlm {
    client: Client,
    api_key: String,
    model: String,
}

impl OpenAiLlm {
    /// Create a new OpenAI LLM provider.
    ///
    /// # Arguments
    /// * `api_key` - OpenAI API key
    /// * `model` - Model identifier (e.g. "gpt-4o-mini")
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
        }
    }
}

impl LlmProvider for OpenAiLlm {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user },
            ],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });

        let response = self
            .client
            .post(OPENAI_CHAT_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| TerminError::Llm {
                provider: "openai".to_string(),
                message: format!("request failed: {e}"),
            })?;

        let status = response.status().as_u16();
        let response_text = response.text().await.map_err(|e| TerminError::Llm {
            provider: "openai".to_string(),
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
                provider: "openai".to_string(),
                message: format!("failed to parse response JSON: {e}"),
            })?;

        let content = parsed["choices"]
            .as_array()
            .and_then(|arr| arr.first())
            .and_then(|choice| choice["message"]["content"].as_str())
            .unwrap_or("")
            .to_string();

        Ok(content)
    }

    fn name(&self) -> &str {
        "openai"
    }
}
