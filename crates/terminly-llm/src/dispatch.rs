use terminly_core::config::LlmConfig;
use terminly_core::error::{Result, TerminError};

use crate::anthropic::AnthropicLlm;
use crate::openai::OpenAiLlm;
use crate::provider::{CompletionRequest, LlmProvider};

/// Encapsulates completion provider dispatch.
///
/// Creates providers on-the-fly from config, avoiding async trait objects
/// at this layer.
#[derive(Clone)]
pub struct LlmDispatch {
    config: LlmConfig,
}

impl LlmDispatch {
    pub fn new(config: LlmConfig) -> Self {
        Self { config }
    }

    pub async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        match self.config.provider.as_str() {
            "openai" => {
                let provider =
                    OpenAiLlm::new(self.config.api_key.clone(), self.config.model.clone());
                provider.complete(request).await
            }
            "anthropic" => {
                let provider =
                    AnthropicLlm::new(self.config.api_key.clone(), self.config.model.clone());
                provider.complete(request).await
            }
            other => Err(TerminError::Config(format!(
                "unknown LLM provider: '{other}'. Supported: openai, anthropic"
            ))),
        }
    }
}
