use terminly_core::error::Result;

/// A single-turn completion request: one system prompt, one user message.
/// The stage machine owns the dialogue state, so providers never see
/// multi-turn history.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            max_tokens: 512,
            temperature: 0.7,
        }
    }
}

/// Trait for LLM chat completion providers.
pub trait LlmProvider: Send + Sync {
    /// Send a completion request and return the model's text reply.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<String>> + Send;

    /// Return the provider name (e.g. "openai", "anthropic").
    fn name(&self) -> &str;
}
