use async_trait::async_trait;
use titlecheck_common::Result;

use crate::prompt::{build_prompt, SYSTEM_PROMPT};
use crate::{ANALYSIS_MAX_TOKENS, ANALYSIS_TEMPERATURE};

#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    pub model: Option<String>,
    pub tokens_used: Option<u32>,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a response to `prompt` under `system_prompt`
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: &str,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse>;

    /// Get the model name being used
    fn model_name(&self) -> &str;

    /// Ask the model to classify one headline; returns the raw assistant text.
    async fn classify_headline(&self, headline: &str) -> Result<String> {
        let prompt = build_prompt(headline);
        tracing::debug!(model = self.model_name(), prompt_len = prompt.len(), "llm.classify.start");

        let response = self
            .generate(
                &prompt,
                SYSTEM_PROMPT,
                Some(ANALYSIS_MAX_TOKENS),
                Some(ANALYSIS_TEMPERATURE),
            )
            .await?;

        tracing::debug!(
            model = response.model.as_deref().unwrap_or(self.model_name()),
            tokens_used = ?response.tokens_used,
            "LLM response: {}",
            response.text
        );
        Ok(response.text)
    }
}
