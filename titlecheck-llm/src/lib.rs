//! Headline analysis against an OpenAI-compatible chat-completion endpoint.
//!
//! This crate exposes the [`traits::LlmClient`] interface, the
//! [`openai::OpenAiClient`] implementation, the prompt builder, the response
//! interpreter and the [`analyzer::TitleAnalyzer`] that composes them.
//!
//! # Examples
//! ```no_run
//! use titlecheck_common::{LastRequestCache, LlmConfig, Result};
//! use titlecheck_llm::{analyzer::TitleAnalyzer, ensure_llm_ready};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<()> {
//! let cfg = LlmConfig::OpenAi {
//!     api_key: "sk-...".into(),
//!     model: "qwen-turbo".into(),
//!     base_url: "https://dashscope.aliyuncs.com/compatible-mode/v1".into(),
//! };
//! let analyzer = TitleAnalyzer::new(ensure_llm_ready(&cfg)?);
//! let mut cache = LastRequestCache::default();
//! let result = analyzer.analyze("震惊！全网疯传", &mut cache).await?;
//! println!("{}", result.probability().percent());
//! # Ok(())
//! # }
//! ```
pub mod analyzer;
pub mod interpret;
pub mod openai;
pub mod prompt;
pub mod traits;

use openai::OpenAiClient;
use std::sync::Arc;
use titlecheck_common::{LlmConfig, TitleCheckError};
use traits::LlmClient;

/// Sampling temperature used for every headline analysis.
pub const ANALYSIS_TEMPERATURE: f32 = 0.5;
/// Upper bound on generated tokens for every headline analysis.
pub const ANALYSIS_MAX_TOKENS: u32 = 500;

/// Build a client for the configured provider.
///
/// Fails with [`TitleCheckError::Config`] when nothing is configured or the
/// endpoint/key cannot be turned into a client.
pub fn ensure_llm_ready(
    config: &LlmConfig,
) -> titlecheck_common::Result<Arc<dyn LlmClient + Send + Sync + 'static>> {
    match config {
        LlmConfig::OpenAi {
            api_key,
            model,
            base_url,
        } => {
            let client = OpenAiClient::new(api_key, model, base_url)?;
            Ok(Arc::new(client))
        }
        LlmConfig::None => Err(TitleCheckError::Config("No LLM configured".to_string())),
    }
}
