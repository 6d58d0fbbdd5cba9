//! Common types and utilities shared across Titlecheck crates.
//!
//! This crate defines the headline analysis data model, the provider-agnostic
//! LLM configuration, observability helpers, and the shared error type used
//! throughout the Titlecheck workspace. It stays dependency-light so every
//! crate can depend on it.
//!
//! # Overview
//!
//! - [`AnalysisRequest`], [`AnalysisResult`], [`Probability`] and
//!   [`LastRequestCache`]: the analysis data model
//! - [`LlmConfig`]: resolved connection settings for a chat-completion endpoint
//! - [`observability`]: centralised tracing/logging initialisation
//! - [`TitleCheckError`] and [`Result`]: shared error handling
//!
//! # Examples
//!
//! ```rust
//! use titlecheck_common::{AnalysisResult, Probability};
//!
//! let p = Probability::new(0.92).unwrap();
//! let result = AnalysisResult::new(p, "去除夸张措辞", "某事件引发关注");
//! assert_eq!(result.probability().percent(), "92.00%");
//! ```

pub mod analysis;
pub mod observability;

pub use analysis::{AnalysisRequest, AnalysisResult, InvalidProbability, LastRequestCache, Probability};

/// Application title, shown in the page header and sent upstream as `X-Title`.
pub const APP_TITLE: &str = "网络新闻标题失范自动检测系统";

/// Connection settings for the chat-completion endpoint.
///
/// Produced by `titlecheck-config` once a provider choice has been resolved
/// into a concrete endpoint, key and model.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmConfig {
    /// Any OpenAI-compatible `chat/completions` endpoint (OpenRouter, DashScope, ...).
    OpenAi {
        api_key: String,
        model: String,
        base_url: String,
    },
    None,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::None
    }
}

impl LlmConfig {
    /// Model identifier, if a provider is configured.
    pub fn model(&self) -> Option<&str> {
        match self {
            Self::OpenAi { model, .. } => Some(model),
            Self::None => None,
        }
    }
}

/// Error types used across the Titlecheck system.
#[derive(thiserror::Error, Debug)]
pub enum TitleCheckError {
    /// Credential, endpoint or model missing, or the client could not be built.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The model call failed on the network or the endpoint rejected it.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The model replied with JSON that does not carry the expected fields.
    #[error("Format error: {reason}; raw: '{raw}', cleaned: '{cleaned}'")]
    Format {
        reason: String,
        raw: String,
        cleaned: String,
    },
}

/// Convenient alias for results that use [`TitleCheckError`].
pub type Result<T> = std::result::Result<T, TitleCheckError>;
