//! Headline analysis data model.

use crate::{LlmConfig, Result, TitleCheckError};

/// One user submission: the headline plus the endpoint it should be sent to.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub headline: String,
    pub model: String,
    pub base_url: String,
    pub api_key: String,
}

impl AnalysisRequest {
    /// Pair a headline with resolved connection settings.
    ///
    /// Fails with [`TitleCheckError::Config`] when no provider is configured or
    /// any of key, endpoint and model is blank, so no call is ever attempted
    /// with an incomplete configuration.
    pub fn new(headline: impl Into<String>, config: &LlmConfig) -> Result<Self> {
        let LlmConfig::OpenAi {
            api_key,
            model,
            base_url,
        } = config
        else {
            return Err(TitleCheckError::Config("No LLM configured".to_string()));
        };

        for (name, value) in [("API key", api_key), ("base URL", base_url), ("model", model)] {
            if value.trim().is_empty() {
                return Err(TitleCheckError::Config(format!("{name} is not configured")));
            }
        }

        Ok(Self {
            headline: headline.into(),
            model: model.trim().to_string(),
            base_url: base_url.trim().to_string(),
            api_key: api_key.clone(),
        })
    }

    pub fn llm_config(&self) -> LlmConfig {
        LlmConfig::OpenAi {
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            base_url: self.base_url.clone(),
        }
    }
}

/// A non-finite probability was supplied.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
#[error("probability is not a finite number: {0}")]
pub struct InvalidProbability(pub f64);

/// Clickbait probability, always finite and within `[0.0, 1.0]`.
///
/// Out-of-range model output is clamped rather than rejected; NaN and
/// infinities are rejected.
///
/// ```
/// use titlecheck_common::Probability;
///
/// assert_eq!(Probability::new(1.4).unwrap().value(), 1.0);
/// assert!(Probability::new(f64::NAN).is_err());
/// assert_eq!(Probability::new(0.5).unwrap().percent(), "50.00%");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Probability(f64);

impl Probability {
    pub const ZERO: Probability = Probability(0.0);

    pub fn new(raw: f64) -> std::result::Result<Self, InvalidProbability> {
        if !raw.is_finite() {
            return Err(InvalidProbability(raw));
        }
        let clamped = raw.clamp(0.0, 1.0);
        if clamped != raw {
            tracing::warn!(raw, clamped, "probability.clamped");
        }
        Ok(Self(clamped))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Percentage with two decimals, e.g. `92.00%`.
    pub fn percent(self) -> String {
        format!("{:.2}%", self.0 * 100.0)
    }
}

/// Classification returned for one headline.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    probability: Probability,
    suggestions: String,
    modified_title: String,
}

impl AnalysisResult {
    pub fn new(
        probability: Probability,
        suggestions: impl Into<String>,
        modified_title: impl Into<String>,
    ) -> Self {
        Self {
            probability,
            suggestions: suggestions.into(),
            modified_title: modified_title.into(),
        }
    }

    pub fn probability(&self) -> Probability {
        self.probability
    }

    pub fn suggestions(&self) -> &str {
        &self.suggestions
    }

    /// Rewritten headline; empty when the model offered none.
    pub fn modified_title(&self) -> &str {
        &self.modified_title
    }
}

/// The most recently analysed headline and its result, scoped to one caller.
///
/// Holds at most one entry; every [`record`](Self::record) replaces it.
#[derive(Debug, Clone, Default)]
pub struct LastRequestCache {
    entry: Option<(String, AnalysisResult)>,
}

impl LastRequestCache {
    pub fn record(&mut self, headline: impl Into<String>, result: AnalysisResult) {
        self.entry = Some((headline.into(), result));
    }

    pub fn last(&self) -> Option<(&str, &AnalysisResult)> {
        self.entry.as_ref().map(|(h, r)| (h.as_str(), r))
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }
}
