//! Mapping an [`AnalysisResult`] to what the results panel shows.
//!
//! Below 0.5 the headline is treated as fine: the model's suggestions and
//! rewrite are replaced by a fixed message. From 0.5 up to and including 0.7
//! the result is a caution; above 0.7 it is high severity.

use titlecheck_common::AnalysisResult;

/// Shown instead of the model's suggestions when the probability is below 0.5.
pub const NO_REVISION_NEEDED: &str = "不像标题党，不用修改。";

const CAUTION_FROM: f64 = 0.5;
const HIGH_ABOVE: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Low,
    Caution,
    High,
}

impl Band {
    pub fn for_probability(p: f64) -> Self {
        if p > HIGH_ABOVE {
            Band::High
        } else if p >= CAUTION_FROM {
            Band::Caution
        } else {
            Band::Low
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            Band::Low => "success",
            Band::Caution => "warning",
            Band::High => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayView {
    pub band: Band,
    pub percent: String,
    pub suggestions: String,
    /// `None` when hidden by policy or when the model offered no rewrite.
    pub modified_title: Option<String>,
}

impl DisplayView {
    pub fn from_result(result: &AnalysisResult) -> Self {
        let probability = result.probability();
        let band = Band::for_probability(probability.value());

        let (suggestions, modified_title) = match band {
            Band::Low => (NO_REVISION_NEEDED.to_string(), None),
            Band::Caution | Band::High => (
                result.suggestions().to_string(),
                Some(result.modified_title())
                    .filter(|t| !t.trim().is_empty())
                    .map(str::to_string),
            ),
        };

        Self {
            band,
            percent: probability.percent(),
            suggestions,
            modified_title,
        }
    }
}
