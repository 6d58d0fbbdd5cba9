//! Turning raw model text into an [`AnalysisResult`].
//!
//! Models often wrap JSON in Markdown fences or add prose around it. The
//! payload is located in two stages, [`extract_fenced_block`] and then
//! [`strip_fences`], before being parsed.
//!
//! A JSON syntax error yields a degraded zero-probability result that quotes
//! the raw reply. Valid JSON without the expected fields is a hard
//! [`TitleCheckError::Format`].

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use titlecheck_common::{AnalysisResult, Probability, Result, TitleCheckError};

/// Prefix of the suggestions text in a degraded result.
pub const UNPARSEABLE_PREFIX: &str = "模型返回格式错误，无法解析JSON。原始输出: ";

const REQUIRED_KEYS: [&str; 3] = ["probability", "suggestions", "modified_title"];

static FENCED_JSON: OnceLock<Regex> = OnceLock::new();

fn fenced_json() -> &'static Regex {
    FENCED_JSON.get_or_init(|| Regex::new(r"(?s)```json\n(.*?)\n```").expect("fence pattern is valid"))
}

/// Content of the first ```` ```json ```` block, trimmed.
///
/// The block closes at the nearest closing fence after the opener.
pub fn extract_fenced_block(raw: &str) -> Option<&str> {
    fenced_json()
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

/// Trim, then drop a leading ```` ```json ```` or ```` ``` ```` and a trailing ```` ``` ````.
pub fn strip_fences(raw: &str) -> &str {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("```json") {
        s = rest.trim();
    }
    if let Some(rest) = s.strip_prefix("```") {
        s = rest.trim();
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest.trim();
    }
    s
}

/// Locate the JSON payload in a model reply.
pub fn clean_reply(raw: &str) -> &str {
    extract_fenced_block(raw).unwrap_or_else(|| strip_fences(raw))
}

/// Outcome of parsing a reply that did not fail hard.
#[derive(Debug, Clone, PartialEq)]
pub enum Interpretation {
    /// All fields present and well typed.
    Complete(AnalysisResult),
    /// The payload was not JSON; the result quotes the raw reply.
    Degraded(AnalysisResult),
}

impl Interpretation {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }

    pub fn into_result(self) -> AnalysisResult {
        match self {
            Self::Complete(r) | Self::Degraded(r) => r,
        }
    }
}

/// Interpret a raw model reply.
pub fn interpret(raw: &str) -> Result<AnalysisResult> {
    interpret_reply(raw).map(Interpretation::into_result)
}

/// Like [`interpret`], but tells complete and degraded results apart.
pub fn interpret_reply(raw: &str) -> Result<Interpretation> {
    let cleaned = clean_reply(raw);

    let value: Value = match serde_json::from_str(cleaned) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(
                error = %e,
                raw = %raw,
                cleaned = %cleaned,
                "interpret.json_syntax_error"
            );
            return Ok(Interpretation::Degraded(AnalysisResult::new(
                Probability::ZERO,
                format!("{UNPARSEABLE_PREFIX}{raw}"),
                "",
            )));
        }
    };

    let format_error = |reason: String| {
        tracing::error!(reason = %reason, raw = %raw, cleaned = %cleaned, "interpret.format_error");
        TitleCheckError::Format {
            reason,
            raw: raw.to_string(),
            cleaned: cleaned.to_string(),
        }
    };

    let Value::Object(fields) = value else {
        return Err(format_error("reply is not a JSON object".to_string()));
    };

    let missing: Vec<&str> = REQUIRED_KEYS
        .iter()
        .copied()
        .filter(|k| !fields.contains_key(*k))
        .collect();
    if !missing.is_empty() {
        return Err(format_error(format!("missing keys: {}", missing.join(", "))));
    }

    let probability = fields["probability"]
        .as_f64()
        .ok_or_else(|| format_error(format!("probability is not a number: {}", fields["probability"])))
        .and_then(|p| Probability::new(p).map_err(|e| format_error(e.to_string())))?;
    let suggestions = text_field(&fields, "suggestions").map_err(&format_error)?;
    let modified_title = text_field(&fields, "modified_title").map_err(&format_error)?;

    Ok(Interpretation::Complete(AnalysisResult::new(
        probability,
        suggestions,
        modified_title,
    )))
}

/// A string field; JSON `null` reads as empty.
fn text_field(fields: &Map<String, Value>, key: &str) -> std::result::Result<String, String> {
    match &fields[key] {
        Value::String(s) => Ok(s.clone()),
        Value::Null => Ok(String::new()),
        other => Err(format!("{key} is not a string: {other}")),
    }
}
