//! Headline form and analysis handlers.

use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Form,
};
use serde::Deserialize;
use titlecheck_common::{AnalysisRequest, LastRequestCache, TitleCheckError, APP_TITLE};
use titlecheck_config::Provider;
use titlecheck_llm::analyzer::{empty_headline_result, TitleAnalyzer};
use titlecheck_llm::interpret::Interpretation;

use crate::display::DisplayView;
use crate::state::AppState;

// ============================================================
// TEMPLATES
// ============================================================

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    app_title: &'static str,
    providers: Vec<ProviderOption>,
    model: String,
    headline: String,
    result: Option<DisplayView>,
    analyzed_headline: Option<String>,
    notice: Option<String>,
    error: Option<ErrorView>,
}

struct ProviderOption {
    value: &'static str,
    label: &'static str,
    default_model: String,
    checked: bool,
    needs_key: bool,
}

/// A failed submission, as shown in the error banner.
struct ErrorView {
    title: &'static str,
    detail: String,
}

impl From<&TitleCheckError> for ErrorView {
    fn from(err: &TitleCheckError) -> Self {
        match err {
            TitleCheckError::Config(msg) => ErrorView {
                title: "API密钥、基础URL或模型名称未配置或无效。请正确配置API信息后再试。",
                detail: msg.clone(),
            },
            TitleCheckError::Transport(msg) => ErrorView {
                title: "调用大语言模型API时出错，请检查API密钥或网络连接，并稍后重试。",
                detail: msg.clone(),
            },
            TitleCheckError::Format {
                reason,
                raw,
                cleaned,
            } => ErrorView {
                title: "大语言模型返回的JSON格式不符合预期。",
                detail: format!("原始返回内容：'{raw}'，清理后内容：'{cleaned}'（{reason}）"),
            },
        }
    }
}

impl IndexTemplate {
    fn new(state: &AppState, provider: Provider, model: &str, headline: &str) -> Self {
        let providers = Provider::ALL
            .into_iter()
            .map(|p| ProviderOption {
                value: p.as_str(),
                label: p.label(),
                default_model: state.llm.suggested_model(p),
                checked: p == provider,
                needs_key: p.needs_key(),
            })
            .collect();
        let model = if model.trim().is_empty() {
            state.llm.suggested_model(provider)
        } else {
            model.to_string()
        };

        Self {
            app_title: APP_TITLE,
            providers,
            model,
            headline: headline.to_string(),
            result: None,
            analyzed_headline: None,
            notice: None,
            error: None,
        }
    }

    fn into_response(self) -> Response {
        match self.render() {
            Ok(html) => Html(html).into_response(),
            Err(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(format!("Template error: {}", e)),
            )
                .into_response(),
        }
    }
}

// ============================================================
// REQUEST TYPES
// ============================================================

#[derive(Debug, Deserialize)]
pub struct AnalyzeForm {
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub provider: Provider,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub model: String,
}

// ============================================================
// HANDLERS
// ============================================================

/// GET / - Render the empty form.
pub async fn index(State(state): State<AppState>) -> Response {
    IndexTemplate::new(&state, state.llm.provider, "", "").into_response()
}

/// POST /analyze - Analyse one headline and render the result panel.
pub async fn analyze(State(state): State<AppState>, Form(form): Form<AnalyzeForm>) -> Response {
    let mut page = IndexTemplate::new(&state, form.provider, &form.model, &form.headline);

    if form.headline.trim().is_empty() {
        page.notice = Some(empty_headline_result().suggestions().to_string());
        return page.into_response();
    }

    let mut cache = LastRequestCache::default();
    match run_analysis(&state, &form, &mut cache).await {
        Ok(Interpretation::Complete(result)) => {
            page.result = Some(DisplayView::from_result(&result));
            page.analyzed_headline = cache.last().map(|(h, _)| h.to_string());
        }
        Ok(Interpretation::Degraded(result)) => {
            page.error = Some(ErrorView {
                title: "无法解析大语言模型返回的JSON。",
                detail: result.suggestions().to_string(),
            });
            page.result = Some(DisplayView::from_result(&result));
        }
        Err(e) => {
            tracing::warn!(provider = form.provider.as_str(), error = %e, "analyze.failed");
            page.error = Some(ErrorView::from(&e));
        }
    }

    page.into_response()
}

/// Validate the configuration first, then make the single model call.
async fn run_analysis(
    state: &AppState,
    form: &AnalyzeForm,
    cache: &mut LastRequestCache,
) -> titlecheck_common::Result<Interpretation> {
    let llm = state
        .llm
        .resolve_with(form.provider, Some(&form.api_key), Some(&form.model))?;
    let request = AnalysisRequest::new(form.headline.as_str(), &llm)?;
    let analyzer = TitleAnalyzer::for_request(&request)?;

    tracing::info!(
        provider = form.provider.as_str(),
        model = %request.model,
        headline_chars = request.headline.chars().count(),
        "analyze.submitted"
    );
    analyzer.analyze_reply(&request.headline, cache).await
}
