use crate::traits::{LlmClient, LlmResponse};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use titlecheck_common::{Result, TitleCheckError, APP_TITLE};
use titlecheck_http::{sanitize_api_key, Auth, HttpClient, HttpError, RequestOpts};

/// Sent as `HTTP-Referer` so OpenRouter can attribute traffic to the app.
pub const APP_REFERER: &str = "https://news-title-checker.streamlit.app";

/// Client for OpenAI-compatible `chat/completions` endpoints.
pub struct OpenAiClient {
    client: HttpClient,
    api_key: String,
    model: String,
    app_headers: HeaderMap,
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

/// One element in the `choices` array
#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub total_tokens: Option<u32>,
}

impl OpenAiClient {
    /// Create a client for the given key, model and endpoint base URL.
    ///
    /// Validates the key and URL up front so a bad configuration surfaces as
    /// [`TitleCheckError::Config`] before any request is made.
    pub fn new(api_key: &str, model: &str, base_url: &str) -> Result<Self> {
        let api_key = sanitize_api_key(api_key)
            .map_err(|e| TitleCheckError::Config(format!("invalid API key: {e}")))?;
        if model.trim().is_empty() {
            return Err(TitleCheckError::Config("model is not configured".to_string()));
        }
        let client = HttpClient::new(base_url)
            .map_err(|e| TitleCheckError::Config(format!("HttpClient init failed: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model: model.trim().to_string(),
            app_headers: app_headers(),
        })
    }
}

/// Attribution headers; the title is percent-encoded since header values must be ASCII.
fn app_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static("http-referer"),
        HeaderValue::from_static(APP_REFERER),
    );
    if let Ok(title) = HeaderValue::from_str(&urlencoding::encode(APP_TITLE)) {
        headers.insert(HeaderName::from_static("x-title"), title);
    }
    headers
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: &str,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse> {
        let req = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature,
            max_tokens,
        };
        let opts = RequestOpts {
            auth: Some(Auth::Bearer(&self.api_key)),
            headers: Some(self.app_headers.clone()),
            ..Default::default()
        };

        let resp: ChatCompletionResponse = self
            .client
            .post_json("chat/completions", &req, opts)
            .await
            .map_err(http_to_titlecheck)?;

        let Some(choice) = resp.choices.into_iter().next() else {
            return Err(TitleCheckError::Transport(
                "model returned no choices".to_string(),
            ));
        };
        tracing::debug!(
            id = ?resp.id,
            finish_reason = ?choice.finish_reason,
            "openai.chat.completed"
        );

        let Some(text) = choice.message.content else {
            return Err(TitleCheckError::Transport(
                "model returned empty content".to_string(),
            ));
        };

        Ok(LlmResponse {
            text,
            model: resp.model,
            tokens_used: resp.usage.and_then(|u| u.total_tokens),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn http_to_titlecheck(e: HttpError) -> TitleCheckError {
    if e.is_setup() {
        TitleCheckError::Config(e.to_string())
    } else {
        TitleCheckError::Transport(e.to_string())
    }
}
