//! Minimal JSON-over-HTTP client with safe logging and bearer auth.
//!
//! - Request options: extra headers and bearer `Auth`
//! - reqwest's default timeouts; nothing is overridden
//! - Never logs secret values; `Authorization` is always redacted
//! - Exactly one attempt per call, no retries
//! - Optional *raw* request/response logging via `TITLECHECK_HTTP_RAW=1`
//!
//! Example (no_run):
//! ```no_run
//! # async fn demo() -> Result<(), titlecheck_http::HttpError> {
//! let client = titlecheck_http::HttpClient::new("https://openrouter.ai/api/v1")?;
//! let opts = titlecheck_http::RequestOpts {
//!     auth: Some(titlecheck_http::Auth::Bearer("sk-...")),
//!     ..Default::default()
//! };
//! let reply: serde_json::Value = client
//!     .post_json("chat/completions", &serde_json::json!({"model": "m"}), opts)
//!     .await?;
//! # Ok(()) }
//! ```
//!
//! Observability: structured `tracing` events are emitted for request start,
//! response headers, body snippets (truncated), final errors and (optionally)
//! raw request/response lines under target `http.raw`.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, ClientBuilder, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Instant;
use thiserror::Error;

const RAW_ENV: &str = "TITLECHECK_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024;
const SNIPPET_MAX: usize = 500;

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

/// Header pairs for logging, with credentials masked.
fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(k, v)| {
            let val = if *k == AUTHORIZATION {
                "Bearer <redacted>".to_string()
            } else {
                v.to_str().unwrap_or("<binary>").to_string()
            };
            (k.as_str().to_string(), val)
        })
        .collect()
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}, request_id={request_id}")]
    Api {
        status: StatusCode,
        message: String,
        request_id: String,
    },
}

impl HttpError {
    /// True when the request never left the process because its inputs were bad.
    pub fn is_setup(&self) -> bool {
        matches!(self, Self::Url(_) | Self::Build(_))
    }
}

/// Authentication strategies supported by the client.
///
/// ```
/// use titlecheck_http::Auth;
///
/// let bearer = Auth::Bearer("token");
/// assert!(matches!(bearer, Auth::Bearer("token")));
/// ```
#[derive(Clone, Debug)]
pub enum Auth<'a> {
    /// Authorization: Bearer <token>
    Bearer(&'a str),
}

/// Per-request knobs.
///
/// ```
/// use reqwest::header::{HeaderMap, HeaderValue};
/// use titlecheck_http::{Auth, RequestOpts};
///
/// let mut headers = HeaderMap::new();
/// headers.insert("x-title", HeaderValue::from_static("demo"));
/// let opts = RequestOpts {
///     auth: Some(Auth::Bearer("sk-test")),
///     headers: Some(headers),
///     ..Default::default()
/// };
/// assert!(opts.auth.is_some());
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    /// `None` sends no `Authorization` header.
    pub auth: Option<Auth<'a>>,
    pub headers: Option<HeaderMap>,
}

/// Connect, read and total timeouts stay at reqwest's defaults.
fn client_builder() -> ClientBuilder {
    Client::builder()
}

#[derive(Clone, Debug)]
pub struct HttpClient {
    base: Url,
    inner: Client,
}

impl HttpClient {
    /// Construct a client anchored to a base URL.
    ///
    /// The base is treated as a directory, so `https://host/api/v1` and
    /// `https://host/api/v1/` resolve `chat/completions` identically.
    ///
    /// ```
    /// use titlecheck_http::HttpClient;
    ///
    /// let client = HttpClient::new("https://openrouter.ai/api/v1").unwrap();
    /// assert_eq!(client.base().as_str(), "https://openrouter.ai/api/v1/");
    /// assert!(HttpClient::new("not a url").is_err());
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let trimmed = base.trim();
        let normalized = if trimmed.ends_with('/') {
            trimmed.to_string()
        } else {
            format!("{trimmed}/")
        };
        let base = Url::parse(&normalized).map_err(|e| HttpError::Url(e.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(HttpError::Url(format!("unsupported scheme: {}", base.scheme())));
        }
        let inner = client_builder()
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self { base, inner })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// POST JSON with per-request headers and auth.
    pub async fn post_json<B, T>(
        &self,
        path: &str,
        body: &B,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request_json(Method::POST, path, Some(body), opts).await
    }

    async fn request_json<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self
            .base
            .join(path.trim_start_matches('/'))
            .map_err(|e| HttpError::Url(e.to_string()))?;

        let mut headers = opts.headers.clone().unwrap_or_default();
        let auth_kind = match &opts.auth {
            Some(Auth::Bearer(tok)) => {
                let tok = sanitize_api_key(tok)?;
                let value = HeaderValue::from_str(&format!("Bearer {tok}"))
                    .map_err(|e| HttpError::Build(format!("invalid Authorization header: {e}")))?;
                headers.insert(AUTHORIZATION, value);
                "bearer"
            }
            None => "none",
        };

        let body_bytes = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| HttpError::Build(format!("body serialization failed: {e}")))?;

        let mut rb = self.inner.request(method.clone(), url.clone()).headers(headers.clone());
        if let Some(bytes) = &body_bytes {
            rb = rb
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(bytes.clone());
        }

        tracing::debug!(
            method=%method,
            host_path=%format!("{}{}", url.host_str().unwrap_or("-"), url.path()),
            auth_kind,
            extra_headers=headers.len(),
            body_len=body_bytes.as_ref().map_or(0, Vec::len),
            "http.request.start"
        );

        if raw_enabled() {
            let body_text = body_bytes
                .as_deref()
                .map(|b| truncate(&String::from_utf8_lossy(b), RAW_MAX_BODY))
                .unwrap_or_default();
            tracing::debug!(
                target: "http.raw",
                %method,
                url=%url,
                headers=?redact_headers(&headers),
                body=%body_text,
                "request"
            );
        }

        let t0 = Instant::now();
        let resp = rb.send().await.map_err(|e| {
            tracing::warn!(message=%e, "http.network_error.send");
            HttpError::Network(e.to_string())
        })?;
        let status = resp.status();
        let resp_headers = resp.headers().clone();
        let bytes = resp.bytes().await.map_err(|e| {
            tracing::warn!(%status, message=%e, "http.network_error.body");
            HttpError::Network(e.to_string())
        })?;
        let duration_ms = t0.elapsed().as_millis() as u64;

        let request_id = resp_headers
            .get("x-request-id")
            .or_else(|| resp_headers.get("x-correlation-id"))
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string();

        tracing::debug!(
            %status,
            duration_ms,
            body_len=bytes.len(),
            x_request_id=%request_id,
            "http.response.headers"
        );

        if raw_enabled() {
            tracing::debug!(
                target: "http.raw",
                %status,
                duration_ms,
                headers=?redact_headers(&resp_headers),
                body=%truncate(&String::from_utf8_lossy(&bytes), RAW_MAX_BODY),
                "response"
            );
        }

        let snippet = snip_body(&bytes);
        tracing::trace!(body_snippet=%snippet, "http.response.body_snippet");

        if status.is_success() {
            return serde_json::from_slice::<T>(&bytes).map_err(|e| {
                tracing::warn!(
                    serde_line=e.line(),
                    serde_col=e.column(),
                    serde_err=%e,
                    body_snippet=%snippet,
                    "http.response.decode_error"
                );
                HttpError::Decode(e.to_string(), snippet)
            });
        }

        let message = extract_error_message(&bytes);
        tracing::warn!(
            %status,
            message=%message,
            x_request_id=%request_id,
            body_snippet=%snippet,
            "http.error"
        );
        Err(HttpError::Api {
            status,
            message,
            request_id,
        })
    }
}

/// Pull a human-readable message out of a provider error body.
fn extract_error_message(body: &[u8]) -> String {
    // OpenAI style: {"error":{"message":"..."}}
    #[derive(Deserialize)]
    struct OpenAiEnv {
        error: OpenAiDetail,
    }
    #[derive(Deserialize)]
    struct OpenAiDetail {
        message: String,
    }

    // Generic: {"message":"..."} or {"detail":"..."} or {"error":"..."}
    #[derive(Deserialize)]
    struct Msg {
        #[serde(default)]
        message: String,
        #[serde(default)]
        detail: String,
        #[serde(default)]
        error: String,
    }

    if let Ok(env) = serde_json::from_slice::<OpenAiEnv>(body) {
        return env.error.message;
    }
    if let Ok(m) = serde_json::from_slice::<Msg>(body) {
        if let Some(found) = [m.message, m.detail, m.error].into_iter().find(|s| !s.is_empty()) {
            return found;
        }
    }
    snip_body(body)
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

fn snip_body(body: &[u8]) -> String {
    truncate(&String::from_utf8_lossy(body), SNIPPET_MAX)
}

/// Normalise an API key for use in a bearer header.
///
/// Strips surrounding quotes and all ASCII whitespace, then rejects keys that
/// are empty, non-ASCII or contain control characters.
///
/// ```
/// use titlecheck_http::sanitize_api_key;
///
/// assert_eq!(sanitize_api_key(" 'sk-abc 123'\n").unwrap(), "sk-abc123");
/// assert!(sanitize_api_key("密钥").is_err());
/// ```
pub fn sanitize_api_key(raw: &str) -> Result<String, HttpError> {
    let mut s = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();
    s.retain(|ch| !ch.is_ascii_whitespace());

    if s.is_empty() {
        return Err(HttpError::Build("API key is empty".into()));
    }
    if !s.is_ascii() {
        return Err(HttpError::Build("API key contains non-ASCII bytes".into()));
    }
    if s.bytes().any(|b| b < 0x20 || b == 0x7F) {
        return Err(HttpError::Build(
            "API key contains control characters".into(),
        ));
    }
    Ok(s)
}
