use std::sync::Arc;

use titlecheck_common::{AnalysisRequest, AnalysisResult, LastRequestCache, Probability, Result};

use crate::ensure_llm_ready;
use crate::interpret::{interpret_reply, Interpretation};
use crate::traits::LlmClient;

/// Suggestions text returned for a blank headline.
pub const EMPTY_HEADLINE_MESSAGE: &str = "请输入新闻标题进行分析。";

/// Fixed result for blank input; produced without contacting the model.
pub fn empty_headline_result() -> AnalysisResult {
    AnalysisResult::new(Probability::ZERO, EMPTY_HEADLINE_MESSAGE, "")
}

/// Prompt, invoke, interpret: one headline per call.
pub struct TitleAnalyzer {
    client: Arc<dyn LlmClient + Send + Sync>,
}

impl TitleAnalyzer {
    pub fn new(client: Arc<dyn LlmClient + Send + Sync>) -> Self {
        Self { client }
    }

    /// Build an analyzer for the endpoint named in `request`.
    pub fn for_request(request: &AnalysisRequest) -> Result<Self> {
        Ok(Self::new(ensure_llm_ready(&request.llm_config())?))
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    /// Analyse one headline.
    ///
    /// Blank input short-circuits without a network call. Every other call
    /// sends exactly one request; `cache` is overwritten only when the reply
    /// parses into a complete result.
    pub async fn analyze(
        &self,
        headline: &str,
        cache: &mut LastRequestCache,
    ) -> Result<AnalysisResult> {
        self.analyze_reply(headline, cache)
            .await
            .map(Interpretation::into_result)
    }

    /// Like [`analyze`](Self::analyze), but reports whether the reply had to
    /// be degraded.
    pub async fn analyze_reply(
        &self,
        headline: &str,
        cache: &mut LastRequestCache,
    ) -> Result<Interpretation> {
        if headline.trim().is_empty() {
            tracing::debug!("analyze.blank_headline");
            return Ok(Interpretation::Complete(empty_headline_result()));
        }

        let raw = self
            .client
            .classify_headline(headline)
            .await
            .inspect_err(|e| {
                tracing::warn!(model = self.model_name(), error = %e, "analyze.invoke_failed")
            })?;

        let result = match interpret_reply(&raw)? {
            Interpretation::Complete(result) => result,
            degraded @ Interpretation::Degraded(_) => {
                tracing::warn!(model = self.model_name(), "analyze.degraded");
                return Ok(degraded);
            }
        };

        tracing::info!(
            model = self.model_name(),
            probability = result.probability().value(),
            has_rewrite = !result.modified_title().is_empty(),
            "analyze.completed"
        );
        cache.record(headline, result.clone());
        Ok(Interpretation::Complete(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::SYSTEM_PROMPT;
    use crate::traits::LlmResponse;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use titlecheck_common::TitleCheckError;

    struct ScriptedClient {
        reply: std::result::Result<&'static str, &'static str>,
        calls: AtomicUsize,
    }

    impl ScriptedClient {
        fn replying(text: &'static str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(message: &'static str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(message),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        async fn generate(
            &self,
            _prompt: &str,
            system_prompt: &str,
            max_tokens: Option<u32>,
            temperature: Option<f32>,
        ) -> Result<LlmResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(system_prompt, SYSTEM_PROMPT);
            assert_eq!(max_tokens, Some(500));
            assert_eq!(temperature, Some(0.5));
            match self.reply {
                Ok(text) => Ok(LlmResponse {
                    text: text.to_string(),
                    model: None,
                    tokens_used: None,
                }),
                Err(msg) => Err(TitleCheckError::Transport(msg.to_string())),
            }
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    #[tokio::test]
    async fn blank_headline_never_calls_the_model() {
        let client = ScriptedClient::replying("{}");
        let analyzer = TitleAnalyzer::new(client.clone());
        let mut cache = LastRequestCache::default();

        for blank in ["", "   ", "\n\t"] {
            let result = analyzer.analyze(blank, &mut cache).await.unwrap();
            assert_eq!(result, empty_headline_result());
        }
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn complete_reply_is_recorded_in_cache() {
        let client = ScriptedClient::replying(
            r#"{"probability":0.92,"suggestions":"去除夸张措辞","modified_title":"某事件引发关注"}"#,
        );
        let analyzer = TitleAnalyzer::new(client.clone());
        let mut cache = LastRequestCache::default();

        let result = analyzer.analyze("震惊！全网疯传", &mut cache).await.unwrap();
        assert_eq!(result.probability().percent(), "92.00%");

        let (headline, cached) = cache.last().unwrap();
        assert_eq!(headline, "震惊！全网疯传");
        assert_eq!(cached, &result);
    }

    #[tokio::test]
    async fn repeated_headline_is_sent_again() {
        let client = ScriptedClient::replying(
            r#"{"probability":0.1,"suggestions":"s","modified_title":""}"#,
        );
        let analyzer = TitleAnalyzer::new(client.clone());
        let mut cache = LastRequestCache::default();

        analyzer.analyze("同一标题", &mut cache).await.unwrap();
        analyzer.analyze("同一标题", &mut cache).await.unwrap();
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn degraded_reply_is_returned_but_not_cached() {
        let analyzer = TitleAnalyzer::new(ScriptedClient::replying("抱歉，我无法回答"));
        let mut cache = LastRequestCache::default();

        let reply = analyzer.analyze_reply("标题", &mut cache).await.unwrap();
        assert!(reply.is_degraded());
        let result = reply.into_result();
        assert_eq!(result.probability(), Probability::ZERO);
        assert!(result.suggestions().contains("抱歉，我无法回答"));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn missing_field_is_a_hard_failure_and_keeps_previous_cache() {
        let analyzer = TitleAnalyzer::new(ScriptedClient::replying(
            r#"{"probability":0.3,"suggestions":"无需修改"}"#,
        ));
        let mut cache = LastRequestCache::default();
        let previous = AnalysisResult::new(Probability::ZERO, "old", "");
        cache.record("旧标题", previous.clone());

        let err = analyzer.analyze("震惊！全网疯传", &mut cache).await.unwrap_err();
        assert!(matches!(err, TitleCheckError::Format { .. }));
        assert_eq!(cache.last(), Some(("旧标题", &previous)));
    }

    #[tokio::test]
    async fn transport_errors_propagate() {
        let analyzer = TitleAnalyzer::new(ScriptedClient::failing("connection refused"));
        let mut cache = LastRequestCache::default();

        let err = analyzer.analyze("标题", &mut cache).await.unwrap_err();
        assert!(matches!(err, TitleCheckError::Transport(msg) if msg == "connection refused"));
    }

    #[test]
    fn for_request_builds_a_client_for_the_named_model() {
        let request = AnalysisRequest::new(
            "标题",
            &titlecheck_common::LlmConfig::OpenAi {
                api_key: "sk-test".into(),
                model: "qwen-turbo".into(),
                base_url: "https://dashscope.aliyuncs.com/compatible-mode/v1".into(),
            },
        )
        .unwrap();
        let analyzer = TitleAnalyzer::for_request(&request).unwrap();
        assert_eq!(analyzer.model_name(), "qwen-turbo");
    }
}
