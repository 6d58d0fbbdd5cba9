mod common;

use serde_json::{json, Value};
use titlecheck_common::{LastRequestCache, LlmConfig, TitleCheckError};
use titlecheck_llm::analyzer::TitleAnalyzer;
use titlecheck_llm::ensure_llm_ready;
use titlecheck_llm::openai::APP_REFERER;
use titlecheck_llm::prompt::SYSTEM_PROMPT;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn completion(content: &str) -> Value {
    json!({
        "id": "gen-1",
        "model": "qwen-turbo",
        "choices": [
            {"index": 0, "message": {"role": "assistant", "content": content}, "finish_reason": "stop"}
        ],
        "usage": {"prompt_tokens": 300, "completion_tokens": 40, "total_tokens": 340}
    })
}

fn analyzer_for(server: &MockServer) -> TitleAnalyzer {
    let client = ensure_llm_ready(&LlmConfig::OpenAi {
        api_key: "sk-test".into(),
        model: "qwen-turbo".into(),
        base_url: format!("{}/compatible-mode/v1", server.uri()),
    })
    .expect("client builds");
    TitleAnalyzer::new(client)
}

#[tokio::test]
async fn sends_one_chat_completion_with_fixed_sampling_and_app_headers() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/compatible-mode/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(header("http-referer", APP_REFERER))
        .and(header(
            "x-title",
            "%E7%BD%91%E7%BB%9C%E6%96%B0%E9%97%BB%E6%A0%87%E9%A2%98%E5%A4%B1%E8%8C%83%E8%87%AA%E5%8A%A8%E6%A3%80%E6%B5%8B%E7%B3%BB%E7%BB%9F",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            r#"{"probability":0.92,"suggestions":"去除夸张措辞","modified_title":"某事件引发关注"}"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let mut cache = LastRequestCache::default();
    let result = analyzer_for(&server)
        .analyze("震惊！全网疯传", &mut cache)
        .await
        .expect("analysis succeeds");

    assert_eq!(result.probability().value(), 0.92);
    assert_eq!(result.suggestions(), "去除夸张措辞");
    assert_eq!(result.modified_title(), "某事件引发关注");

    let requests: Vec<Request> = server.received_requests().await.expect("recording on");
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["model"], "qwen-turbo");
    assert_eq!(body["temperature"], 0.5);
    assert_eq!(body["max_tokens"], 500);
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][0]["content"], SYSTEM_PROMPT);
    assert_eq!(body["messages"][1]["role"], "user");
    assert!(body["messages"][1]["content"]
        .as_str()
        .unwrap()
        .contains("'震惊！全网疯传'"));
}

#[tokio::test]
async fn fenced_reply_with_prose_is_unwrapped() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    let reply = "好的，以下是分析结果：\n```json\n{\"probability\": 0.55, \"suggestions\": \"避免情绪化用语\", \"modified_title\": \"专家解读某政策\"}\n```\n希望对你有帮助。";
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(reply)))
        .mount(&server)
        .await;

    let mut cache = LastRequestCache::default();
    let result = analyzer_for(&server)
        .analyze("专家：这个政策将改变一切", &mut cache)
        .await
        .unwrap();
    assert_eq!(result.probability().value(), 0.55);
    assert_eq!(result.modified_title(), "专家解读某政策");
}

#[tokio::test]
async fn reply_missing_modified_title_is_a_format_error() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            r#"{"probability":0.3,"suggestions":"无需修改"}"#,
        )))
        .mount(&server)
        .await;

    let mut cache = LastRequestCache::default();
    let err = analyzer_for(&server)
        .analyze("震惊！全网疯传", &mut cache)
        .await
        .unwrap_err();
    assert!(matches!(err, TitleCheckError::Format { .. }));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn provider_error_status_is_a_transport_error_with_message() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"error": {"message": "No auth credentials found", "code": 401}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut cache = LastRequestCache::default();
    let err = analyzer_for(&server)
        .analyze("标题", &mut cache)
        .await
        .unwrap_err();
    match err {
        TitleCheckError::Transport(msg) => assert!(msg.contains("No auth credentials found")),
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_choices_is_a_transport_error() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let mut cache = LastRequestCache::default();
    let err = analyzer_for(&server)
        .analyze("标题", &mut cache)
        .await
        .unwrap_err();
    assert!(matches!(err, TitleCheckError::Transport(_)));
}

#[tokio::test]
async fn null_content_is_a_transport_error() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": null}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut cache = LastRequestCache::default();
    let err = analyzer_for(&server)
        .analyze("标题", &mut cache)
        .await
        .unwrap_err();
    assert!(matches!(err, TitleCheckError::Transport(ref m) if m.contains("empty content")));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_error() {
    common::init_test_tracing();
    let client = ensure_llm_ready(&LlmConfig::OpenAi {
        api_key: "sk-test".into(),
        model: "m".into(),
        base_url: "http://127.0.0.1:9/v1".into(),
    })
    .unwrap();

    let mut cache = LastRequestCache::default();
    let err = TitleAnalyzer::new(client)
        .analyze("标题", &mut cache)
        .await
        .unwrap_err();
    assert!(matches!(err, TitleCheckError::Transport(_)));
}

#[test]
fn missing_configuration_is_reported_before_any_call() {
    assert!(matches!(
        ensure_llm_ready(&LlmConfig::None),
        Err(TitleCheckError::Config(_))
    ));
}
