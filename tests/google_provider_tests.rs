use futures::StreamExt;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use folio::error::FolioError;
use folio::provider::{ChatProvider, ChatRequest, GoogleProvider};
use folio::types::{ChatContent, FinishReason, GenerationSettings, ReasoningEffort};
use pretty_assertions::assert_eq;

const STREAM_PATH: &str = "/models/gemini-test:streamGenerateContent";

fn provider(server: &MockServer) -> GoogleProvider {
    GoogleProvider::new("gemini-test".to_string(), Some("test-key".to_string()))
        .with_base_url(server.uri())
}

fn request() -> ChatRequest {
    ChatRequest {
        contents: vec![
            ChatContent::visitor("hello"),
            ChatContent::assistant("Hi!"),
            ChatContent::visitor("What is QuizWiz?"),
        ],
        settings: GenerationSettings::builder()
            .max_output_tokens(500)
            .reasoning_effort(ReasoningEffort::Minimal)
            .build(),
    }
}

fn sse(chunks: &[serde_json::Value]) -> String {
    chunks
        .iter()
        .map(|chunk| format!("data: {chunk}\r\n\r\n"))
        .collect()
}

fn text_chunk(text: &str) -> serde_json::Value {
    json!({"candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]})
}

#[tokio::test]
async fn streams_fragments_in_order() {
    let server = MockServer::start().await;
    let body = sse(&[
        text_chunk("Quiz"),
        text_chunk("Wiz is a chatbot platform."),
        json!({
            "candidates": [{"content": {"parts": [{"text": ""}]}, "finishReason": "STOP"}],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 7, "totalTokenCount": 19}
        }),
    ]);

    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .and(query_param("alt", "sse"))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [
                {"role": "user", "parts": [{"text": "hello"}]},
                {"role": "model", "parts": [{"text": "Hi!"}]},
                {"role": "user", "parts": [{"text": "What is QuizWiz?"}]}
            ],
            "generationConfig": {
                "maxOutputTokens": 500,
                "thinkingConfig": {"thinkingBudget": 0}
            }
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(body),
        )
        .expect(1)
        .mount(&server)
        .await;

    let stream = provider(&server)
        .stream_chat(&request())
        .await
        .expect("stream should start");
    let deltas: Vec<_> = stream.collect().await;

    let deltas: Vec<_> = deltas
        .into_iter()
        .map(|d| d.expect("delta should decode"))
        .collect();
    let text: String = deltas.iter().map(|d| d.text.as_str()).collect();
    assert_eq!(text, "QuizWiz is a chatbot platform.");
    let last = deltas.last().unwrap();
    assert_eq!(last.finish_reason, Some(FinishReason::Stop));
    assert_eq!(last.usage.as_ref().map(|u| u.total_tokens), Some(19));
}

#[tokio::test]
async fn unauthorized_maps_to_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"code": 403, "message": "Permission denied", "status": "PERMISSION_DENIED"}
        })))
        .mount(&server)
        .await;

    let err = provider(&server).stream_chat(&request()).await.err().unwrap();
    assert!(matches!(err, FolioError::Authentication(ref msg) if msg.contains("Permission denied")));
}

#[tokio::test]
async fn quota_exhaustion_maps_to_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {
                "code": 429,
                "message": "Resource has been exhausted",
                "details": [{"@type": "type.googleapis.com/google.rpc.RetryInfo", "retryDelay": "17s"}]
            }
        })))
        .mount(&server)
        .await;

    let err = provider(&server).stream_chat(&request()).await.err().unwrap();
    assert!(matches!(
        err,
        FolioError::RateLimited {
            retry_after_ms: Some(17_000)
        }
    ));
}

#[tokio::test]
async fn server_error_keeps_status_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": {"code": 503, "message": "The model is overloaded."}
        })))
        .mount(&server)
        .await;

    let err = provider(&server).stream_chat(&request()).await.err().unwrap();
    match err {
        FolioError::Api { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "The model is overloaded.");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn error_inside_stream_ends_it() {
    let server = MockServer::start().await;
    let body = sse(&[
        text_chunk("Partial"),
        json!({"error": {"code": 500, "message": "Internal error"}}),
        text_chunk("never seen"),
    ]);
    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let stream = provider(&server).stream_chat(&request()).await.unwrap();
    let items: Vec<_> = stream.collect().await;

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap().text, "Partial");
    assert!(matches!(items[1], Err(FolioError::Api { status: 500, .. })));
}

#[tokio::test]
async fn missing_key_never_reaches_the_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let provider = GoogleProvider::new("gemini-test".to_string(), None).with_base_url(server.uri());
    let err = provider.stream_chat(&request()).await.err().unwrap();
    assert!(matches!(err, FolioError::Authentication(_)));
}

#[tokio::test]
async fn final_event_without_trailing_newline_is_kept() {
    let server = MockServer::start().await;
    let body = format!(
        "data: {}\n\ndata: {}",
        text_chunk("Quiz"),
        json!({"candidates": [{"content": {"parts": [{"text": "Wiz"}]}, "finishReason": "STOP"}]})
    );
    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let stream = provider(&server).stream_chat(&request()).await.unwrap();
    let deltas: Vec<_> = stream.map(|d| d.expect("delta should decode")).collect().await;

    let text: String = deltas.iter().map(|d| d.text.as_str()).collect();
    assert_eq!(text, "QuizWiz");
    assert_eq!(deltas.last().unwrap().finish_reason, Some(FinishReason::Stop));
}
