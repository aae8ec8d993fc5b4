//! Google Gemini API provider.

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::FolioError;
use crate::types::*;

use super::http::{parse_sse_data, shared_client, status_to_error};
use super::{ChatProvider, ChatRequest, DeltaStream};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GoogleProvider {
    model: String,
    api_key: Option<String>,
    base_url: String,
}

impl GoogleProvider {
    /// Create a provider. A missing key is not an error here; every request
    /// made without one fails with [`FolioError::Authentication`].
    pub fn new(model: String, api_key: Option<String>) -> Self {
        let api_key = api_key.filter(|key| !key.trim().is_empty());
        if api_key.is_none() {
            warn!(model = %model, "Gemini API key is not set; chat replies will fail");
        }
        Self {
            model,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the provider at another endpoint (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn stream_url(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        )
    }

    pub fn build_request_body(&self, request: &ChatRequest) -> serde_json::Value {
        let contents: Vec<serde_json::Value> = request
            .contents
            .iter()
            .map(|content| {
                serde_json::json!({
                    "role": gemini_role(content.role),
                    "parts": [{"text": content.text}],
                })
            })
            .collect();

        let mut gen_config = serde_json::Map::new();
        if let Some(max) = request.settings.max_output_tokens {
            gen_config.insert("maxOutputTokens".into(), max.into());
        }
        if let Some(temp) = request.settings.temperature {
            gen_config.insert("temperature".into(), temp.into());
        }
        if let Some(effort) = request.settings.reasoning_effort {
            gen_config.insert(
                "thinkingConfig".into(),
                serde_json::json!({ "thinkingBudget": effort.thinking_budget() }),
            );
        }

        let mut body = serde_json::Map::new();
        body.insert("contents".into(), serde_json::Value::Array(contents));
        if !gen_config.is_empty() {
            body.insert(
                "generationConfig".into(),
                serde_json::Value::Object(gen_config),
            );
        }
        serde_json::Value::Object(body)
    }
}

#[async_trait]
impl ChatProvider for GoogleProvider {
    fn provider_name(&self) -> &str {
        "google"
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn stream_chat(&self, request: &ChatRequest) -> Result<DeltaStream, FolioError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            FolioError::Authentication("GEMINI_API_KEY is not set".to_string())
        })?;
        let body = self.build_request_body(request);

        debug!(
            model = %self.model,
            turns = request.contents.len(),
            "Google stream_chat"
        );

        let resp = shared_client()
            .post(self.stream_url())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body_text));
        }

        let byte_stream = resp.bytes_stream();

        let stream = async_stream::stream! {
            let mut buffer: Vec<u8> = Vec::new();
            let mut stopped = false;
            futures::pin_mut!(byte_stream);

            'read: while let Some(chunk_result) = byte_stream.next().await {
                let chunk = match chunk_result {
                    Ok(c) => c,
                    Err(e) => {
                        stopped = true;
                        yield Err(FolioError::Network(e));
                        break;
                    }
                };
                buffer.extend_from_slice(&chunk);

                while let Some(line_end) = buffer.iter().position(|b| *b == b'\n') {
                    let raw: Vec<u8> = buffer.drain(..=line_end).collect();
                    let line = String::from_utf8_lossy(&raw);
                    let Some(data) = parse_sse_data(line.trim()) else {
                        continue;
                    };
                    match decode_chunk(data) {
                        Ok(Some(delta)) => yield Ok(delta),
                        Ok(None) => {}
                        Err(e) => {
                            stopped = true;
                            yield Err(e);
                            break 'read;
                        }
                    }
                }
            }

            // A final event may arrive without its trailing newline.
            if !stopped && !buffer.is_empty() {
                let line = String::from_utf8_lossy(&buffer).into_owned();
                if let Some(data) = parse_sse_data(line.trim()) {
                    match decode_chunk(data) {
                        Ok(Some(delta)) => yield Ok(delta),
                        Ok(None) => {}
                        Err(e) => yield Err(e),
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

fn gemini_role(role: Role) -> &'static str {
    match role {
        Role::Visitor => "user",
        Role::Assistant => "model",
    }
}

/// Decode one SSE payload into a delta. Chunks with neither text nor a
/// finish reason produce nothing.
fn decode_chunk(data: &str) -> Result<Option<TextStreamDelta>, FolioError> {
    let chunk: GeminiStreamChunk = serde_json::from_str(data)
        .map_err(|e| FolioError::Stream(format!("malformed Gemini stream chunk: {e}")))?;

    if let Some(err) = chunk.error {
        return Err(FolioError::api(err.code.unwrap_or(500), err.message));
    }

    let usage = chunk.usage_metadata.map(|u| Usage {
        input_tokens: u.prompt_token_count,
        output_tokens: u.candidates_token_count,
        total_tokens: u.total_token_count,
        reasoning_tokens: u.thoughts_token_count,
    });

    let Some(candidate) = chunk.candidates.into_iter().next() else {
        return Ok(None);
    };

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter(|part| !part.thought)
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();
    let finish_reason = candidate
        .finish_reason
        .as_deref()
        .map(FinishReason::from_gemini);

    if text.is_empty() && finish_reason.is_none() {
        return Ok(None);
    }

    Ok(Some(TextStreamDelta {
        text,
        finish_reason,
        usage: finish_reason.and(usage),
    }))
}

// Internal Gemini response types

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiStreamChunk {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsage>,
    error: Option<GeminiError>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
    thoughts_token_count: Option<u32>,
}

#[derive(Deserialize)]
struct GeminiError {
    code: Option<u16>,
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn provider() -> GoogleProvider {
        GoogleProvider::new("gemini-2.5-flash-lite".to_string(), Some("k".to_string()))
    }

    #[test]
    fn request_body_maps_roles_and_generation_config() {
        let request = ChatRequest {
            contents: vec![
                ChatContent::visitor("hi"),
                ChatContent::assistant("hello"),
                ChatContent::visitor("more"),
            ],
            settings: GenerationSettings::builder()
                .max_output_tokens(500)
                .reasoning_effort(ReasoningEffort::Minimal)
                .build(),
        };

        let body = provider().build_request_body(&request);

        assert_eq!(
            body,
            serde_json::json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "hi"}]},
                    {"role": "model", "parts": [{"text": "hello"}]},
                    {"role": "user", "parts": [{"text": "more"}]},
                ],
                "generationConfig": {
                    "maxOutputTokens": 500,
                    "thinkingConfig": {"thinkingBudget": 0},
                },
            })
        );
    }

    #[test]
    fn request_body_omits_empty_generation_config() {
        let request = ChatRequest {
            contents: vec![ChatContent::visitor("hi")],
            settings: GenerationSettings::default(),
        };
        let body = provider().build_request_body(&request);
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn stream_url_trims_trailing_slash() {
        let provider = provider().with_base_url("http://localhost:9999/");
        assert_eq!(
            provider.stream_url(),
            "http://localhost:9999/models/gemini-2.5-flash-lite:streamGenerateContent?alt=sse"
        );
    }

    #[test]
    fn text_chunk_decodes_to_delta() {
        let data = r#"{"candidates":[{"content":{"parts":[{"text":"Quiz"}],"role":"model"}}]}"#;
        let delta = decode_chunk(data).unwrap().unwrap();
        assert_eq!(delta, TextStreamDelta::text("Quiz"));
    }

    #[test]
    fn final_chunk_carries_finish_reason_and_usage() {
        let data = r#"{"candidates":[{"content":{"parts":[{"text":"."}]},"finishReason":"MAX_TOKENS"}],"usageMetadata":{"promptTokenCount":10,"candidatesTokenCount":500,"totalTokenCount":510}}"#;
        let delta = decode_chunk(data).unwrap().unwrap();
        assert_eq!(delta.finish_reason, Some(FinishReason::Length));
        assert_eq!(delta.usage.unwrap().total_tokens, 510);
    }

    #[test]
    fn thought_parts_are_not_surfaced() {
        let data = r#"{"candidates":[{"content":{"parts":[{"text":"pondering","thought":true},{"text":"answer"}]}}]}"#;
        let delta = decode_chunk(data).unwrap().unwrap();
        assert_eq!(delta.text, "answer");
    }

    #[test]
    fn error_payload_becomes_api_error() {
        let data = r#"{"error":{"code":503,"message":"overloaded","status":"UNAVAILABLE"}}"#;
        match decode_chunk(data) {
            Err(FolioError::Api { status, message }) => {
                assert_eq!(status, 503);
                assert_eq!(message, "overloaded");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn garbage_payload_is_a_stream_error() {
        assert!(matches!(decode_chunk("{nope"), Err(FolioError::Stream(_))));
    }

    #[test]
    fn empty_candidate_list_yields_nothing() {
        assert!(decode_chunk(r#"{"candidates":[]}"#).unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_key_fails_before_network() {
        let provider = GoogleProvider::new("m".to_string(), None)
            .with_base_url("http://127.0.0.1:1");
        let request = ChatRequest {
            contents: vec![ChatContent::visitor("hi")],
            settings: GenerationSettings::default(),
        };
        let err = match provider.stream_chat(&request).await {
            Ok(_) => panic!("expected missing key error"),
            Err(err) => err,
        };
        assert!(matches!(err, FolioError::Authentication(_)));
    }
}
