//! Gemini `streamGenerateContent` implementation of [`AnalysisClient`].
//!
//! One POST per analysis carrying the fixed instruction text plus the PDF as
//! an `inlineData` part, consumed as an SSE stream (`alt=sse`). The client is
//! stateless across invocations: a fresh `reqwest::Client` is built per call
//! so credential and endpoint changes take effect on the very next
//! submission, with no restart.
//!
//! The API key travels in the `x-goog-api-key` header rather than the query
//! string so it never appears in request URLs or logs.

use crate::client::{AnalysisClient, ProgressObserver};
use crate::config::AnalysisConfig;
use crate::document::{EncodedPayload, PDF_MEDIA_TYPE};
use crate::error::AnalyzeError;
use crate::prompts::DEFAULT_INSTRUCTION;
use crate::snapshot::AnalysisSnapshot;
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Streaming client for the Gemini document-understanding API.
pub struct GeminiClient {
    config: AnalysisConfig,
}

impl GeminiClient {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.config.api_base.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl AnalysisClient for GeminiClient {
    async fn analyze(
        &self,
        payload: &EncodedPayload,
        observer: Arc<dyn ProgressObserver>,
        cancel: CancellationToken,
    ) -> Result<AnalysisSnapshot, AnalyzeError> {
        if payload.is_empty() {
            return Err(AnalyzeError::EmptyPayload);
        }
        let api_key = self.config.resolve_api_key()?;
        if cancel.is_cancelled() {
            return Err(AnalyzeError::Cancelled);
        }

        let request = build_request(&self.config, payload);
        info!("starting streaming analysis with model {}", self.config.model);

        // Fresh client per call: no pooled connection or cached TLS state
        // outlives the request.
        let http = reqwest::Client::new();
        let response = http
            .post(self.endpoint())
            .header("x-goog-api-key", &api_key)
            .json(&request)
            .send()
            .await
            .map_err(AnalyzeError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalyzeError::Api {
                status: status.as_u16(),
                message: extract_api_error(&body),
            });
        }

        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut accumulated = String::new();
        let mut increments = 0usize;

        loop {
            let chunk = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("analysis cancelled after {} increments", increments);
                    return Err(AnalyzeError::Cancelled);
                }
                next = stream.next() => match next {
                    None => break,
                    Some(Ok(bytes)) => bytes,
                    Some(Err(e)) => return Err(AnalyzeError::Http(e)),
                },
            };

            buffer.extend_from_slice(&chunk);
            while let Some(event) = next_sse_event(&mut buffer) {
                for data in data_lines(&event) {
                    if let Some(text) = parse_stream_data(data)? {
                        accumulated.push_str(&text);
                        increments += 1;
                        observer.on_progress(&AnalysisSnapshot::new(accumulated.clone()));
                    }
                }
            }
        }

        debug!(
            "stream closed: {} increments, {} chars total",
            increments,
            accumulated.chars().count()
        );
        Ok(AnalysisSnapshot::new(accumulated))
    }
}

// ── Request building ─────────────────────────────────────────────────────

fn build_request<'a>(config: &'a AnalysisConfig, payload: &'a EncodedPayload) -> GenerateRequest<'a> {
    let instruction = config.instruction.as_deref().unwrap_or(DEFAULT_INSTRUCTION);
    GenerateRequest {
        contents: vec![Content {
            parts: vec![
                Part {
                    text: Some(instruction),
                    inline_data: None,
                },
                Part {
                    text: None,
                    inline_data: Some(Blob {
                        mime_type: PDF_MEDIA_TYPE,
                        data: payload.as_str(),
                    }),
                },
            ],
        }],
        generation_config: GenerationConfig {
            temperature: config.temperature,
            top_p: config.top_p,
            max_output_tokens: config.max_output_tokens,
        },
    }
}

// ── SSE stream parsing ───────────────────────────────────────────────────

/// Pop the next complete SSE event (terminated by a blank line) off the
/// front of `buffer`, leaving any partial tail in place.
///
/// The buffer holds raw bytes: network chunk boundaries fall anywhere,
/// including inside a multi-byte UTF-8 sequence, so decoding happens only
/// once a full event is available. Event boundaries are ASCII newlines and
/// never split a code point.
fn next_sse_event(buffer: &mut Vec<u8>) -> Option<String> {
    let end = buffer.windows(2).position(|w| w == b"\n\n")?;
    let event = String::from_utf8_lossy(&buffer[..end]).into_owned();
    buffer.drain(..end + 2);
    Some(event)
}

/// The `data:` payload lines of one SSE event.
fn data_lines(event: &str) -> Vec<&str> {
    event
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim_start)
        .collect()
}

/// Decode one `data:` payload into an optional text increment.
///
/// Mid-stream error payloads and abnormal finish reasons fail the whole
/// call; a chunk with no text (usage metadata, normal STOP) yields `None`.
fn parse_stream_data(data: &str) -> Result<Option<String>, AnalyzeError> {
    let trimmed = data.trim();
    if trimmed.is_empty() || trimmed == "[DONE]" {
        return Ok(None);
    }

    let chunk: StreamChunk =
        serde_json::from_str(trimmed).map_err(|e| AnalyzeError::MalformedResponse {
            detail: format!("unparseable stream chunk: {e}"),
        })?;

    if let Some(error) = chunk.error {
        return Err(AnalyzeError::Interrupted {
            reason: error.message,
        });
    }

    let mut text = String::new();
    for candidate in &chunk.candidates {
        if let Some(ref reason) = candidate.finish_reason {
            if reason != "STOP" {
                warn!("stream ended with finish reason {reason}");
                return Err(AnalyzeError::Interrupted {
                    reason: reason.clone(),
                });
            }
        }
        if let Some(ref content) = candidate.content {
            for part in &content.parts {
                if let Some(ref t) = part.text {
                    text.push_str(t);
                }
            }
        }
    }

    if text.is_empty() {
        Ok(None)
    } else {
        Ok(Some(text))
    }
}

/// Pull the human-readable message out of an error response body, falling
/// back to the raw body when it is not the documented JSON shape.
fn extract_api_error(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "no error detail provided".to_string()
            } else {
                trimmed.to_string()
            }
        })
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Part<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<Blob<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Blob<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    fn sample_payload() -> EncodedPayload {
        let doc = Document::new("a.pdf", PDF_MEDIA_TYPE, b"%PDF-1.4".to_vec());
        EncodedPayload::encode(&doc)
    }

    #[test]
    fn request_carries_instruction_and_inline_pdf() {
        let config = AnalysisConfig::default();
        let payload = sample_payload();
        let request = build_request(&config, &payload);
        let json = serde_json::to_value(&request).unwrap();

        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], DEFAULT_INSTRUCTION);
        assert_eq!(parts[1]["inlineData"]["mimeType"], PDF_MEDIA_TYPE);
        assert_eq!(parts[1]["inlineData"]["data"], payload.as_str());
    }

    #[test]
    fn request_uses_deterministic_generation_config() {
        let config = AnalysisConfig::default();
        let payload = sample_payload();
        let json = serde_json::to_value(build_request(&config, &payload)).unwrap();

        let gen = &json["generationConfig"];
        assert!((gen["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
        assert!((gen["topP"].as_f64().unwrap() - 0.95).abs() < 1e-6);
        assert!(gen.get("maxOutputTokens").is_none());
    }

    #[test]
    fn custom_instruction_overrides_default() {
        let config = AnalysisConfig::builder()
            .instruction("transcribe verbatim")
            .build()
            .unwrap();
        let payload = sample_payload();
        let json = serde_json::to_value(build_request(&config, &payload)).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "transcribe verbatim");
    }

    #[test]
    fn endpoint_joins_base_and_model() {
        let client = GeminiClient::new(
            AnalysisConfig::builder()
                .api_base("http://localhost:8080/")
                .model("test-model")
                .build()
                .unwrap(),
        );
        assert_eq!(
            client.endpoint(),
            "http://localhost:8080/v1beta/models/test-model:streamGenerateContent?alt=sse"
        );
    }

    #[test]
    fn sse_events_pop_only_when_complete() {
        let mut buffer = b"data: {\"a\":1}\n\ndata: {\"b\"".to_vec();
        let event = next_sse_event(&mut buffer).unwrap();
        assert_eq!(event, "data: {\"a\":1}");
        assert!(next_sse_event(&mut buffer).is_none());
        assert_eq!(buffer, b"data: {\"b\"");

        buffer.extend_from_slice(b":2}\n\n");
        assert_eq!(next_sse_event(&mut buffer).unwrap(), "data: {\"b\":2}");
        assert!(buffer.is_empty());
    }

    #[test]
    fn multibyte_text_split_across_chunks_is_not_corrupted() {
        let full = format!(
            "data: {}\n\n",
            r##"{"candidates":[{"content":{"parts":[{"text":"日本語"}]}}]}"##
        );
        let bytes = full.as_bytes();
        // Split one byte into the three-byte encoding of 日, as a network
        // chunk boundary may.
        let split = full.find('日').unwrap() + 1;

        let mut buffer = bytes[..split].to_vec();
        assert!(next_sse_event(&mut buffer).is_none());

        buffer.extend_from_slice(&bytes[split..]);
        let event = next_sse_event(&mut buffer).unwrap();
        let text = parse_stream_data(data_lines(&event)[0]).unwrap().unwrap();
        assert_eq!(text, "日本語");
    }

    #[test]
    fn data_lines_strip_prefix_and_leading_space() {
        let lines = data_lines("event: message\ndata: {\"x\":1}\ndata:{\"y\":2}");
        assert_eq!(lines, vec!["{\"x\":1}", "{\"y\":2}"]);
    }

    #[test]
    fn parse_extracts_text_from_candidate_parts() {
        let data = r##"{"candidates":[{"content":{"parts":[{"text":"# Tit"}],"role":"model"},"index":0}]}"##;
        assert_eq!(parse_stream_data(data).unwrap(), Some("# Tit".to_string()));
    }

    #[test]
    fn parse_tolerates_stop_finish_reason_with_text() {
        let data = r#"{"candidates":[{"content":{"parts":[{"text":"le"}]},"finishReason":"STOP"}]}"#;
        assert_eq!(parse_stream_data(data).unwrap(), Some("le".to_string()));
    }

    #[test]
    fn parse_skips_metadata_only_chunks_and_done() {
        let data = r#"{"candidates":[],"usageMetadata":{"promptTokenCount":10}}"#;
        assert_eq!(parse_stream_data(data).unwrap(), None);
        assert_eq!(parse_stream_data("[DONE]").unwrap(), None);
        assert_eq!(parse_stream_data("   ").unwrap(), None);
    }

    #[test]
    fn parse_fails_on_error_payload() {
        let data = r#"{"error":{"code":429,"message":"quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        let err = parse_stream_data(data).unwrap_err();
        assert!(matches!(err, AnalyzeError::Interrupted { ref reason } if reason == "quota exceeded"));
    }

    #[test]
    fn parse_fails_on_abnormal_finish_reason() {
        let data = r#"{"candidates":[{"finishReason":"SAFETY"}]}"#;
        let err = parse_stream_data(data).unwrap_err();
        assert!(matches!(err, AnalyzeError::Interrupted { ref reason } if reason == "SAFETY"));
    }

    #[test]
    fn parse_fails_on_malformed_json() {
        let err = parse_stream_data("{not json").unwrap_err();
        assert!(matches!(err, AnalyzeError::MalformedResponse { .. }));
    }

    #[test]
    fn api_error_body_yields_message() {
        let body = r#"{"error":{"code":403,"message":"API key not valid","status":"PERMISSION_DENIED"}}"#;
        assert_eq!(extract_api_error(body), "API key not valid");
        assert_eq!(extract_api_error("plain text failure"), "plain text failure");
        assert_eq!(extract_api_error(""), "no error detail provided");
    }

    #[tokio::test]
    async fn empty_payload_is_rejected_before_any_request() {
        let client = GeminiClient::new(AnalysisConfig::default());
        let doc = Document::new("a.pdf", PDF_MEDIA_TYPE, vec![]);
        let payload = EncodedPayload::encode(&doc);
        let err = client
            .analyze(&payload, Arc::new(crate::client::NoopObserver), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzeError::EmptyPayload));
    }

    #[tokio::test]
    async fn pre_cancelled_token_short_circuits() {
        let client = GeminiClient::new(
            AnalysisConfig::builder().api_key("sk-test").build().unwrap(),
        );
        let payload = sample_payload();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = client
            .analyze(&payload, Arc::new(crate::client::NoopObserver), cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
