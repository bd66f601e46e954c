//! Google Gemini provider (`models/{model}:streamGenerateContent`).
//!
//! Requests use server-sent events (`alt=sse`); every `data:` line carries a
//! partial `GenerateContentResponse`. The text fragments of the first
//! candidate are concatenated into one reply before returning. All Gemini
//! wire types are private to this module.

use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace, warn};

use crate::llm::ProviderError;
use crate::session::{Role, Turn};

const API_KEY_HEADER: &str = "x-goog-api-key";

// ── Public provider ───────────────────────────────────────────────────────────

/// Adapter for the Gemini REST API.
///
/// Constructed once at startup, then cheaply cloned because
/// `reqwest::Client` is an `Arc` internally. No request timeout is set on
/// the client; the response generator bounds each call instead.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: Client,
    api_base_url: String,
    model: String,
    api_key: String,
}

impl GeminiProvider {
    pub fn new(api_base_url: String, model: String, api_key: String) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, api_base_url, model, api_key })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/{}:streamGenerateContent?alt=sse",
            self.api_base_url.trim_end_matches('/'),
            self.model
        )
    }

    /// Send the conversation and return the concatenated reply.
    pub async fn complete(&self, turns: &[Turn]) -> Result<String, ProviderError> {
        let payload = GenerateContentRequest { contents: build_contents(turns) };

        debug!(
            model = %self.model,
            turns = turns.len(),
            contents = payload.contents.len(),
            "sending Gemini request"
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(&payload)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(payload = %json, "full Gemini request payload");
        }

        let response = self
            .client
            .post(self.stream_url())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!(model = %self.model, error = %e, "Gemini HTTP request failed (transport)");
                ProviderError::Request(e.to_string())
            })?;

        let response = check_status(response).await?;

        let mut reply = ReplyAccumulator::default();
        let mut lines = SseLineBuffer::default();
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| {
                error!(error = %e, "Gemini stream interrupted");
                ProviderError::Request(format!("stream read failed: {e}"))
            })?;
            for data in lines.push(&chunk) {
                reply.accept(&data)?;
            }
        }
        if let Some(data) = lines.finish() {
            reply.accept(&data)?;
        }

        debug!(fragments = reply.fragments, "received Gemini reply");
        reply.finish()
    }
}

/// Map turns to Gemini `contents`, merging consecutive turns of the same
/// role into one entry with several parts. The API expects alternating
/// roles; a user turn whose reply failed would otherwise break that.
fn build_contents(turns: &[Turn]) -> Vec<Content<'_>> {
    let mut contents: Vec<Content<'_>> = Vec::new();
    for turn in turns {
        let role = wire_role(turn.role);
        if let Some(last) = contents.last_mut().filter(|c| c.role == role) {
            last.parts.push(Part { text: &turn.text });
            continue;
        }
        contents.push(Content { role, parts: vec![Part { text: &turn.text }] });
    }
    contents
}

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Model => "model",
    }
}

// ── Stream handling ───────────────────────────────────────────────────────────

/// Splits a byte stream into lines and yields the payload of `data:` lines.
///
/// Bytes are buffered until a full line is available, so multi-byte UTF-8
/// sequences split across network chunks are decoded correctly.
#[derive(Default)]
struct SseLineBuffer {
    buffer: Vec<u8>,
}

impl SseLineBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut out = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(data) = sse_data(&line) {
                out.push(data);
            }
        }
        out
    }

    /// Flush a trailing line that had no terminating newline.
    fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        sse_data(&rest)
    }
}

fn sse_data(line: &[u8]) -> Option<String> {
    let line = match std::str::from_utf8(line) {
        Ok(s) => s.trim(),
        Err(e) => {
            warn!(error = %e, "skipping non-UTF-8 SSE line");
            return None;
        }
    };
    let data = line.strip_prefix("data:")?.trim();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    Some(data.to_string())
}

/// Concatenates text fragments from successive stream chunks.
#[derive(Default)]
struct ReplyAccumulator {
    text: String,
    fragments: usize,
}

impl ReplyAccumulator {
    fn accept(&mut self, data: &str) -> Result<(), ProviderError> {
        let chunk: StreamChunk = serde_json::from_str(data).map_err(|e| {
            error!(error = %e, "failed to deserialize Gemini stream chunk");
            ProviderError::Malformed(format!("bad stream chunk: {e}"))
        })?;

        if let Some(reason) = chunk.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(ProviderError::Blocked(reason));
        }

        let Some(candidate) = chunk.candidates.into_iter().next() else {
            return Ok(());
        };
        if let Some(content) = candidate.content {
            for part in content.parts {
                if let Some(text) = part.text {
                    self.text.push_str(&text);
                    self.fragments += 1;
                }
            }
        }
        if let Some(reason) = candidate.finish_reason {
            trace!(%reason, "Gemini finish reason");
        }
        Ok(())
    }

    fn finish(self) -> Result<String, ProviderError> {
        let text = self.text.trim();
        if text.is_empty() {
            return Err(ProviderError::Empty);
        }
        Ok(text.to_string())
    }
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

// Google API error envelope.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Consume the response and return it if successful, or a structured error.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());

    let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(env) => match env.error.status {
            Some(code) => format!("[{code}] {}", env.error.message),
            None => env.error.message,
        },
        Err(_) => body,
    };

    error!(%status, %message, "Gemini request returned HTTP error");
    Err(ProviderError::Http { status: status.as_u16(), message })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sse_body(chunks: &[serde_json::Value]) -> String {
        chunks.iter().map(|c| format!("data: {c}\r\n\r\n")).collect()
    }

    fn text_chunk(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
        })
    }

    async fn provider_for(server: &MockServer) -> GeminiProvider {
        GeminiProvider::new(
            format!("{}/v1beta/models", server.uri()),
            "test-model".into(),
            "test-key".into(),
        )
        .unwrap()
    }

    #[test]
    fn consecutive_roles_are_merged() {
        let turns = [
            Turn::user("hello"),
            Turn::user("anyone there?"),
            Turn::model("yes"),
            Turn::user("good"),
        ];
        let contents = build_contents(&turns);
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0].role, "user");
        assert_eq!(contents[0].parts.len(), 2);
        assert_eq!(contents[1].role, "model");
        assert_eq!(contents[2].parts[0].text, "good");
    }

    #[test]
    fn request_serializes_to_gemini_shape() {
        let turns = [Turn::user("hi")];
        let payload = GenerateContentRequest { contents: build_contents(&turns) };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "contents": [{ "role": "user", "parts": [{ "text": "hi" }] }] })
        );
    }

    #[test]
    fn sse_lines_split_across_chunks() {
        let mut buf = SseLineBuffer::default();
        assert!(buf.push(b"data: {\"a\":").is_empty());
        let out = buf.push(b"1}\r\n\r\n: keep-alive\ndata: [DONE]\n");
        assert_eq!(out, vec!["{\"a\":1}".to_string()]);
        assert!(buf.finish().is_none());
    }

    #[test]
    fn sse_multibyte_split_is_decoded() {
        let line = "data: {\"t\":\"héllo\"}\n".as_bytes();
        let split = line.iter().position(|&b| b == 0xc3).unwrap() + 1;
        let mut buf = SseLineBuffer::default();
        assert!(buf.push(&line[..split]).is_empty());
        assert_eq!(buf.push(&line[split..]), vec!["{\"t\":\"héllo\"}".to_string()]);
    }

    #[test]
    fn trailing_line_without_newline_is_flushed() {
        let mut buf = SseLineBuffer::default();
        assert!(buf.push(b"data: {}").is_empty());
        assert_eq!(buf.finish(), Some("{}".to_string()));
    }

    #[test]
    fn accumulator_rejects_blocked_prompt() {
        let mut acc = ReplyAccumulator::default();
        let err = acc
            .accept(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#)
            .unwrap_err();
        assert!(matches!(err, ProviderError::Blocked(ref r) if r == "SAFETY"));
    }

    #[test]
    fn accumulator_empty_reply_errors() {
        let mut acc = ReplyAccumulator::default();
        acc.accept(r#"{"candidates":[{"finishReason":"STOP"}]}"#).unwrap();
        assert!(matches!(acc.finish(), Err(ProviderError::Empty)));
    }

    #[tokio::test]
    async fn streamed_fragments_are_concatenated() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/test-model:streamGenerateContent"))
            .and(query_param("alt", "sse"))
            .and(header(API_KEY_HEADER, "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                sse_body(&[text_chunk("Hello"), text_chunk(", "), text_chunk("world!")]),
                "text/event-stream",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider_for(&server).await;
        let reply = provider.complete(&[Turn::user("hi")]).await.unwrap();
        assert_eq!(reply, "Hello, world!");
    }

    #[tokio::test]
    async fn http_error_maps_to_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": { "code": 403, "message": "API key not valid", "status": "PERMISSION_DENIED" }
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server).await;
        let err = provider.complete(&[Turn::user("hi")]).await.unwrap_err();
        match err {
            ProviderError::Http { status, message } => {
                assert_eq!(status, 403);
                assert!(message.contains("PERMISSION_DENIED"));
                assert!(message.contains("API key not valid"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn malformed_chunk_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw("data: not-json\n\n", "text/event-stream"),
            )
            .mount(&server)
            .await;

        let provider = provider_for(&server).await;
        let err = provider.complete(&[Turn::user("hi")]).await.unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
    }
}
