use std::fmt;
use std::time::Duration;

use futures::StreamExt;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::LexiError;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Clone)]
pub struct GeminiClientConfig {
    pub base_url: String,
    pub api_key: String,
    /// `None` leaves the transport default in place.
    pub timeout: Option<Duration>,
    pub max_error_body_bytes: usize,
}

impl GeminiClientConfig {
    pub fn from_env() -> Result<Self, LexiError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source.
    ///
    /// Required:
    /// - `GEMINI_API_KEY` (or `API_KEY`)
    ///
    /// Optional:
    /// - `GEMINI_BASE_URL`, `GEMINI_TIMEOUT_SECS`, `GEMINI_MAX_ERROR_BODY_BYTES`
    pub fn from_vars<F>(var: F) -> Result<Self, LexiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = var("GEMINI_API_KEY")
            .or_else(|| var("API_KEY"))
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                LexiError::Config("GEMINI_API_KEY environment variable is required".to_string())
            })?;

        let base_url = var("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout = match var("GEMINI_TIMEOUT_SECS") {
            Some(raw) => Some(Duration::from_secs(raw.trim().parse::<u64>().map_err(|_| {
                LexiError::Config(format!("GEMINI_TIMEOUT_SECS is not a number: {raw}"))
            })?)),
            None => None,
        };

        let max_error_body_bytes = match var("GEMINI_MAX_ERROR_BODY_BYTES") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
                LexiError::Config(format!("GEMINI_MAX_ERROR_BODY_BYTES is not a number: {raw}"))
            })?,
            None => 8 * 1024,
        };

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout,
            max_error_body_bytes,
        })
    }
}

impl fmt::Debug for GeminiClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("max_error_body_bytes", &self.max_error_body_bytes)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid response JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("invalid UTF-8 in event stream: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("upstream returned error: status={status} message={message}")]
    Upstream { status: StatusCode, message: String },

    #[error("upstream returned non-JSON error: status={status} body={body}")]
    UpstreamBody { status: StatusCode, body: String },
}

#[derive(Clone)]
pub struct GeminiClient {
    config: GeminiClientConfig,
    http: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: GeminiClientConfig) -> Result<Self, GeminiError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("lexilaw/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &GeminiClientConfig {
        &self.config
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        let builder = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.config.api_key);
        match self.config.timeout {
            Some(timeout) => builder.timeout(timeout),
            None => builder,
        }
    }

    /// One non-streaming `generateContent` round trip.
    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GeminiError> {
        let url = format!("{}/models/{}:generateContent", self.config.base_url, model);
        let resp = self.post(&url).json(request).send().await?;
        if !resp.status().is_success() {
            return Err(Self::to_upstream_error(resp, self.config.max_error_body_bytes).await);
        }
        // Read as text first so a bad body surfaces as InvalidJson, not a transport error.
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// `streamGenerateContent` over SSE. Each text delta is handed to `on_chunk`
    /// as it arrives; the concatenated text is returned once the stream closes.
    pub async fn stream_generate_content<F>(
        &self,
        model: &str,
        request: &GenerateContentRequest,
        mut on_chunk: F,
    ) -> Result<String, GeminiError>
    where
        F: FnMut(&str),
    {
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.config.base_url, model
        );
        let resp = self.post(&url).json(request).send().await?;
        if !resp.status().is_success() {
            return Err(Self::to_upstream_error(resp, self.config.max_error_body_bytes).await);
        }

        let mut stream = resp.bytes_stream();
        // Raw bytes: a multibyte character may straddle two network chunks.
        let mut buffer: Vec<u8> = Vec::new();
        let mut out = String::new();
        let mut push_event = |data: &str, out: &mut String| -> Result<(), GeminiError> {
            let chunk = serde_json::from_str::<GenerateContentResponse>(data)?;
            if let Some(piece) = chunk.text() {
                on_chunk(&piece);
                out.push_str(&piece);
            }
            Ok(())
        };

        while let Some(next) = stream.next().await {
            let bytes = next?;
            buffer.extend_from_slice(&bytes);
            for data in drain_sse_data(&mut buffer)? {
                push_event(&data, &mut out)?;
            }
        }
        // The final event may not be followed by a blank line.
        buffer.extend_from_slice(b"\n\n");
        for data in drain_sse_data(&mut buffer)? {
            push_event(&data, &mut out)?;
        }
        Ok(out)
    }

    async fn to_upstream_error(resp: reqwest::Response, max_error_body_bytes: usize) -> GeminiError {
        let status = resp.status();
        let body = read_limited_text(resp, max_error_body_bytes).await;
        if let Ok(parsed) = serde_json::from_str::<GoogleErrorEnvelope>(&body) {
            let message = parsed
                .error
                .message
                .unwrap_or_else(|| "unknown upstream error".to_string());
            return GeminiError::Upstream { status, message };
        }
        GeminiError::UpstreamBody { status, body }
    }
}

/// Remove every complete SSE event from `buffer` and return the payloads of
/// their `data:` lines. Incomplete trailing input is left in place.
///
/// Only complete events are decoded, so a character split across reads is
/// reassembled before it reaches `String::from_utf8`.
pub(crate) fn drain_sse_data(buffer: &mut Vec<u8>) -> Result<Vec<String>, GeminiError> {
    if buffer.contains(&b'\r') {
        buffer.retain(|&b| b != b'\r');
    }
    let mut payloads = Vec::new();
    while let Some(idx) = buffer.windows(2).position(|w| w == b"\n\n") {
        let event = String::from_utf8(buffer.drain(..idx + 2).collect())?;
        let data: Vec<&str> = event
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .collect();
        if !data.is_empty() {
            payloads.push(data.join("\n"));
        }
    }
    Ok(payloads)
}

async fn read_limited_text(resp: reqwest::Response, max_bytes: usize) -> String {
    match resp.bytes().await {
        Ok(mut b) => {
            if b.len() > max_bytes {
                b.truncate(max_bytes);
            }
            String::from_utf8_lossy(&b).to_string()
        }
        Err(e) => {
            warn!(error = %e, "failed to read upstream error body");
            "<failed to read error body>".to_string()
        }
    }
}

#[derive(Debug, Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleErrorObject,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorObject {
    message: Option<String>,
    #[allow(dead_code)]
    code: Option<u16>,
    #[allow(dead_code)]
    status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    /// Single user turn with no instruction or generation settings.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            contents: vec![Content::user(text)],
            system_instruction: None,
            generation_config: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![Part::text(text)],
        }
    }

    /// Role-less content, as used for `systemInstruction`.
    pub fn instruction(text: impl Into<String>) -> Self {
        Self {
            role: None,
            parts: vec![Part::text(text)],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<UsageMetadata>,
    pub prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate, or `None` when it carries no text.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    pub prompt_token_count: Option<u64>,
    pub candidates_token_count: Option<u64>,
    pub total_token_count: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn config_requires_api_key() {
        let err = GeminiClientConfig::from_vars(vars(&[])).unwrap_err();
        assert!(matches!(err, LexiError::Config(_)));

        let err = GeminiClientConfig::from_vars(vars(&[("GEMINI_API_KEY", "   ")])).unwrap_err();
        assert!(matches!(err, LexiError::Config(_)));
    }

    #[test]
    fn config_falls_back_to_api_key_and_defaults() {
        let config = GeminiClientConfig::from_vars(vars(&[("API_KEY", "k-123")])).unwrap();
        assert_eq!(config.api_key, "k-123");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, None);
        assert_eq!(config.max_error_body_bytes, 8 * 1024);
    }

    #[test]
    fn config_reads_overrides() {
        let config = GeminiClientConfig::from_vars(vars(&[
            ("GEMINI_API_KEY", "primary"),
            ("API_KEY", "ignored"),
            ("GEMINI_BASE_URL", "http://localhost:9000/v1beta/"),
            ("GEMINI_TIMEOUT_SECS", "45"),
            ("GEMINI_MAX_ERROR_BODY_BYTES", "256"),
        ]))
        .unwrap();
        assert_eq!(config.api_key, "primary");
        assert_eq!(config.base_url, "http://localhost:9000/v1beta");
        assert_eq!(config.timeout, Some(Duration::from_secs(45)));
        assert_eq!(config.max_error_body_bytes, 256);
    }

    #[test]
    fn config_rejects_bad_numbers() {
        let err = GeminiClientConfig::from_vars(vars(&[
            ("GEMINI_API_KEY", "k"),
            ("GEMINI_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("GEMINI_TIMEOUT_SECS"));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = GeminiClientConfig::from_vars(vars(&[("GEMINI_API_KEY", "sk-secret")])).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn request_serializes_in_camel_case() {
        let request = GenerateContentRequest {
            contents: vec![Content::user("Force Majeure")],
            system_instruction: Some(Content::instruction("be a lexicographer")),
            generation_config: Some(GenerationConfig {
                temperature: Some(0.3),
                response_mime_type: Some("application/json".to_string()),
                ..Default::default()
            }),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["contents"][0]["parts"][0]["text"], "Force Majeure");
        assert!(value["systemInstruction"].get("role").is_none());
        assert_eq!(value["systemInstruction"]["parts"][0]["text"], "be a lexicographer");
        assert_eq!(value["generationConfig"]["responseMimeType"], "application/json");
        assert!(value["generationConfig"].get("responseSchema").is_none());
        assert!(value["generationConfig"].get("maxOutputTokens").is_none());
    }

    #[test]
    fn response_text_joins_first_candidate_parts() {
        let raw = r#"{
            "candidates": [
                {"content": {"role": "model", "parts": [{"text": "**void** "}, {"text": "无效的"}]}, "finishReason": "STOP"},
                {"content": {"parts": [{"text": "ignored"}]}}
            ],
            "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 5, "totalTokenCount": 15}
        }"#;
        let resp: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.text().as_deref(), Some("**void** 无效的"));
        assert_eq!(resp.usage_metadata.unwrap().total_token_count, Some(15));
    }

    #[test]
    fn response_without_text_is_none() {
        let blocked: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        assert!(blocked.text().is_none());
        assert_eq!(
            blocked.prompt_feedback.unwrap().block_reason.as_deref(),
            Some("SAFETY")
        );

        let empty: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates": [{"content": {"parts": []}}]}"#).unwrap();
        assert!(empty.text().is_none());
    }

    #[test]
    fn sse_drain_keeps_partial_events() {
        let mut buffer = b"data: {\"a\":1}\r\n\r\ndata: {\"b\"".to_vec();
        let events = drain_sse_data(&mut buffer).unwrap();
        assert_eq!(events, vec!["{\"a\":1}".to_string()]);
        assert_eq!(buffer, b"data: {\"b\"");

        buffer.extend_from_slice(b":2}\n\n: keep-alive\n\n");
        let events = drain_sse_data(&mut buffer).unwrap();
        assert_eq!(events, vec!["{\"b\":2}".to_string()]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn sse_drain_waits_for_split_characters() {
        let event = "data: {\"text\":\"无效的\"}\n\n".as_bytes();
        let cut = event.iter().position(|&b| b == 0xE6).unwrap() + 1;

        let mut buffer = event[..cut].to_vec();
        assert!(drain_sse_data(&mut buffer).unwrap().is_empty());
        buffer.extend_from_slice(&event[cut..]);
        let events = drain_sse_data(&mut buffer).unwrap();
        assert_eq!(events, vec!["{\"text\":\"无效的\"}".to_string()]);
    }

    #[test]
    fn sse_drain_rejects_invalid_utf8() {
        let mut buffer = b"data: \xff\xfe\n\n".to_vec();
        assert!(matches!(
            drain_sse_data(&mut buffer),
            Err(GeminiError::InvalidUtf8(_))
        ));
    }
}
