//! Gemini `streamGenerateContent` client.
//!
//! Replies are requested with `alt=sse`, so the body is a sequence of
//! `data: {json}` lines, each a partial `GenerateContentResponse`.

use chatrelay_core::{ApiConfig, Error, Result};
use reqwest::Client;
use serde_json::{json, Value};
use tokio_stream::StreamExt;
use tracing::{debug, error};

use crate::model::{ChunkStream, GenerativeModel, StreamChunk};
use crate::sse::SseBuffer;
use crate::types::Message;

/// Finish reasons under which a candidate's text is refused outright.
const BLOCKING_FINISH_REASONS: &[&str] = &["SAFETY", "RECITATION", "LANGUAGE"];

/// A Gemini model handle bound to one model name and generation settings.
#[derive(Debug, Clone)]
pub struct GeminiModel {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    max_output_tokens: u32,
    temperature: f32,
}

impl GeminiModel {
    /// Build a handle. No request is made and the key is not checked here.
    pub fn new(api_key: Option<String>, config: &ApiConfig) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model: config.default_model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_output_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        )
    }

    pub fn request_body(&self, contents: &[Message]) -> Value {
        json!({
            "contents": contents,
            "generationConfig": {
                "maxOutputTokens": self.max_output_tokens,
                "temperature": self.temperature,
            },
        })
    }
}

impl GenerativeModel for GeminiModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn stream_generate(&self, contents: Vec<Message>) -> ChunkStream {
        let client = self.client.clone();
        let api_key = self.api_key.clone();
        let url = self.endpoint();
        let body = self.request_body(&contents);
        let model = self.model.clone();

        Box::pin(async_stream::try_stream! {
            let api_key = api_key.ok_or(Error::MissingApiKey)?;

            debug!("Streaming from Gemini with model {}", model);

            let response = client
                .post(&url)
                .header("x-goog-api-key", api_key)
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await
                .map_err(|e| Error::Http(format!("Request failed: {}", e)))?;

            if !response.status().is_success() {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                error!("Gemini API error {}: {}", status, body);
                Err::<(), _>(Error::Api { status, body })?;
                return;
            }

            let mut stream = response.bytes_stream();
            let mut sse = SseBuffer::new();
            let mut finish_reason = None;
            let mut tokens_used = None;

            while let Some(read) = stream.next().await {
                let bytes = read.map_err(|e| Error::Http(format!("Stream read error: {}", e)))?;

                for data in sse.push(&bytes) {
                    let chunk = decode_chunk(&data)?;
                    finish_reason = chunk.finish_reason.or(finish_reason);
                    tokens_used = chunk.tokens_used.or(tokens_used);
                    yield StreamChunk::Text(chunk.text);
                }
            }

            if let Some(data) = sse.finish() {
                let chunk = decode_chunk(&data)?;
                finish_reason = chunk.finish_reason.or(finish_reason);
                tokens_used = chunk.tokens_used.or(tokens_used);
                yield StreamChunk::Text(chunk.text);
            }

            debug!("Gemini stream finished: reason={:?}, tokens={:?}", finish_reason, tokens_used);
            yield StreamChunk::Done { finish_reason, tokens_used };
        })
    }
}

/// Fields of interest from one streamed `GenerateContentResponse`.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct DecodedChunk {
    pub text: String,
    pub finish_reason: Option<String>,
    pub tokens_used: Option<usize>,
}

pub(crate) fn decode_chunk(data: &str) -> Result<DecodedChunk> {
    let parsed: Value = serde_json::from_str(data)
        .map_err(|e| Error::MalformedResponse(format!("{}: {}", e, data)))?;

    if let Some(err) = parsed.get("error") {
        let status = err["code"].as_u64().unwrap_or(500) as u16;
        let body = err["message"].as_str().unwrap_or("Unknown error").to_string();
        return Err(Error::Api { status, body });
    }

    if let Some(reason) = parsed["promptFeedback"]["blockReason"].as_str() {
        return Err(Error::Blocked(reason.to_string()));
    }

    let candidate = &parsed["candidates"][0];
    let text: String = candidate["content"]["parts"]
        .as_array()
        .map(|parts| parts.iter().filter_map(|p| p["text"].as_str()).collect())
        .unwrap_or_default();

    let finish_reason = candidate["finishReason"].as_str().map(str::to_string);
    if let Some(reason) = finish_reason.as_deref() {
        if BLOCKING_FINISH_REASONS.contains(&reason) {
            return Err(Error::Blocked(reason.to_string()));
        }
    }

    let tokens_used = parsed["usageMetadata"]["totalTokenCount"]
        .as_u64()
        .map(|n| n as usize);

    Ok(DecodedChunk {
        text,
        finish_reason,
        tokens_used,
    })
}
