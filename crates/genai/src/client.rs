use std::collections::VecDeque;
use std::pin::Pin;

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use http::header;
use serde::{Deserialize, Serialize};
use tracing::warn;

use common::config::GenAiConfig;
use common::text::truncate;

use crate::error::GenerationError;
use crate::sse::SseReader;

/// Finite, non-restartable sequence of text deltas from one generation call.
pub type TextDeltaStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub temperature: f32,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn stream_completion(&self, request: GenerationRequest) -> Result<TextDeltaStream>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Deserialize, Default)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

const DONE_SENTINEL: &str = "[DONE]";

/// Streaming client for an OpenAI-compatible chat-completions endpoint.
pub struct ChatCompletionsClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl ChatCompletionsClient {
    pub fn new(config: &GenAiConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("review-prep-lab")
            .build()
            .expect("reqwest client");
        Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }
}

struct DeltaState {
    bytes: BoxStream<'static, Result<Vec<u8>>>,
    reader: SseReader,
    pending: VecDeque<String>,
    done: bool,
}

#[async_trait]
impl TextGenerator for ChatCompletionsClient {
    async fn stream_completion(&self, request: GenerationRequest) -> Result<TextDeltaStream> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            stream: true,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header(header::ACCEPT, "text/event-stream")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Http {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(anyhow::Error::from))
            .boxed();
        let state = DeltaState {
            bytes,
            reader: SseReader::new(),
            pending: VecDeque::new(),
            done: false,
        };

        let deltas = stream::unfold(state, |mut state| async move {
            loop {
                if let Some(delta) = state.pending.pop_front() {
                    return Some((Ok(delta), state));
                }
                if state.done {
                    return None;
                }
                match state.bytes.next().await {
                    Some(Ok(chunk)) => {
                        for data in state.reader.feed(&chunk) {
                            if data == DONE_SENTINEL {
                                state.done = true;
                                break;
                            }
                            if let Some(delta) = extract_delta(&data) {
                                state.pending.push_back(delta);
                            }
                        }
                    }
                    Some(Err(err)) => {
                        state.done = true;
                        return Some((Err(err), state));
                    }
                    None => {
                        state.done = true;
                        if let Some(data) = state.reader.flush() {
                            if data != DONE_SENTINEL {
                                if let Some(delta) = extract_delta(&data) {
                                    state.pending.push_back(delta);
                                }
                            }
                        }
                    }
                }
            }
        });

        Ok(Box::pin(deltas))
    }
}

/// The text delta of one stream chunk, if any. Unparseable payloads are
/// logged and skipped rather than failing the stream.
fn extract_delta(data: &str) -> Option<String> {
    let chunk: StreamChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(err) => {
            warn!(
                error = %err,
                preview = %truncate(data, 120),
                "skipping unparseable stream event"
            );
            return None;
        }
    };
    chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|text| !text.is_empty())
}
