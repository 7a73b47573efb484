//! Request and response payloads for the supported backends.
//!
//! Ollama speaks newline-delimited JSON on `/api/chat` and `/api/generate`;
//! OpenAI-compatible servers stream server-sent events from
//! `/chat/completions`.

use serde::{Deserialize, Serialize};

use crate::core::message::{Message, ToolCall};

#[derive(Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    pub stream: bool,
}

#[derive(Serialize)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<&'a [String]>,
    pub stream: bool,
}

/// One line of an Ollama stream.
///
/// Chat responses carry `message.content`; generate responses carry
/// `response`. The final line has `done: true`. A failure mid-stream is
/// reported as a line with only `error`.
#[derive(Deserialize)]
pub struct OllamaStreamChunk {
    #[serde(default)]
    pub message: Option<OllamaStreamMessage>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub done: Option<bool>,
    #[serde(default)]
    pub done_reason: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl OllamaStreamChunk {
    /// True when the line carries none of the fields a stream chunk has.
    pub fn is_unrecognized(&self) -> bool {
        self.message.is_none() && self.response.is_none() && self.done.is_none()
    }

    pub fn is_done(&self) -> bool {
        self.done.unwrap_or(false)
    }
}

#[derive(Deserialize)]
pub struct OllamaStreamMessage {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Deserialize)]
pub struct ChatResponseDelta {
    pub content: Option<String>,
}

#[derive(Deserialize)]
pub struct ChatResponseChoice {
    #[serde(default)]
    pub delta: Option<ChatResponseDelta>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// One `data:` payload of an OpenAI-compatible event stream.
#[derive(Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatResponseChoice>,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

#[derive(Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// An entry of a model listing, normalized across providers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    #[serde(default)]
    pub created: Option<u64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub owned_by: Option<String>,
}

/// `GET /models` on OpenAI-compatible servers.
#[derive(Deserialize)]
pub struct ModelsResponse {
    pub data: Vec<ModelInfo>,
}

/// `GET /api/tags` on Ollama.
#[derive(Deserialize)]
pub struct OllamaTagsResponse {
    #[serde(default)]
    pub models: Vec<OllamaModelTag>,
}

#[derive(Deserialize)]
pub struct OllamaModelTag {
    pub name: String,
    #[serde(default)]
    pub modified_at: Option<String>,
}

impl From<OllamaTagsResponse> for ModelsResponse {
    fn from(tags: OllamaTagsResponse) -> Self {
        let data = tags
            .models
            .into_iter()
            .map(|tag| ModelInfo {
                id: tag.name,
                created: None,
                created_at: tag.modified_at,
                owned_by: None,
            })
            .collect();
        Self { data }
    }
}

pub mod models;
