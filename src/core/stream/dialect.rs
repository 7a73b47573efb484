use serde::{Deserialize, Serialize};

use crate::api::{ChatResponse, OllamaStreamChunk};
use crate::core::message::ToolCall;

use super::error::DecodeError;
use super::splitter::Frame;

const DONE_SENTINEL: &str = "[DONE]";
const DATA_PREFIX: &str = "data:";

/// Wire encoding of a streamed reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dialect {
    /// One JSON object per line with a `done` flag (Ollama).
    NewlineDelimited,
    /// `data: <json>` lines closed by `data: [DONE]` (OpenAI).
    EventStream,
}

/// One incremental piece of model output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta {
    pub text: String,
}

impl Delta {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// End-of-turn markers a frame can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndSignal {
    /// `done: true` on a newline-delimited frame.
    DoneFlag,
    /// `[DONE]` on an event stream.
    Sentinel,
    /// `finish_reason: "stop"` on an event-stream choice.
    FinishStop,
}

impl EndSignal {
    pub fn dialect(self) -> Dialect {
        match self {
            EndSignal::DoneFlag => Dialect::NewlineDelimited,
            EndSignal::Sentinel | EndSignal::FinishStop => Dialect::EventStream,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedFrame {
    pub delta: Option<Delta>,
    pub end: Option<EndSignal>,
    pub tool_calls: Vec<ToolCall>,
}

impl DecodedFrame {
    fn skip() -> Self {
        Self::default()
    }
}

impl Dialect {
    pub fn decode(self, frame: &Frame) -> Result<DecodedFrame, DecodeError> {
        let line = frame.as_text()?;
        match self {
            Dialect::NewlineDelimited => decode_ndjson(line),
            Dialect::EventStream => decode_event(line),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::NewlineDelimited => "ndjson",
            Dialect::EventStream => "event-stream",
        }
    }
}

fn decode_ndjson(line: &str) -> Result<DecodedFrame, DecodeError> {
    let chunk: OllamaStreamChunk = serde_json::from_str(line)?;
    if let Some(error) = chunk.error {
        return Err(DecodeError::Backend(error));
    }
    if chunk.is_unrecognized() {
        return Err(DecodeError::Unrecognized(Dialect::NewlineDelimited.as_str()));
    }
    let end = chunk.is_done().then_some(EndSignal::DoneFlag);

    let mut tool_calls = Vec::new();
    let text = match chunk.message {
        Some(message) => {
            tool_calls = message.tool_calls.unwrap_or_default();
            message.content
        }
        None => chunk.response.unwrap_or_default(),
    };

    Ok(DecodedFrame {
        delta: Some(Delta::new(text)),
        end,
        tool_calls,
    })
}

fn decode_event(line: &str) -> Result<DecodedFrame, DecodeError> {
    if line == DONE_SENTINEL {
        return Ok(sentinel());
    }

    // Comment lines and non-data fields carry nothing we render.
    if line.starts_with(':') || is_non_data_field(line) {
        return Ok(DecodedFrame::skip());
    }

    let payload = line
        .strip_prefix(DATA_PREFIX)
        .ok_or(DecodeError::MissingDataPrefix)?
        .trim_start();

    if payload == DONE_SENTINEL {
        return Ok(sentinel());
    }
    if payload.is_empty() {
        return Ok(DecodedFrame::skip());
    }

    let response: ChatResponse = serde_json::from_str(payload)?;
    if let Some(error) = response.error {
        return Err(DecodeError::Backend(
            error.message.unwrap_or_else(|| payload.to_string()),
        ));
    }

    let Some(choice) = response.choices.into_iter().next() else {
        return Ok(DecodedFrame::skip());
    };

    let text = choice
        .delta
        .and_then(|delta| delta.content)
        .unwrap_or_default();
    let end = (choice.finish_reason.as_deref() == Some("stop")).then_some(EndSignal::FinishStop);

    Ok(DecodedFrame {
        delta: Some(Delta::new(text)),
        end,
        tool_calls: Vec::new(),
    })
}

fn sentinel() -> DecodedFrame {
    DecodedFrame {
        delta: None,
        end: Some(EndSignal::Sentinel),
        tool_calls: Vec::new(),
    }
}

fn is_non_data_field(line: &str) -> bool {
    ["event:", "id:", "retry:"]
        .iter()
        .any(|field| line.starts_with(field))
}
