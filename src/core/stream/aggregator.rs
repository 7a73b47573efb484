use crate::core::message::{Message, ToolCall};

use super::dialect::Delta;
use super::error::CallbackError;

/// Per-delta hook. Runs inline on the read loop, so a slow callback slows
/// consumption of the body.
pub type DeltaCallback<'a> = Box<dyn FnMut(Message) -> Result<(), CallbackError> + Send + 'a>;

/// Accumulates delta text in arrival order.
pub struct DeltaAggregator<'a> {
    buffer: String,
    tool_calls: Vec<ToolCall>,
    callback: Option<DeltaCallback<'a>>,
    accepted: usize,
    delivered: usize,
}

impl<'a> DeltaAggregator<'a> {
    pub fn new(callback: Option<DeltaCallback<'a>>) -> Self {
        Self {
            buffer: String::new(),
            tool_calls: Vec::new(),
            callback,
            accepted: 0,
            delivered: 0,
        }
    }

    /// Appends `delta` and hands a copy of just this fragment to the callback.
    ///
    /// The text is part of the buffer even when the callback rejects it.
    pub fn accept(&mut self, delta: Delta) -> Result<(), CallbackError> {
        self.buffer.push_str(&delta.text);
        self.accepted += 1;

        if let Some(callback) = self.callback.as_mut() {
            callback(Message::assistant(delta.text))?;
            self.delivered += 1;
        }
        Ok(())
    }

    pub fn record_tool_calls(&mut self, calls: Vec<ToolCall>) {
        self.tool_calls.extend(calls);
    }

    pub fn content(&self) -> &str {
        &self.buffer
    }

    pub fn accepted(&self) -> usize {
        self.accepted
    }

    pub fn delivered(&self) -> usize {
        self.delivered
    }

    pub fn into_partial(self) -> String {
        self.buffer
    }

    pub fn finalize(self) -> Message {
        let mut message = Message::assistant(self.buffer);
        if !self.tool_calls.is_empty() {
            message.tool_calls = Some(self.tool_calls);
        }
        message
    }
}
