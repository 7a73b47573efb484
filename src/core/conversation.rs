use std::collections::VecDeque;

use crate::core::message::Message;

/// Conversation history for one session.
///
/// Only finished turns are stored: the user message and the assistant reply
/// are appended together once a stream completes.
#[derive(Debug, Clone)]
pub struct Conversation {
    system: Message,
    messages: VecDeque<Message>,
    max_messages: usize,
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>, max_messages: usize) -> Self {
        Self {
            system: Message::system(system_prompt),
            messages: VecDeque::new(),
            max_messages: max_messages.max(1),
        }
    }

    pub fn system(&self) -> &Message {
        &self.system
    }

    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.system = Message::system(prompt);
    }

    pub fn messages(&self) -> &VecDeque<Message> {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Records a completed exchange.
    pub fn record_turn(&mut self, user: Message, reply: Message) {
        self.messages.push_back(user);
        self.messages.push_back(reply);
    }

    /// The messages to send with `pending`: system prompt first, then the
    /// most recent history, keeping the total within `max_messages`.
    ///
    /// The pending message and the system prompt are always included.
    pub fn prepare(&self, pending: &Message) -> Vec<Message> {
        let history_budget = self.max_messages.saturating_sub(2);
        let skip = self.messages.len().saturating_sub(history_budget);

        let mut prepared = Vec::with_capacity(history_budget + 2);
        prepared.push(self.system.clone());
        prepared.extend(self.messages.iter().skip(skip).cloned());
        prepared.push(pending.clone());
        prepared
    }
}
