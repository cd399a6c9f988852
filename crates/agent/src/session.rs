use uuid::Uuid;

use crate::llm::{ChatMessage, Role};

/// Append-only conversation log. The system entry is fixed at construction.
#[derive(Clone, Debug, PartialEq)]
pub struct Transcript {
    entries: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new(system_entry: impl Into<String>) -> Self {
        Self { entries: vec![ChatMessage::system(system_entry)] }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.entries.push(ChatMessage::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.entries.push(ChatMessage::assistant(content));
    }

    pub fn entries(&self) -> &[ChatMessage] {
        &self.entries
    }

    /// Entries after the system prompt, for display.
    pub fn conversation(&self) -> &[ChatMessage] {
        self.entries.get(1..).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last_role(&self) -> Role {
        self.entries.last().map(|entry| entry.role).unwrap_or(Role::System)
    }
}

/// One user's conversation; owned by the caller and lent to the runtime per turn.
#[derive(Clone, Debug)]
pub struct Session {
    pub id: Uuid,
    pub transcript: Transcript,
}

impl Session {
    pub fn new(system_entry: impl Into<String>) -> Self {
        Self { id: Uuid::new_v4(), transcript: Transcript::new(system_entry) }
    }
}
