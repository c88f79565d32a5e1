use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogMessage {
    pub role: Role,
    pub text: String,
}

/// The side-panel conversation surface. Replies appear in completion order.
#[derive(Debug, Default)]
pub struct ConversationLog {
    messages: Vec<LogMessage>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, role: Role, text: impl Into<String>) {
        self.messages.push(LogMessage {
            role,
            text: text.into(),
        });
    }

    pub fn messages(&self) -> &[LogMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&LogMessage> {
        self.messages.last()
    }

    pub fn last_from(&self, role: Role) -> Option<&LogMessage> {
        self.messages.iter().rev().find(|message| message.role == role)
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
}
