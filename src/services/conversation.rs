// src/services/conversation.rs
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// One turn of the conversation. Never changed once appended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub content: String,
    pub role: MessageRole,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            role,
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// A titled conversation snapshot.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: Uuid,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

impl Chat {
    pub fn new(title: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            messages,
            created_at: Utc::now(),
        }
    }
}

/// Delivery status of a user message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delivery {
    Pending,
    Delivered,
    Failed { reason: String },
}

/// Append-only message list. Delivery status lives beside the messages so
/// the messages themselves stay immutable.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    delivery: HashMap<Uuid, Delivery>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and return its id. User messages start out pending.
    pub fn push(&mut self, message: Message) -> Uuid {
        let id = message.id;
        if message.role == MessageRole::User {
            self.delivery.insert(id, Delivery::Pending);
        }
        self.messages.push(message);
        id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn delivery(&self, id: Uuid) -> Option<&Delivery> {
        self.delivery.get(&id)
    }

    /// Update the status of an existing user message. Returns false for
    /// unknown ids and assistant messages.
    pub fn set_delivery(&mut self, id: Uuid, status: Delivery) -> bool {
        match self.delivery.get_mut(&id) {
            Some(slot) => {
                *slot = status;
                true
            }
            None => false,
        }
    }

    /// Most recent user message whose delivery failed.
    pub fn last_failed(&self) -> Option<Uuid> {
        self.messages
            .iter()
            .rev()
            .filter(|m| m.role == MessageRole::User)
            .find(|m| matches!(self.delivery.get(&m.id), Some(Delivery::Failed { .. })))
            .map(|m| m.id)
    }
}
