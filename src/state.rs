// src/state.rs
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::{
    error::{ClientError, SubmitError},
    services::{
        chat_client::ChatBackend,
        conversation::{Chat, Conversation, Delivery, Message, MessageRole},
    },
};

/// Identifies one request so a late reply can't land on the wrong message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestToken(u64);

/// A request the caller has to perform and hand back to [`ChatView::settle`].
#[derive(Clone, Debug)]
pub struct PendingRequest {
    pub token: RequestToken,
    pub message_id: Uuid,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Settlement {
    /// The reply was appended as this assistant message.
    Replied(Uuid),
    /// The user message was marked failed.
    Failed(Uuid),
    /// The token did not belong to the request in flight.
    Stale,
}

/// State behind the chat screen: messages, the input field and the one
/// request that may be outstanding.
#[derive(Debug, Default)]
pub struct ChatView {
    conversation: Conversation,
    input: String,
    in_flight: Option<PendingRequest>,
    next_token: u64,
}

impl ChatView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Whether the send control should be enabled.
    pub fn can_submit(&self) -> bool {
        !self.is_loading() && !self.input.trim().is_empty()
    }

    pub fn messages(&self) -> &[Message] {
        self.conversation.messages()
    }

    pub fn delivery(&self, id: Uuid) -> Option<&Delivery> {
        self.conversation.delivery(id)
    }

    pub fn last_failed(&self) -> Option<Uuid> {
        self.conversation.last_failed()
    }

    /// Append the trimmed input as a user message and start a request for it.
    pub fn submit(&mut self) -> Result<PendingRequest, SubmitError> {
        let text = self.input.trim();
        if text.is_empty() {
            return Err(SubmitError::EmptyInput);
        }
        if self.is_loading() {
            return Err(SubmitError::InFlight);
        }

        let text = text.to_string();
        let message_id = self.conversation.push(Message::user(text.clone()));
        self.input.clear();

        Ok(self.start(message_id, text))
    }

    /// Send a failed user message again. No new user message is appended.
    pub fn retry(&mut self, message_id: Uuid) -> Result<PendingRequest, SubmitError> {
        if self.is_loading() {
            return Err(SubmitError::InFlight);
        }

        let text = match (self.conversation.get(message_id), self.conversation.delivery(message_id)) {
            (Some(msg), Some(Delivery::Failed { .. })) if msg.role == MessageRole::User => {
                msg.content.clone()
            }
            _ => return Err(SubmitError::NotRetryable),
        };

        self.conversation.set_delivery(message_id, Delivery::Pending);
        Ok(self.start(message_id, text))
    }

    pub fn retry_last_failed(&mut self) -> Result<PendingRequest, SubmitError> {
        let id = self.last_failed().ok_or(SubmitError::NotRetryable)?;
        self.retry(id)
    }

    fn start(&mut self, message_id: Uuid, text: String) -> PendingRequest {
        self.next_token += 1;
        let pending = PendingRequest {
            token: RequestToken(self.next_token),
            message_id,
            text,
        };
        debug!(token = self.next_token, %message_id, "request started");
        self.in_flight = Some(pending.clone());
        pending
    }

    /// Record the outcome of a request. Clears the loading flag unless the
    /// token is stale.
    pub fn settle(
        &mut self,
        token: RequestToken,
        outcome: Result<String, ClientError>,
    ) -> Settlement {
        let pending = match self.in_flight.take() {
            Some(p) if p.token == token => p,
            other => {
                warn!(?token, "ignoring reply for a request that is no longer in flight");
                self.in_flight = other;
                return Settlement::Stale;
            }
        };

        match outcome {
            Ok(reply) => {
                self.conversation
                    .set_delivery(pending.message_id, Delivery::Delivered);
                let id = self.conversation.push(Message::assistant(reply));
                Settlement::Replied(id)
            }
            Err(e) => {
                error!(error = %e, message_id = %pending.message_id, "Failed to send message");
                self.conversation.set_delivery(
                    pending.message_id,
                    Delivery::Failed {
                        reason: e.to_string(),
                    },
                );
                Settlement::Failed(pending.message_id)
            }
        }
    }

    /// Submit the current input and wait for the reply.
    pub async fn send<B: ChatBackend>(&mut self, backend: &B) -> Result<Settlement, SubmitError> {
        let pending = self.submit()?;
        let outcome = backend.send_message(pending.text).await;
        Ok(self.settle(pending.token, outcome))
    }

    pub fn to_chat(&self, title: impl Into<String>) -> Chat {
        Chat::new(title, self.conversation.messages().to_vec())
    }
}
