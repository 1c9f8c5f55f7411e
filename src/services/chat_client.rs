// src/services/chat_client.rs
use std::future::Future;

use reqwest::{Client, Url};
use tracing::debug;

use crate::{
    config::ClientConfig,
    error::ClientError,
    message::{ChatRequest, ChatResponse},
};

/// Something that turns a user message into a reply.
pub trait ChatBackend: Send + Sync {
    fn send_message(
        &self,
        message: String,
    ) -> impl Future<Output = Result<String, ClientError>> + Send;
}

/// `POST`s messages to the chat service as JSON.
#[derive(Clone, Debug)]
pub struct HttpChatClient {
    http: Client,
    endpoint: Url,
}

impl HttpChatClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn post(&self, message: String) -> Result<String, ClientError> {
        debug!(endpoint = %self.endpoint, len = message.len(), "sending chat message");

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&ChatRequest { message })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ClientError::Status { status, body });
        }

        let parsed: ChatResponse = serde_json::from_str(&body)?;
        debug!(%status, len = parsed.reply.len(), "chat reply received");
        Ok(parsed.reply)
    }
}

impl ChatBackend for HttpChatClient {
    fn send_message(
        &self,
        message: String,
    ) -> impl Future<Output = Result<String, ClientError>> + Send {
        self.post(message)
    }
}
