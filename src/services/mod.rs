pub mod chat_client;
pub mod conversation;
