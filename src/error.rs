// src/error.rs
use reqwest::StatusCode;
use thiserror::Error;

/// Everything that can go wrong during one round trip to the chat service.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("chat service answered {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Why a submission was refused. None of these touch the view state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("message is empty")]
    EmptyInput,

    #[error("still waiting for the previous reply")]
    InFlight,

    #[error("message cannot be retried")]
    NotRetryable,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid endpoint `{endpoint}`: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("endpoint must use http or https, got `{0}`")]
    UnsupportedScheme(String),
}
