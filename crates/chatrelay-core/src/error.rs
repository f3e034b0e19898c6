//! Error types for ChatRelay.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No API key configured (set GEMINI_API_KEY or pass one explicitly)")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Prompt blocked: {0}")]
    Blocked(String),

    #[error("Prompt type not found: {0}")]
    PromptNotFound(String),

    #[error("Conversation has no messages")]
    EmptyConversation,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
