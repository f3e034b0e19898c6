//! Streamed chat relay over the Gemini generative-language API.
//!
//! Selects a system prompt by key, opens a chat session, streams the
//! model's reply and hands every text chunk to caller-supplied handlers.

pub mod gemini;
pub mod handlers;
pub mod model;
pub mod prompts;
pub mod service;
pub mod sse;
pub mod types;

pub use gemini::GeminiModel;
pub use handlers::StreamHandlers;
pub use model::{ChatSession, ChunkStream, GenerativeModel, StreamChunk};
pub use prompts::{PromptTable, PromptTemplate};
pub use service::{create_chat_service, ChatService};
pub use types::*;
