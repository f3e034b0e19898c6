//! Generative model abstraction and chat sessions.

use std::pin::Pin;

use chatrelay_core::Result;
use futures::Stream;

use crate::types::{Message, Part, ROLE_USER};

/// Boxed stream of decoded chunks from a model.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>;

/// A single decoded item of a streamed reply.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    Text(String),
    Done {
        finish_reason: Option<String>,
        tokens_used: Option<usize>,
    },
}

/// Trait for streaming text-generation backends.
pub trait GenerativeModel: Send + Sync {
    /// Model identifier, e.g. `gemini-1.5-flash`.
    fn model_name(&self) -> &str;

    /// Stream a reply for `contents`. The request is issued when the
    /// stream is first polled; failures arrive as `Err` items.
    fn stream_generate(&self, contents: Vec<Message>) -> ChunkStream;
}

/// A chat opened against a model with a fixed history.
pub struct ChatSession<'m> {
    model: &'m dyn GenerativeModel,
    history: Vec<Message>,
}

impl<'m> ChatSession<'m> {
    pub fn start(model: &'m dyn GenerativeModel, history: Vec<Message>) -> Self {
        Self { model, history }
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Send `parts` as a user turn and stream the reply.
    ///
    /// Only `parts` is submitted. The session history is not part of the
    /// request.
    pub fn send_message_stream(&self, parts: Vec<Part>) -> ChunkStream {
        let turn = Message {
            role: ROLE_USER.into(),
            parts,
        };
        self.model.stream_generate(vec![turn])
    }
}
