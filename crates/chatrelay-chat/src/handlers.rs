//! Caller-supplied stream callbacks.
//!
//! Every callback is optional. An absent callback is skipped, never an error.

use crate::types::{ChatResult, ToolCall};

type TextFn<'a> = Box<dyn FnMut(&str) + Send + 'a>;
type MessageFn<'a> = Box<dyn FnMut(&ChatResult) + Send + 'a>;
type ToolUseFn<'a> = Box<dyn FnMut(&ToolCall) + Send + 'a>;

/// Callbacks invoked while a conversation streams.
#[derive(Default)]
pub struct StreamHandlers<'a> {
    on_text: Option<TextFn<'a>>,
    on_message: Option<MessageFn<'a>>,
    on_tool_use: Option<ToolUseFn<'a>>,
}

impl<'a> StreamHandlers<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once per non-empty text chunk, in stream order.
    pub fn on_text(mut self, f: impl FnMut(&str) + Send + 'a) -> Self {
        self.on_text = Some(Box::new(f));
        self
    }

    /// Called once with the full reply after the stream is exhausted.
    pub fn on_message(mut self, f: impl FnMut(&ChatResult) + Send + 'a) -> Self {
        self.on_message = Some(Box::new(f));
        self
    }

    /// Accepted for API compatibility. Tool calling is not implemented and
    /// this callback is never invoked.
    pub fn on_tool_use(mut self, f: impl FnMut(&ToolCall) + Send + 'a) -> Self {
        self.on_tool_use = Some(Box::new(f));
        self
    }

    pub fn has_tool_use(&self) -> bool {
        self.on_tool_use.is_some()
    }

    pub(crate) fn emit_text(&mut self, chunk: &str) {
        if let Some(f) = self.on_text.as_mut() {
            f(chunk);
        }
    }

    pub(crate) fn emit_message(&mut self, result: &ChatResult) {
        if let Some(f) = self.on_message.as_mut() {
            f(result);
        }
    }
}

impl std::fmt::Debug for StreamHandlers<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandlers")
            .field("on_text", &self.on_text.is_some())
            .field("on_message", &self.on_message.is_some())
            .field("on_tool_use", &self.on_tool_use.is_some())
            .finish()
    }
}
