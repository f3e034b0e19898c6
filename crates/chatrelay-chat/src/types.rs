//! Chat types shared by the service, the model client and callers.

use serde::{Deserialize, Serialize};

pub const ROLE_SYSTEM: &str = "system";
pub const ROLE_USER: &str = "user";
pub const ROLE_MODEL: &str = "model";

/// One content fragment of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Chat message in conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Message {
    pub fn new(role: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            parts: vec![Part::text(text)],
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(ROLE_USER, text)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::new(ROLE_MODEL, text)
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(ROLE_SYSTEM, text)
    }
}

/// Incoming stream request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamParams {
    pub messages: Vec<Message>,
    #[serde(default, rename = "promptType")]
    pub prompt_type: Option<String>,
    /// Tool declarations. Accepted for forward compatibility; never sent.
    #[serde(default)]
    pub tools: Option<serde_json::Value>,
}

impl StreamParams {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn with_prompt_type(mut self, prompt_type: impl Into<String>) -> Self {
        self.prompt_type = Some(prompt_type.into());
        self
    }

    pub fn with_tools(mut self, tools: serde_json::Value) -> Self {
        self.tools = Some(tools);
        self
    }
}

/// Final result of a streamed conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatResult {
    pub role: String,
    pub content: String,
}

impl ChatResult {
    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: ROLE_MODEL.into(),
            content: content.into(),
        }
    }
}

/// A tool invocation requested by the model. Tool calling is not wired up,
/// so values of this type are never produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_params_wire_names() {
        let params: StreamParams = serde_json::from_value(serde_json::json!({
            "messages": [{"role": "user", "parts": [{"text": "Hi"}]}],
            "promptType": "coding",
            "tools": [{"name": "search"}],
        }))
        .unwrap();
        assert_eq!(params.messages, vec![Message::user("Hi")]);
        assert_eq!(params.prompt_type.as_deref(), Some("coding"));
        assert!(params.tools.is_some());
    }

    #[test]
    fn test_optional_fields_default() {
        let params: StreamParams = serde_json::from_str(r#"{"messages": []}"#).unwrap();
        assert!(params.prompt_type.is_none());
        assert!(params.tools.is_none());
    }

    #[test]
    fn test_chat_result_shape() {
        let json = serde_json::to_value(ChatResult::model("Hello")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "model", "content": "Hello"}));
    }
}
