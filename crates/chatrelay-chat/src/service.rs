//! Chat service: prompt selection and streamed relay to handlers.

use std::sync::Arc;

use chatrelay_core::{resolve_api_key, ChatRelayConfig, Error, Result};
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use crate::gemini::GeminiModel;
use crate::handlers::StreamHandlers;
use crate::model::{ChatSession, GenerativeModel, StreamChunk};
use crate::prompts::PromptTable;
use crate::types::{ChatResult, Message, StreamParams};

/// Build a service backed by Gemini.
///
/// The key falls back to `GEMINI_API_KEY` / `GOOGLE_API_KEY`. Nothing is
/// validated here; a missing or bad key fails the first conversation.
pub fn create_chat_service(
    api_key: Option<String>,
    config: &ChatRelayConfig,
    prompts: PromptTable,
) -> ChatService {
    let api_key = resolve_api_key(api_key);
    if api_key.is_none() {
        debug!("No API key available; requests will fail until one is set");
    }

    let model = GeminiModel::new(api_key, &config.api);
    info!(
        "Chat service ready: model={}, max_tokens={}, temperature={}",
        config.api.default_model, config.api.max_tokens, config.api.temperature
    );

    ChatService::with_model(Arc::new(model), prompts, &config.api.default_prompt_type)
}

/// Relays conversations to a generative model. Cheap to clone; holds no
/// per-call state.
#[derive(Clone)]
pub struct ChatService {
    model: Arc<dyn GenerativeModel>,
    prompts: Arc<PromptTable>,
    default_prompt_type: String,
}

impl ChatService {
    pub fn with_model(
        model: Arc<dyn GenerativeModel>,
        prompts: PromptTable,
        default_prompt_type: impl Into<String>,
    ) -> Self {
        let default_prompt_type = default_prompt_type.into();
        if !prompts.contains(&default_prompt_type) {
            warn!(
                "Prompt table has no entry for default prompt type '{}'",
                default_prompt_type
            );
        }
        Self {
            model,
            prompts: Arc::new(prompts),
            default_prompt_type,
        }
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    pub fn prompts(&self) -> &PromptTable {
        &self.prompts
    }

    pub fn default_prompt_type(&self) -> &str {
        &self.default_prompt_type
    }

    /// System instruction for `prompt_type`, falling back to the default type.
    pub fn get_system_prompt(&self, prompt_type: &str) -> Option<&str> {
        self.prompts.resolve(prompt_type, &self.default_prompt_type)
    }

    /// Stream one model reply to `handlers` and return the full text.
    ///
    /// Only the parts of the last message are sent to the model. The
    /// system instruction and earlier messages populate the session history
    /// but are not submitted.
    pub async fn stream_conversation(
        &self,
        params: StreamParams,
        mut handlers: StreamHandlers<'_>,
    ) -> Result<ChatResult> {
        let StreamParams {
            messages,
            prompt_type,
            tools,
        } = params;

        let prompt_type = prompt_type.as_deref().unwrap_or(&self.default_prompt_type);
        let instruction = self
            .get_system_prompt(prompt_type)
            .ok_or_else(|| Error::PromptNotFound(prompt_type.to_string()))?;

        let last_parts = messages
            .last()
            .map(|m| m.parts.clone())
            .ok_or(Error::EmptyConversation)?;

        if let Some(tools) = tools.as_ref().filter(|t| !t.is_null()) {
            let count = tools.as_array().map_or(1, Vec::len);
            debug!("Tool use not supported; ignoring {} tool declaration(s)", count);
        }
        if handlers.has_tool_use() {
            debug!("on_tool_use handler supplied; it will not be called");
        }

        let history = build_history(instruction, messages);
        debug!(
            "Starting chat: prompt_type={}, history_len={}",
            prompt_type,
            history.len()
        );

        let session = ChatSession::start(self.model.as_ref(), history);
        let mut stream = session.send_message_stream(last_parts);

        let mut content = String::new();
        while let Some(chunk) = stream.next().await {
            match chunk? {
                StreamChunk::Text(text) => {
                    if !text.is_empty() {
                        handlers.emit_text(&text);
                    }
                    content.push_str(&text);
                }
                StreamChunk::Done {
                    finish_reason,
                    tokens_used,
                } => {
                    debug!(
                        "Reply complete: {} chars, finish_reason={:?}, tokens={:?}",
                        content.len(),
                        finish_reason,
                        tokens_used
                    );
                }
            }
        }

        let result = ChatResult::model(content);
        handlers.emit_message(&result);
        Ok(result)
    }
}

impl std::fmt::Debug for ChatService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatService")
            .field("model", &self.model.model_name())
            .field("prompt_types", &self.prompts.len())
            .field("default_prompt_type", &self.default_prompt_type)
            .finish()
    }
}

/// Synthetic system message followed by the caller's messages, unchanged.
fn build_history(instruction: &str, messages: Vec<Message>) -> Vec<Message> {
    let mut history = Vec::with_capacity(messages.len() + 1);
    history.push(Message::system(instruction));
    history.extend(messages);
    history
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::model::ChunkStream;
    use crate::prompts::PromptTemplate;
    use crate::types::{Part, ROLE_SYSTEM};

    /// Replays a fixed script and records what it was asked to generate.
    struct ScriptedModel {
        script: Vec<&'static str>,
        fail_after: Option<&'static str>,
        sent: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedModel {
        fn new(script: Vec<&'static str>) -> Self {
            Self {
                script,
                fail_after: None,
                sent: Mutex::new(Vec::new()),
            }
        }

        fn failing(script: Vec<&'static str>, error: &'static str) -> Self {
            Self {
                fail_after: Some(error),
                ..Self::new(script)
            }
        }
    }

    impl GenerativeModel for ScriptedModel {
        fn model_name(&self) -> &str {
            "scripted"
        }

        fn stream_generate(&self, contents: Vec<Message>) -> ChunkStream {
            self.sent.lock().unwrap().push(contents);

            let mut items: Vec<Result<StreamChunk>> = self
                .script
                .iter()
                .map(|t| Ok(StreamChunk::Text(t.to_string())))
                .collect();
            match self.fail_after {
                Some(e) => items.push(Err(Error::Http(e.to_string()))),
                None => items.push(Ok(StreamChunk::Done {
                    finish_reason: Some("STOP".into()),
                    tokens_used: Some(self.script.len()),
                })),
            }
            Box::pin(tokio_stream::iter(items))
        }
    }

    fn prompts() -> PromptTable {
        let mut table = PromptTable::default();
        table.insert("general", PromptTemplate::new("Be helpful."));
        table.insert("coding", PromptTemplate::new("Write code."));
        table
    }

    fn service(model: ScriptedModel) -> (ChatService, Arc<ScriptedModel>) {
        let model = Arc::new(model);
        let svc = ChatService::with_model(model.clone(), prompts(), "general");
        (svc, model)
    }

    #[test]
    fn test_system_prompt_lookup() {
        let (svc, _) = service(ScriptedModel::new(vec![]));
        assert_eq!(svc.get_system_prompt("coding"), Some("Write code."));
        assert_eq!(svc.get_system_prompt("general"), Some("Be helpful."));
    }

    #[test]
    fn test_system_prompt_falls_back_to_default() {
        let (svc, _) = service(ScriptedModel::new(vec![]));
        assert_eq!(svc.get_system_prompt("limerick"), Some("Be helpful."));
    }

    #[test]
    fn test_system_prompt_missing_default() {
        let svc = ChatService::with_model(
            Arc::new(ScriptedModel::new(vec![])),
            prompts(),
            "absent",
        );
        assert_eq!(svc.get_system_prompt("limerick"), None);
    }

    #[tokio::test]
    async fn test_hello_example() {
        let (svc, model) = service(ScriptedModel::new(vec!["Hel", "lo"]));
        let texts = Mutex::new(Vec::new());
        let finals = Mutex::new(Vec::new());

        let handlers = StreamHandlers::new()
            .on_text(|t| texts.lock().unwrap().push(t.to_string()))
            .on_message(|m| finals.lock().unwrap().push(m.clone()));
        let result = svc
            .stream_conversation(StreamParams::new(vec![Message::user("Hi")]), handlers)
            .await
            .unwrap();

        assert_eq!(*texts.lock().unwrap(), vec!["Hel", "lo"]);
        assert_eq!(result, ChatResult::model("Hello"));
        assert_eq!(*finals.lock().unwrap(), vec![result]);
        assert_eq!(*model.sent.lock().unwrap(), vec![vec![Message::user("Hi")]]);
    }

    #[tokio::test]
    async fn test_message_fires_after_all_text() {
        let (svc, _) = service(ScriptedModel::new(vec!["a", "", "b", "c"]));
        let events = Mutex::new(Vec::new());

        let handlers = StreamHandlers::new()
            .on_text(|t| events.lock().unwrap().push(format!("text:{}", t)))
            .on_message(|m| events.lock().unwrap().push(format!("message:{}", m.content)));
        svc.stream_conversation(StreamParams::new(vec![Message::user("go")]), handlers)
            .await
            .unwrap();

        assert_eq!(
            *events.lock().unwrap(),
            vec!["text:a", "text:b", "text:c", "message:abc"]
        );
    }

    #[tokio::test]
    async fn test_no_handlers() {
        let (svc, _) = service(ScriptedModel::new(vec!["ok"]));
        let result = svc
            .stream_conversation(
                StreamParams::new(vec![Message::user("Hi")]),
                StreamHandlers::new(),
            )
            .await
            .unwrap();
        assert_eq!(result.content, "ok");
    }

    #[tokio::test]
    async fn test_only_last_message_is_sent() {
        let (svc, model) = service(ScriptedModel::new(vec!["fine"]));
        let messages = vec![
            Message::user("Hi"),
            Message::model("Hello"),
            Message {
                role: "user".into(),
                parts: vec![Part::text("How are"), Part::text(" you?")],
            },
        ];
        svc.stream_conversation(
            StreamParams::new(messages).with_prompt_type("coding"),
            StreamHandlers::new(),
        )
        .await
        .unwrap();

        let sent = model.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].len(), 1);
        assert_eq!(sent[0][0].parts, vec![Part::text("How are"), Part::text(" you?")]);
    }

    #[test]
    fn test_history_leads_with_system_message() {
        let history = build_history("Be helpful.", vec![Message::user("a"), Message::model("b")]);
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].role, ROLE_SYSTEM);
        assert_eq!(history[0].parts, vec![Part::text("Be helpful.")]);
        assert_eq!(history[1..], [Message::user("a"), Message::model("b")]);
    }

    #[tokio::test]
    async fn test_tool_use_never_invoked() {
        let (svc, _) = service(ScriptedModel::new(vec!["x"]));
        let called = Mutex::new(false);

        let handlers = StreamHandlers::new().on_tool_use(|_| *called.lock().unwrap() = true);
        let params = StreamParams::new(vec![Message::user("search")]).with_tools(
            serde_json::json!([{"name": "search", "parameters": {"type": "object"}}]),
        );
        let result = svc.stream_conversation(params, handlers).await.unwrap();

        assert_eq!(result.content, "x");
        assert!(!*called.lock().unwrap());
    }

    #[tokio::test]
    async fn test_stream_error_propagates() {
        let (svc, _) = service(ScriptedModel::failing(vec!["par", "tial"], "connection reset"));
        let texts = Mutex::new(Vec::new());
        let finals = Mutex::new(0);

        let handlers = StreamHandlers::new()
            .on_text(|t| texts.lock().unwrap().push(t.to_string()))
            .on_message(|_| *finals.lock().unwrap() += 1);
        let err = svc
            .stream_conversation(StreamParams::new(vec![Message::user("Hi")]), handlers)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Http(_)));
        assert_eq!(*texts.lock().unwrap(), vec!["par", "tial"]);
        assert_eq!(*finals.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_conversation() {
        let (svc, model) = service(ScriptedModel::new(vec!["x"]));
        let err = svc
            .stream_conversation(StreamParams::new(vec![]), StreamHandlers::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmptyConversation));
        assert!(model.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_prompt_not_found() {
        let svc = ChatService::with_model(
            Arc::new(ScriptedModel::new(vec!["x"])),
            prompts(),
            "absent",
        );
        let err = svc
            .stream_conversation(
                StreamParams::new(vec![Message::user("Hi")]).with_prompt_type("limerick"),
                StreamHandlers::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PromptNotFound(t) if t == "limerick"));
    }

    #[tokio::test]
    async fn test_concurrent_calls_are_independent() {
        let (svc, model) = service(ScriptedModel::new(vec!["same"]));
        let other = svc.clone();

        let (a, b) = tokio::join!(
            svc.stream_conversation(
                StreamParams::new(vec![Message::user("one")]),
                StreamHandlers::new()
            ),
            other.stream_conversation(
                StreamParams::new(vec![Message::user("two")]),
                StreamHandlers::new()
            ),
        );

        assert_eq!(a.unwrap().content, "same");
        assert_eq!(b.unwrap().content, "same");
        assert_eq!(model.sent.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_factory_builds_gemini_service() {
        let config = ChatRelayConfig::default();
        let svc = create_chat_service(Some("test-key".into()), &config, PromptTable::builtin());
        assert_eq!(svc.model_name(), config.api.default_model);
        assert!(svc.get_system_prompt("no-such-type").is_some());
    }
}
