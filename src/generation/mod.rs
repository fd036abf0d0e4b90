//! Answer generation with a single bounded tool round.

mod model;

pub use model::{ChatModel, ModelTurn, OpenAIChatModel};

use crate::error::{PensumError, Result};
use crate::search::SourceTracker;
use crate::tools::ToolRegistry;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// System prompt for course material queries.
const SYSTEM_PROMPT: &str = "\
You are an assistant for course materials with access to tools for course information.

Tool usage:
- Use get_course_outline for questions about a course's structure, syllabus, or lesson list; \
present every lesson with its number and title.
- Use search_course_content for questions about specific course content or lesson details.
- Answer general-knowledge questions directly without tools.
- You get one tool call per question, so choose filters carefully.
- If a tool yields no results, say so clearly without offering alternatives.

Responses must be brief, accurate, and free of meta-commentary about tools or reasoning.";

/// Response text for tool calls beyond the per-round bound.
const EXTRA_CALL_NOTICE: &str =
    "Only one tool invocation is allowed per question; this call was not executed.";

/// Loop states for one query.
///
/// `AwaitingFirstResponse -> {Done | ExecutingTool} -> AwaitingFinalResponse -> Done`.
/// The bound of exactly one tool round is structural: `ExecutingTool` always
/// transitions to the final call, which is made without a tool schema.
enum LoopState {
    AwaitingFirstResponse,
    ExecutingTool(Vec<ChatCompletionMessageToolCall>),
    AwaitingFinalResponse,
    Done(String),
}

/// Runs the generative model with an optional single tool round.
pub struct AnswerGenerator {
    model: Arc<dyn ChatModel>,
}

impl AnswerGenerator {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// Answer a query, consulting the registry's tools at most once.
    ///
    /// Citations for any consulted sources land on `sources`; a query
    /// answered without tools leaves the tracker untouched.
    pub async fn generate(
        &self,
        query: &str,
        history: Option<&str>,
        registry: &ToolRegistry,
        sources: &mut SourceTracker,
    ) -> Result<String> {
        let system_content = match history {
            Some(h) => format!("{}\n\nPrevious conversation:\n{}", SYSTEM_PROMPT, h),
            None => SYSTEM_PROMPT.to_string(),
        };

        let mut messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_content)
                .build()
                .map_err(|e| PensumError::Generation(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(query.to_string())
                .build()
                .map_err(|e| PensumError::Generation(e.to_string()))?
                .into(),
        ];

        let mut state = LoopState::AwaitingFirstResponse;

        loop {
            state = match state {
                LoopState::AwaitingFirstResponse => {
                    let tools = if registry.is_empty() {
                        None
                    } else {
                        Some(registry.definitions())
                    };
                    let turn = self.model.complete(messages.clone(), tools).await?;

                    if turn.tool_calls.is_empty() {
                        LoopState::Done(turn.into_text()?)
                    } else {
                        let assistant = ChatCompletionRequestAssistantMessageArgs::default()
                            .tool_calls(turn.tool_calls.clone())
                            .build()
                            .map_err(|e| PensumError::Generation(e.to_string()))?;
                        messages.push(assistant.into());
                        LoopState::ExecutingTool(turn.tool_calls)
                    }
                }

                LoopState::ExecutingTool(calls) => {
                    for (i, call) in calls.iter().enumerate() {
                        let result = if i == 0 {
                            self.run_tool(call, registry, sources).await?
                        } else {
                            warn!("Refusing extra tool call '{}'", call.function.name);
                            EXTRA_CALL_NOTICE.to_string()
                        };

                        let tool_msg = ChatCompletionRequestToolMessageArgs::default()
                            .tool_call_id(call.id.clone())
                            .content(result)
                            .build()
                            .map_err(|e| PensumError::Generation(e.to_string()))?;
                        messages.push(tool_msg.into());
                    }
                    LoopState::AwaitingFinalResponse
                }

                LoopState::AwaitingFinalResponse => {
                    // No tool schema this time; whatever comes back is final.
                    let turn = self.model.complete(messages.clone(), None).await?;
                    LoopState::Done(turn.into_text()?)
                }

                LoopState::Done(answer) => return Ok(answer),
            };
        }
    }

    /// Dispatch one tool call. Malformed arguments become a textual error
    /// the model can recover from; dispatch and backend failures propagate.
    async fn run_tool(
        &self,
        call: &ChatCompletionMessageToolCall,
        registry: &ToolRegistry,
        sources: &mut SourceTracker,
    ) -> Result<String> {
        let name = &call.function.name;
        debug!("Model requested tool '{}'", name);

        let args: serde_json::Value = match serde_json::from_str(&call.function.arguments) {
            Ok(v) => v,
            Err(e) => return Ok(format!("Tool error: arguments were not valid JSON ({})", e)),
        };

        match registry.execute(name, &args, sources).await {
            Ok(text) => Ok(text),
            Err(e) if e.is_recoverable_in_tool() => {
                warn!("Tool '{}' rejected arguments: {}", name, e);
                Ok(format!("Tool error: {}", e))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::Citation;
    use crate::tools::Tool;
    use async_openai::types::{
        ChatCompletionTool, ChatCompletionToolType, FunctionCall, FunctionObjectArgs,
    };
    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays a fixed sequence of turns and records what each call offered.
    struct ScriptedModel {
        turns: Mutex<VecDeque<ModelTurn>>,
        tools_offered: Mutex<Vec<bool>>,
        first_system: Mutex<Option<String>>,
    }

    impl ScriptedModel {
        fn new(turns: Vec<ModelTurn>) -> Self {
            Self {
                turns: Mutex::new(turns.into()),
                tools_offered: Mutex::new(Vec::new()),
                first_system: Mutex::new(None),
            }
        }

        fn call_count(&self) -> usize {
            self.tools_offered.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(
            &self,
            messages: Vec<ChatCompletionRequestMessage>,
            tools: Option<Vec<ChatCompletionTool>>,
        ) -> Result<ModelTurn> {
            self.tools_offered.lock().unwrap().push(tools.is_some());
            if let Some(ChatCompletionRequestMessage::System(system)) = messages.first() {
                if let async_openai::types::ChatCompletionRequestSystemMessageContent::Text(t) =
                    &system.content
                {
                    self.first_system.lock().unwrap().get_or_insert(t.clone());
                }
            }
            self.turns
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| PensumError::Generation("script exhausted".to_string()))
        }
    }

    fn text_turn(text: &str) -> ModelTurn {
        ModelTurn {
            text: Some(text.to_string()),
            tool_calls: Vec::new(),
        }
    }

    fn tool_turn(calls: Vec<(&str, &str, &str)>) -> ModelTurn {
        ModelTurn {
            text: None,
            tool_calls: calls
                .into_iter()
                .map(|(id, name, args)| ChatCompletionMessageToolCall {
                    id: id.to_string(),
                    r#type: ChatCompletionToolType::Function,
                    function: FunctionCall {
                        name: name.to_string(),
                        arguments: args.to_string(),
                    },
                })
                .collect(),
        }
    }

    /// Counts executions and records one citation per call.
    struct CountingTool {
        executions: AtomicUsize,
    }

    impl CountingTool {
        fn new() -> Self {
            Self {
                executions: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Tool for CountingTool {
        fn name(&self) -> &'static str {
            "lookup"
        }

        fn definition(&self) -> ChatCompletionTool {
            ChatCompletionTool {
                r#type: ChatCompletionToolType::Function,
                function: FunctionObjectArgs::default()
                    .name("lookup")
                    .description("Test lookup")
                    .build()
                    .unwrap(),
            }
        }

        async fn execute(&self, args: &Value, sources: &mut SourceTracker) -> Result<String> {
            if args.get("fail").is_some() {
                return Err(PensumError::ToolArgument("missing 'query'".to_string()));
            }
            self.executions.fetch_add(1, Ordering::SeqCst);
            sources.record(vec![Citation::new("Test Course", Some(1), None)]);
            Ok("found it".to_string())
        }
    }

    fn registry_with(tool: Arc<CountingTool>) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(tool);
        registry
    }

    #[tokio::test]
    async fn test_plain_answer_skips_tools_and_tracker() {
        let model = Arc::new(ScriptedModel::new(vec![text_turn("Paris.")]));
        let tool = Arc::new(CountingTool::new());
        let registry = registry_with(tool.clone());
        let mut sources = SourceTracker::new();

        let generator = AnswerGenerator::new(model.clone());
        let answer = generator
            .generate("Capital of France?", None, &registry, &mut sources)
            .await
            .unwrap();

        assert_eq!(answer, "Paris.");
        assert_eq!(model.call_count(), 1);
        assert_eq!(tool.executions.load(Ordering::SeqCst), 0);
        assert!(sources.is_empty());
    }

    #[tokio::test]
    async fn test_single_tool_round_then_final_answer() {
        let model = Arc::new(ScriptedModel::new(vec![
            tool_turn(vec![("c1", "lookup", r#"{"query": "mcp"}"#)]),
            text_turn("MCP is covered in lesson 1."),
        ]));
        let tool = Arc::new(CountingTool::new());
        let registry = registry_with(tool.clone());
        let mut sources = SourceTracker::new();

        let generator = AnswerGenerator::new(model.clone());
        let answer = generator
            .generate("What is MCP?", None, &registry, &mut sources)
            .await
            .unwrap();

        assert_eq!(answer, "MCP is covered in lesson 1.");
        assert_eq!(model.call_count(), 2);
        assert_eq!(tool.executions.load(Ordering::SeqCst), 1);
        assert!(!sources.is_empty());
        // First call offers tools, the final one must not.
        assert_eq!(*model.tools_offered.lock().unwrap(), vec![true, false]);
    }

    #[tokio::test]
    async fn test_extra_parallel_calls_are_refused() {
        let model = Arc::new(ScriptedModel::new(vec![
            tool_turn(vec![
                ("c1", "lookup", r#"{"query": "a"}"#),
                ("c2", "lookup", r#"{"query": "b"}"#),
            ]),
            text_turn("done"),
        ]));
        let tool = Arc::new(CountingTool::new());
        let registry = registry_with(tool.clone());
        let mut sources = SourceTracker::new();

        let generator = AnswerGenerator::new(model.clone());
        generator
            .generate("Two things", None, &registry, &mut sources)
            .await
            .unwrap();

        assert_eq!(tool.executions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_fatal() {
        let model = Arc::new(ScriptedModel::new(vec![tool_turn(vec![(
            "c1",
            "nonexistent",
            "{}",
        )])]));
        let registry = registry_with(Arc::new(CountingTool::new()));
        let mut sources = SourceTracker::new();

        let generator = AnswerGenerator::new(model.clone());
        let err = generator
            .generate("Hi", None, &registry, &mut sources)
            .await
            .unwrap_err();

        assert!(matches!(err, PensumError::ToolDispatch(_)));
    }

    #[tokio::test]
    async fn test_bad_arguments_fed_back_as_text() {
        let model = Arc::new(ScriptedModel::new(vec![
            tool_turn(vec![("c1", "lookup", r#"{"fail": true}"#)]),
            text_turn("I could not search for that."),
        ]));
        let tool = Arc::new(CountingTool::new());
        let registry = registry_with(tool.clone());
        let mut sources = SourceTracker::new();

        let generator = AnswerGenerator::new(model.clone());
        let answer = generator
            .generate("Hi", None, &registry, &mut sources)
            .await
            .unwrap();

        // Recoverable failure still reaches the final call.
        assert_eq!(answer, "I could not search for that.");
        assert_eq!(model.call_count(), 2);
        assert_eq!(tool.executions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_history_lands_in_system_prompt() {
        let model = Arc::new(ScriptedModel::new(vec![text_turn("Yes.")]));
        let registry = registry_with(Arc::new(CountingTool::new()));
        let mut sources = SourceTracker::new();

        let generator = AnswerGenerator::new(model.clone());
        generator
            .generate(
                "And lesson two?",
                Some("User: What is MCP?\nAssistant: A protocol."),
                &registry,
                &mut sources,
            )
            .await
            .unwrap();

        let system = model.first_system.lock().unwrap().clone().unwrap();
        assert!(system.contains("Previous conversation:"));
        assert!(system.contains("User: What is MCP?"));
    }
}
