use crate::error::{PensumError, Result};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestMessage, ChatCompletionTool,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;

/// One model response: text, tool requests, or both.
pub struct ModelTurn {
    pub text: Option<String>,
    pub tool_calls: Vec<ChatCompletionMessageToolCall>,
}

impl ModelTurn {
    /// The turn's text, or an error when the model returned none.
    pub fn into_text(self) -> Result<String> {
        self.text
            .filter(|t| !t.is_empty())
            .ok_or_else(|| PensumError::Generation("Empty response from model".to_string()))
    }
}

/// Chat backend seam. The production implementation talks to OpenAI;
/// tests substitute a scripted one.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(
        &self,
        messages: Vec<ChatCompletionRequestMessage>,
        tools: Option<Vec<ChatCompletionTool>>,
    ) -> Result<ModelTurn>;
}

/// OpenAI chat completions backend.
pub struct OpenAIChatModel {
    client: Client<OpenAIConfig>,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAIChatModel {
    pub fn new(
        client: Client<OpenAIConfig>,
        model: impl Into<String>,
        max_tokens: u32,
        temperature: f32,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            max_tokens,
            temperature,
        }
    }
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    async fn complete(
        &self,
        messages: Vec<ChatCompletionRequestMessage>,
        tools: Option<Vec<ChatCompletionTool>>,
    ) -> Result<ModelTurn> {
        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.model)
            .messages(messages)
            .max_tokens(self.max_tokens)
            .temperature(self.temperature);
        if let Some(tools) = tools {
            builder.tools(tools);
        }

        let request = builder
            .build()
            .map_err(|e| PensumError::Generation(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| PensumError::Generation(format!("Chat request failed: {}", e)))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| PensumError::Generation("No response from model".to_string()))?;

        Ok(ModelTurn {
            text: choice.message.content,
            tool_calls: choice.message.tool_calls.unwrap_or_default(),
        })
    }
}
