//! Chat model abstraction used for answer generation, query reformulation,
//! suggested questions, and evaluation judging.

use crate::error::{Result, SvaraError};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat message passed to the model.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Stream of incremental answer text fragments.
pub type TokenStream = BoxStream<'static, Result<String>>;

/// Trait for chat completion backends.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run a completion and return the full response text.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Run a completion, streaming response text fragments as they arrive.
    async fn complete_stream(&self, messages: &[ChatMessage]) -> Result<TokenStream>;
}

/// OpenAI-backed chat model.
pub struct OpenAiChat {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAiChat {
    /// Create a new chat model handle.
    pub fn new(model: &str, temperature: f32) -> Self {
        Self {
            client: create_client(),
            model: model.to_string(),
            temperature,
        }
    }

    fn build_request(
        &self,
        messages: &[ChatMessage],
    ) -> Result<async_openai::types::CreateChatCompletionRequest> {
        let mut request_messages: Vec<ChatCompletionRequestMessage> =
            Vec::with_capacity(messages.len());

        for message in messages {
            let built = match message.role {
                Role::System => ChatCompletionRequestSystemMessageArgs::default()
                    .content(message.content.clone())
                    .build()
                    .map(ChatCompletionRequestMessage::from),
                Role::User => ChatCompletionRequestUserMessageArgs::default()
                    .content(message.content.clone())
                    .build()
                    .map(ChatCompletionRequestMessage::from),
                Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(message.content.clone())
                    .build()
                    .map(ChatCompletionRequestMessage::from),
            };
            request_messages.push(built.map_err(|e| SvaraError::Generation(e.to_string()))?);
        }

        CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(request_messages)
            .temperature(self.temperature)
            .build()
            .map_err(|e| SvaraError::Generation(e.to_string()))
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = self.build_request(messages)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| SvaraError::OpenAI(format!("Chat API error: {}", e)))?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| SvaraError::Generation("Empty response from model".to_string()))
    }

    async fn complete_stream(&self, messages: &[ChatMessage]) -> Result<TokenStream> {
        let request = self.build_request(messages)?;

        let stream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(|e| SvaraError::OpenAI(format!("Chat API error: {}", e)))?;

        let mapped = stream.map(|item| match item {
            Ok(response) => Ok(response
                .choices
                .first()
                .and_then(|c| c.delta.content.clone())
                .unwrap_or_default()),
            Err(e) => Err(SvaraError::OpenAI(format!("Chat stream error: {}", e))),
        });

        Ok(mapped.boxed())
    }
}
