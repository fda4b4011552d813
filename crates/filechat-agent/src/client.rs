//! Anthropic API client for Claude
//!
//! This module maps the agent's [`Turn`]s onto the Messages API wire format
//! and decodes response content blocks back into [`Segment`]s.

use crate::backend::{BackendError, MessageBackend};
use crate::conversation::{Conversation, Role, Segment, Turn};
use crate::tools::{ToolInvocation, ToolResult, ToolSpec};
use async_trait::async_trait;
use filechat_core::Config;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";

/// API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic API client
pub struct AnthropicClient {
    /// API key for authentication
    api_key: String,
    /// HTTP client
    client: reqwest::Client,
    /// API base URL
    base_url: String,
    /// Model to request
    model: String,
    /// Maximum tokens to generate per response
    max_tokens: usize,
}

/// Request to send to Claude
#[derive(Debug, Serialize)]
pub struct MessageRequest {
    /// Model to use
    pub model: String,
    /// Maximum tokens to generate
    pub max_tokens: usize,
    /// Messages in the conversation
    pub messages: Vec<ApiMessage>,
    /// System prompt (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Tools the model may call
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSpec>,
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiMessage {
    /// Role of the message sender
    pub role: Role,
    /// Content of the message
    pub content: ApiContent,
}

/// Content of a message - either simple text or structured content blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApiContent {
    /// Simple text content
    Text(String),
    /// Structured content blocks (for tool use/results)
    Blocks(Vec<ContentBlock>),
}

/// Content block in a request or response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default)]
        is_error: bool,
    },
    /// Block types this client does not understand
    #[serde(other)]
    Unknown,
}

/// Response from Claude
#[derive(Debug, Deserialize)]
pub struct MessageResponse {
    /// Generated content
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    /// Model used
    #[serde(default)]
    pub model: String,
    /// Stop reason
    pub stop_reason: Option<String>,
}

/// Error body returned by the API
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(rename = "type")]
    type_: String,
    message: String,
}

impl MessageRequest {
    /// Create a new message request with default settings
    pub fn new(model: impl Into<String>, messages: Vec<ApiMessage>) -> Self {
        Self {
            model: model.into(),
            max_tokens: 2048,
            messages,
            system: None,
            tools: Vec::new(),
        }
    }

    /// Create a request from a Conversation
    pub fn from_conversation(conversation: &Conversation, model: impl Into<String>) -> Self {
        let messages = conversation.turns().iter().map(ApiMessage::from_turn).collect();

        Self {
            system: conversation.system_prompt.clone(),
            ..Self::new(model, messages)
        }
    }

    /// Set the maximum tokens to generate
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the tools the model may call
    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }
}

impl ApiMessage {
    /// Create an ApiMessage from a conversation turn
    pub fn from_turn(turn: &Turn) -> Self {
        let content = match turn {
            Turn::User { text } => ApiContent::Text(text.clone()),
            Turn::Assistant { segments } => {
                ApiContent::Blocks(segments.iter().map(ContentBlock::from_segment).collect())
            }
            Turn::ToolResults { results } => {
                ApiContent::Blocks(results.iter().map(ContentBlock::from_tool_result).collect())
            }
        };

        Self {
            role: turn.role(),
            content,
        }
    }
}

impl ContentBlock {
    /// Encode an assistant segment
    pub fn from_segment(segment: &Segment) -> Self {
        match segment {
            Segment::Text { text } => ContentBlock::Text { text: text.clone() },
            Segment::ToolInvocation(invocation) => ContentBlock::ToolUse {
                id: invocation.id.clone(),
                name: invocation.tool_name.clone(),
                input: invocation.arguments.clone(),
            },
        }
    }

    /// Encode a tool result
    pub fn from_tool_result(result: &ToolResult) -> Self {
        ContentBlock::ToolResult {
            tool_use_id: result.invocation_id.clone(),
            content: result.content.clone(),
            is_error: result.is_error,
        }
    }

    /// Decode a response block. Blocks that cannot appear in an assistant
    /// turn yield `None`.
    pub fn into_segment(self) -> Option<Segment> {
        match self {
            ContentBlock::Text { text } => Some(Segment::Text { text }),
            ContentBlock::ToolUse { id, name, input } => {
                Some(Segment::ToolInvocation(ToolInvocation::new(id, name, input)))
            }
            ContentBlock::ToolResult { .. } => {
                tracing::warn!("Unexpected tool result in assistant response");
                None
            }
            ContentBlock::Unknown => {
                tracing::warn!("Skipping unsupported content block in assistant response");
                None
            }
        }
    }
}

impl MessageResponse {
    /// Decode the response content into segments, preserving order
    pub fn into_segments(self) -> Vec<Segment> {
        self.content.into_iter().filter_map(ContentBlock::into_segment).collect()
    }
}

impl AnthropicClient {
    /// Create a new Anthropic API client
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: Self::default_model().to_string(),
            max_tokens: 2048,
        }
    }

    /// Create a client from configuration
    pub fn from_config(config: &Config, api_key: String) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api.timeout_secs))
            .build()?;

        Ok(Self {
            api_key,
            client,
            base_url: config.api.base_url.trim_end_matches('/').to_string(),
            model: config.agent.model.clone(),
            max_tokens: config.agent.max_tokens,
        })
    }

    /// Point the client at a different API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Use a different model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// The model this client requests
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a message to Claude and get a response
    pub async fn send_message(&self, request: MessageRequest) -> Result<MessageResponse, BackendError> {
        let url = format!("{}/messages", self.base_url);

        tracing::debug!(
            "POST {} with {} messages and {} tools",
            url,
            request.messages.len(),
            request.tools.len()
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;

            return Err(match status.as_u16() {
                401 => BackendError::InvalidApiKey,
                429 => BackendError::RateLimited,
                code => BackendError::Api {
                    status: code,
                    message: describe_error(&error_text),
                },
            });
        }

        let body = response.text().await?;
        let message_response: MessageResponse = serde_json::from_str(&body)?;
        tracing::debug!(
            "Response from {} stopped with {:?}",
            message_response.model,
            message_response.stop_reason
        );
        Ok(message_response)
    }

    /// Get the model name
    pub fn default_model() -> &'static str {
        "claude-3-sonnet-20240229"
    }
}

fn describe_error(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => format!("{}: {}", envelope.error.type_, envelope.error.message),
        Err(_) => body.to_string(),
    }
}

#[async_trait]
impl MessageBackend for AnthropicClient {
    async fn send(
        &self,
        conversation: &Conversation,
        tools: &[ToolSpec],
    ) -> Result<Vec<Segment>, BackendError> {
        let request = MessageRequest::from_conversation(conversation, self.model.clone())
            .with_max_tokens(self.max_tokens)
            .with_tools(tools.to_vec());

        let response = self.send_message(request).await?;
        Ok(response.into_segments())
    }
}
