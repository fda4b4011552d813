//! filechat agent - the conversation loop behind the filechat CLI
//!
//! This crate provides:
//! - Conversation history with tool-result correlation
//! - A tool registry with schema-checked dispatch and the built-in file tools
//! - The Anthropic Messages API client
//! - The agent loop state machine

pub mod agent;
pub mod backend;
pub mod client;
pub mod conversation;
pub mod tools;

pub use agent::{AgentError, AgentLoop, AgentOutput, LoopState, UserInput};
pub use backend::{BackendError, MessageBackend};
pub use client::AnthropicClient;
pub use conversation::{Conversation, ConversationError, Role, Segment, Turn};
pub use tools::{
    DispatchError, RegistryError, ToolContext, ToolDescriptor, ToolError, ToolInvocation,
    ToolOutput, ToolRegistry, ToolResult, ToolSpec,
};
