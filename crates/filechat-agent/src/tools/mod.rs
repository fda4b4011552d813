//! Tool definitions and dispatch for the Claude API
//!
//! This module defines the tools the model can call, their schemas, and the
//! [`ToolRegistry`] that turns a [`ToolInvocation`] into a [`ToolResult`].

mod files;
mod registry;
mod schema;

pub use files::{
    builtin_tools, edit_file_tool, list_files_tool, new_file_tool, read_file_tool,
    EditFileInput, ListFilesInput, NewFileInput, ReadFileInput,
};
pub use registry::{DispatchError, RegistryError, ToolContext, ToolDescriptor, ToolRegistry};

use filechat_core::FileIoError;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::PathBuf;
use thiserror::Error;

/// A tool summary as advertised to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Name of the tool
    pub name: String,
    /// Description of what the tool does
    pub description: String,
    /// JSON schema for the tool's input parameters
    pub input_schema: JsonValue,
}

/// Tool invocation request from the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Backend-assigned id, unique within its assistant turn
    pub id: String,
    /// Name of the tool to run
    pub tool_name: String,
    /// Input parameters for the tool
    pub arguments: JsonValue,
}

impl ToolInvocation {
    /// Create a new invocation
    pub fn new(id: impl Into<String>, tool_name: impl Into<String>, arguments: JsonValue) -> Self {
        Self {
            id: id.into(),
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

/// Result of executing a tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// ID of the invocation this is responding to
    pub invocation_id: String,
    /// Content of the result
    pub content: String,
    /// Whether the tool execution failed
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResult {
    /// Create a successful tool result
    pub fn success(invocation_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            invocation_id: invocation_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    /// Create an error tool result
    pub fn error(invocation_id: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            invocation_id: invocation_id.into(),
            content: error_message.into(),
            is_error: true,
        }
    }
}

/// What a tool handler returns on success
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// Plain text, passed through unchanged
    Text(String),
    /// Structured data, serialized to compact JSON
    Json(JsonValue),
}

impl ToolOutput {
    /// Render the output as result content
    pub fn into_content(self) -> Result<String, serde_json::Error> {
        match self {
            ToolOutput::Text(text) => Ok(text),
            ToolOutput::Json(value) => serde_json::to_string(&value),
        }
    }
}

impl From<String> for ToolOutput {
    fn from(text: String) -> Self {
        ToolOutput::Text(text)
    }
}

impl From<&str> for ToolOutput {
    fn from(text: &str) -> Self {
        ToolOutput::Text(text.to_string())
    }
}

impl From<JsonValue> for ToolOutput {
    fn from(value: JsonValue) -> Self {
        ToolOutput::Json(value)
    }
}

/// Errors raised by tool handlers
#[derive(Error, Debug)]
pub enum ToolError {
    /// The target path does not exist
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Arguments are well-formed but unusable
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The text to replace does not occur in the file
    #[error("old_str not found in file: {0}")]
    ContentNotFound(PathBuf),

    /// Other filesystem failure
    #[error(transparent)]
    FileIo(FileIoError),

    /// Output could not be serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The handler panicked
    #[error("tool panicked: {0}")]
    Panicked(String),
}

impl From<FileIoError> for ToolError {
    fn from(err: FileIoError) -> Self {
        match err {
            FileIoError::NotFound(path) => ToolError::NotFound(path),
            other => ToolError::FileIo(other),
        }
    }
}
