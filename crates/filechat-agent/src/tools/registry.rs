//! Tool registry and dispatch
//!
//! [`ToolRegistry::dispatch`] never fails: unknown tools, invalid arguments,
//! handler errors and handler panics all come back as error results the model
//! can read and react to.

use super::{schema, ToolError, ToolInvocation, ToolOutput, ToolResult, ToolSpec};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while building a registry
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// Two descriptors share a name
    #[error("Duplicate tool name: {0}")]
    DuplicateToolName(String),
}

/// Recoverable dispatch failures. Each one becomes an error [`ToolResult`].
#[derive(Error, Debug)]
pub enum DispatchError {
    /// No tool with this name is registered
    #[error("Error: Agent does not have a tool named '{0}'.")]
    UnknownTool(String),

    /// Arguments do not match the tool's input schema
    #[error("Invalid input for tool {tool}: {message}")]
    Validation { tool: String, message: String },

    /// The handler ran and failed
    #[error("Error executing tool {tool}: {source}")]
    Execution {
        tool: String,
        #[source]
        source: ToolError,
    },
}

/// Environment handed to every tool handler
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Directory relative paths are resolved against
    pub working_directory: PathBuf,
}

impl ToolContext {
    /// Create a context rooted at the process working directory
    pub fn new() -> Self {
        Self {
            working_directory: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Create a context rooted at a specific directory
    pub fn with_working_directory(working_directory: impl Into<PathBuf>) -> Self {
        Self {
            working_directory: working_directory.into(),
        }
    }

    /// Resolve a tool-supplied path against the working directory
    pub fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_directory.join(path)
        }
    }
}

impl Default for ToolContext {
    fn default() -> Self {
        Self::new()
    }
}

type Handler = Arc<dyn Fn(&ToolContext, JsonValue) -> Result<ToolOutput, HandlerFailure> + Send + Sync>;

enum HandlerFailure {
    Decode(serde_json::Error),
    Tool(ToolError),
}

/// A named tool: its advertised schema and the function that runs it
#[derive(Clone)]
pub struct ToolDescriptor {
    name: String,
    description: String,
    input_schema: JsonValue,
    handler: Handler,
}

impl ToolDescriptor {
    /// Create a descriptor whose handler takes a typed input.
    ///
    /// Arguments are checked against `input_schema` and then decoded into `I`;
    /// a failure at either step is reported as a validation error.
    pub fn new<I, O, F>(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: JsonValue,
        handler: F,
    ) -> Self
    where
        I: DeserializeOwned,
        O: Into<ToolOutput>,
        F: Fn(&ToolContext, I) -> Result<O, ToolError> + Send + Sync + 'static,
    {
        let handler: Handler = Arc::new(move |ctx: &ToolContext, arguments: JsonValue| {
            let input: I = serde_json::from_value(arguments).map_err(HandlerFailure::Decode)?;
            handler(ctx, input).map(Into::into).map_err(HandlerFailure::Tool)
        });

        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            handler,
        }
    }

    /// Name of the tool
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The summary advertised to the model
    pub fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }

    fn run(&self, ctx: &ToolContext, arguments: &JsonValue) -> Result<String, DispatchError> {
        schema::validate(&self.input_schema, arguments).map_err(|message| DispatchError::Validation {
            tool: self.name.clone(),
            message,
        })?;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (self.handler)(ctx, arguments.clone())));

        let output = match outcome {
            Ok(Ok(output)) => output,
            Ok(Err(HandlerFailure::Decode(e))) => {
                return Err(DispatchError::Validation {
                    tool: self.name.clone(),
                    message: e.to_string(),
                })
            }
            Ok(Err(HandlerFailure::Tool(e))) => return Err(self.execution_error(e)),
            Err(payload) => {
                return Err(self.execution_error(ToolError::Panicked(panic_message(&*payload))))
            }
        };

        output
            .into_content()
            .map_err(|e| self.execution_error(ToolError::Json(e)))
    }

    fn execution_error(&self, source: ToolError) -> DispatchError {
        DispatchError::Execution {
            tool: self.name.clone(),
            source,
        }
    }
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Owns the tool descriptors and dispatches invocations by name
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    /// Descriptors in registration order
    tools: Vec<ToolDescriptor>,
    /// Name to position in `tools`
    index: HashMap<String, usize>,
    /// Environment passed to handlers
    context: ToolContext,
}

impl ToolRegistry {
    /// Build a registry from descriptors, rejecting duplicate names
    pub fn new(descriptors: impl IntoIterator<Item = ToolDescriptor>) -> Result<Self, RegistryError> {
        let mut tools = Vec::new();
        let mut index = HashMap::new();

        for descriptor in descriptors {
            if index.contains_key(descriptor.name()) {
                return Err(RegistryError::DuplicateToolName(descriptor.name.clone()));
            }
            index.insert(descriptor.name.clone(), tools.len());
            tools.push(descriptor);
        }

        Ok(Self {
            tools,
            index,
            context: ToolContext::new(),
        })
    }

    /// Build a registry holding the built-in file tools
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::new(super::builtin_tools())
    }

    /// Resolve relative tool paths against `working_directory`
    pub fn with_working_directory(mut self, working_directory: impl Into<PathBuf>) -> Self {
        self.context = ToolContext::with_working_directory(working_directory);
        self
    }

    /// Summaries of every tool, in registration order
    pub fn describe_all(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(ToolDescriptor::spec).collect()
    }

    /// Tool names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(ToolDescriptor::name).collect()
    }

    /// Run an invocation, returning the content or the reason it failed
    pub fn try_dispatch(&self, invocation: &ToolInvocation) -> Result<String, DispatchError> {
        let descriptor = self
            .index
            .get(&invocation.tool_name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| DispatchError::UnknownTool(invocation.tool_name.clone()))?;

        descriptor.run(&self.context, &invocation.arguments)
    }

    /// Run an invocation and always produce a result for it
    pub fn dispatch(&self, invocation: &ToolInvocation) -> ToolResult {
        match self.try_dispatch(invocation) {
            Ok(content) => {
                tracing::info!("Tool {} ({}) succeeded", invocation.tool_name, invocation.id);
                ToolResult::success(invocation.id.clone(), content)
            }
            Err(e) => {
                tracing::warn!("Tool {} ({}) failed: {}", invocation.tool_name, invocation.id, e);
                ToolResult::error(invocation.id.clone(), e.to_string())
            }
        }
    }
}
