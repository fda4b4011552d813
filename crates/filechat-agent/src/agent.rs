//! The agent loop: turn-taking between the user, the model and the tools
//!
//! ```text
//! AwaitingUser --message--> AwaitingModel --segments--> ProcessingResponse
//!      ^                        ^                              |
//!      |                        +------- tool invocations -----+
//!      +------------------------------- text only -------------+
//! ```
//!
//! End of input, a backend failure or the optional tool-round limit moves the
//! loop to `Stopped`.

use crate::backend::{BackendError, MessageBackend};
use crate::conversation::{Conversation, ConversationError, Segment};
use crate::tools::{ToolRegistry, ToolResult, ToolSpec};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Errors that end an agent session
#[derive(Error, Debug)]
pub enum AgentError {
    /// The model service failed
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Reading user input failed
    #[error("Input error: {0}")]
    Input(#[from] std::io::Error),

    /// The model kept requesting tools past the configured limit
    #[error("Tool round limit of {0} reached without a final answer")]
    ToolRoundLimit(u32),

    /// A tool-result turn did not line up with its assistant turn
    #[error("Conversation error: {0}")]
    Conversation(#[from] ConversationError),
}

pub type Result<T> = std::result::Result<T, AgentError>;

/// Where user messages come from
#[async_trait]
pub trait UserInput: Send {
    /// Wait for the next message. `None` means the user is done.
    async fn next_message(&mut self) -> std::io::Result<Option<String>>;
}

/// Where the loop reports what happens
pub trait AgentOutput {
    /// Text produced by the model
    fn assistant_text(&mut self, text: &str);

    /// A tool invocation about to run
    fn tool_call(&mut self, tool_name: &str, arguments: &JsonValue);

    /// The result of a tool invocation
    fn tool_result(&mut self, _result: &ToolResult) {}

    /// A failure the user should know about
    fn diagnostic(&mut self, message: &str);
}

/// Position of the loop in its turn cycle
#[derive(Debug, Clone, PartialEq)]
pub enum LoopState {
    /// Waiting for the user to type something
    AwaitingUser,
    /// About to send the conversation to the model
    AwaitingModel,
    /// Holding a model response that has not been handled yet
    ProcessingResponse(Vec<Segment>),
    /// Terminal; the session is over
    Stopped,
}

impl LoopState {
    /// Whether the loop has finished
    pub fn is_stopped(&self) -> bool {
        matches!(self, LoopState::Stopped)
    }
}

/// Drives one chat session
pub struct AgentLoop<B, I, O> {
    backend: B,
    registry: ToolRegistry,
    input: I,
    output: O,
    conversation: Conversation,
    state: LoopState,
    /// Tool rounds since the last user message
    tool_rounds: u32,
    max_tool_rounds: Option<u32>,
    /// Cached so every request advertises identical tools
    tool_specs: Vec<ToolSpec>,
}

impl<B, I, O> AgentLoop<B, I, O>
where
    B: MessageBackend,
    I: UserInput,
    O: AgentOutput,
{
    /// Create a loop with an empty conversation
    pub fn new(backend: B, registry: ToolRegistry, input: I, output: O) -> Self {
        Self::with_conversation(backend, registry, input, output, Conversation::new())
    }

    /// Create a loop around a fresh conversation, e.g. one carrying a system prompt
    pub fn with_conversation(
        backend: B,
        registry: ToolRegistry,
        input: I,
        output: O,
        conversation: Conversation,
    ) -> Self {
        let tool_specs = registry.describe_all();
        Self {
            backend,
            registry,
            input,
            output,
            conversation,
            state: LoopState::AwaitingUser,
            tool_rounds: 0,
            max_tool_rounds: None,
            tool_specs,
        }
    }

    /// Stop the session once the model asks for tools in more than
    /// `max_tool_rounds` consecutive responses
    pub fn with_max_tool_rounds(mut self, max_tool_rounds: Option<u32>) -> Self {
        self.max_tool_rounds = max_tool_rounds;
        self
    }

    /// Current state
    pub fn state(&self) -> &LoopState {
        &self.state
    }

    /// The conversation so far
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// The output sink
    pub fn output(&self) -> &O {
        &self.output
    }

    /// Run until the session stops.
    ///
    /// Returns `Ok` on end of input and the fatal error otherwise; in both
    /// cases the loop is left in `Stopped`.
    pub async fn run(&mut self) -> Result<()> {
        while !self.state.is_stopped() {
            self.step().await?;
        }
        Ok(())
    }

    /// Perform one transition
    pub async fn step(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, LoopState::Stopped) {
            LoopState::AwaitingUser => self.await_user().await,
            LoopState::AwaitingModel => self.await_model().await,
            LoopState::ProcessingResponse(segments) => self.process_response(segments),
            LoopState::Stopped => Ok(()),
        }
    }

    async fn await_user(&mut self) -> Result<()> {
        let message = match self.input.next_message().await {
            Ok(message) => message,
            Err(e) => {
                self.output.diagnostic(&format!("Failed to read input: {}", e));
                return Err(e.into());
            }
        };

        match message {
            None => {
                tracing::debug!("End of input after {} turns", self.conversation.len());
            }
            // Blank lines are not sent; the API rejects empty user content
            Some(text) if text.trim().is_empty() => {
                self.state = LoopState::AwaitingUser;
            }
            Some(text) => {
                self.conversation.push_user(text);
                self.tool_rounds = 0;
                self.state = LoopState::AwaitingModel;
            }
        }
        Ok(())
    }

    async fn await_model(&mut self) -> Result<()> {
        tracing::debug!("Sending {} turns to the model", self.conversation.len());

        match self.backend.send(&self.conversation, &self.tool_specs).await {
            Ok(segments) => {
                self.state = LoopState::ProcessingResponse(segments);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Backend call failed: {}", e);
                self.output.diagnostic(&format!("API error: {}", e));
                Err(e.into())
            }
        }
    }

    fn process_response(&mut self, segments: Vec<Segment>) -> Result<()> {
        self.conversation.push_assistant(segments.clone());

        let over_limit = self
            .max_tool_rounds
            .filter(|&max| self.tool_rounds >= max);

        let mut results = Vec::new();
        for segment in &segments {
            match segment {
                Segment::Text { text } => self.output.assistant_text(text),
                Segment::ToolInvocation(invocation) => {
                    let result = match over_limit {
                        Some(max) => ToolResult::error(
                            invocation.id.clone(),
                            format!("Error: tool round limit of {} reached; tool was not run.", max),
                        ),
                        None => {
                            self.output.tool_call(&invocation.tool_name, &invocation.arguments);
                            self.registry.dispatch(invocation)
                        }
                    };
                    self.output.tool_result(&result);
                    results.push(result);
                }
            }
        }

        if results.is_empty() {
            self.state = LoopState::AwaitingUser;
            return Ok(());
        }

        self.conversation.push_tool_results(results)?;

        if let Some(max) = over_limit {
            tracing::warn!("Model requested tools after {} consecutive rounds", max);
            self.output.diagnostic(&format!(
                "Stopping: the model requested tools {} times in a row without answering.",
                max
            ));
            return Err(AgentError::ToolRoundLimit(max));
        }

        self.tool_rounds += 1;
        self.state = LoopState::AwaitingModel;
        Ok(())
    }
}
