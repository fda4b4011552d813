//! The seam between the agent loop and the model service

use crate::conversation::{Conversation, Segment};
use crate::tools::ToolSpec;
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while talking to the model service.
/// Every variant is fatal to the session.
#[derive(Error, Debug)]
pub enum BackendError {
    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// API error response
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Invalid API key
    #[error("Invalid API key")]
    InvalidApiKey,

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Any other failure reported by a backend
    #[error("{0}")]
    Other(String),
}

/// Produces one assistant response for a conversation
#[async_trait]
pub trait MessageBackend: Send + Sync {
    /// Send the full conversation and the available tools, returning the
    /// assistant's segments in order. An empty response is valid.
    async fn send(
        &self,
        conversation: &Conversation,
        tools: &[ToolSpec],
    ) -> Result<Vec<Segment>, BackendError>;
}
