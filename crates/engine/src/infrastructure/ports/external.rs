//! External service port traits (LLM).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::LlmError;

// =============================================================================
// LLM Types
// =============================================================================

/// Shape the model is asked to answer in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    /// Free text (prose, markdown, or JSON the caller recovers itself)
    #[default]
    Text,
    /// JSON constrained at the service
    Json,
}

/// A single-prompt generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmRequest {
    /// Model identifier, e.g. `gemini-2.5-flash`
    pub model: String,
    /// Full prompt text
    pub prompt: String,
    pub response_format: ResponseFormat,
    /// Allow the model to ground its answer with a map lookup
    pub map_grounding: bool,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Reasoning budget for models that think before answering
    pub thinking_budget: Option<u32>,
}

impl LlmRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            response_format: ResponseFormat::Text,
            map_grounding: false,
            max_tokens: None,
            thinking_budget: None,
        }
    }

    pub fn with_json_response(mut self) -> Self {
        self.response_format = ResponseFormat::Json;
        self
    }

    pub fn with_map_grounding(mut self) -> Self {
        self.map_grounding = true;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_thinking_budget(mut self, budget: u32) -> Self {
        self.thinking_budget = Some(budget);
        self
    }
}

/// Response from the LLM
#[derive(Debug, Clone, PartialEq)]
pub struct LlmResponse {
    /// The generated text content
    pub content: String,
    /// First map reference from grounding metadata, if the model used it
    pub map_uri: Option<String>,
    /// Finish reason
    pub finish_reason: FinishReason,
    /// Token usage
    pub usage: Option<TokenUsage>,
}

impl LlmResponse {
    /// Plain text response with no grounding or usage data.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            map_uri: None,
            finish_reason: FinishReason::Stop,
            usage: None,
        }
    }
}

/// Reason the generation finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    #[serde(other)]
    Unknown,
}

/// Token usage information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmPort: Send + Sync {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, LlmError>;
}
