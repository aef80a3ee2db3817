//! Error types for port operations.

/// Failures of a model call.
///
/// These never reach API callers: each use case catches them at its
/// boundary and substitutes a fallback value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LlmError {
    /// Transport, auth, quota or timeout failure from the model service.
    #[error("LLM call failed: {0}")]
    CallFailed(String),
    /// The service answered, but no JSON object could be recovered where one was required.
    #[error("Malformed response: no JSON object could be recovered")]
    MalformedResponse {
        /// Original response text, kept for diagnostics
        raw: String,
    },
}

impl LlmError {
    pub fn call_failed(message: impl ToString) -> Self {
        Self::CallFailed(message.to_string())
    }

    pub fn malformed(raw: impl Into<String>) -> Self {
        Self::MalformedResponse { raw: raw.into() }
    }

    pub fn is_call_failure(&self) -> bool {
        matches!(self, Self::CallFailed(_))
    }
}
