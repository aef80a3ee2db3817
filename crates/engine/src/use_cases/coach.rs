//! Safety coach chat.

use std::sync::Arc;

use trailwise_domain::ChatMessage;

use crate::infrastructure::ports::{LlmError, LlmPort, LlmRequest};

/// Reply used when the model call fails.
pub const COACH_SIGNAL_LOST: &str = "Signal lost.";

pub struct ChatCoach {
    llm: Arc<dyn LlmPort>,
    model: String,
}

impl ChatCoach {
    pub fn new(llm: Arc<dyn LlmPort>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    /// Reply to the latest message in `conversation`.
    pub async fn reply(&self, conversation: &[ChatMessage], context: &str) -> String {
        match self.try_reply(conversation, context).await {
            Ok(text) if text.trim().is_empty() => "...".to_string(),
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, messages = conversation.len(), "Coach reply failed");
                COACH_SIGNAL_LOST.to_string()
            }
        }
    }

    async fn try_reply(&self, conversation: &[ChatMessage], context: &str) -> Result<String, LlmError> {
        let transcript = conversation
            .iter()
            .map(|m| format!("{}: {}", m.role.as_str(), m.text))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            "Role: Expert Outdoor Safety Instructor.\nContext: {}\nChat:\n{}\n\nReply briefly and helpfully.",
            context, transcript
        );

        let response = self
            .llm
            .generate(LlmRequest::new(self.model.clone(), prompt))
            .await?;
        Ok(response.content)
    }
}
