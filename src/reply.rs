//! The Reply Generator: produce exactly one assistant reply for a companion
//! and a bounded message window. Never raises an error to its caller — when
//! the external generation path is unavailable or fails, it degrades to a
//! deterministic template reply.

use crate::companion::CompanionProfile;
use crate::config::GenerationConfig;
use crate::generation::{self, GenerationClient};
use crate::prompt::CompanionPromptBuilder;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Model label reported for template replies.
pub const FALLBACK_MODEL: &str = "fallback-template";

/// Maximum number of prior messages considered when generating a reply.
pub const CONTEXT_WINDOW: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }

    pub fn is_system(self) -> bool {
        matches!(self, Self::System)
    }
}

/// A role-tagged conversation entry. Append-only wherever it is held.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// One generated assistant reply and the generation path that produced it.
/// Ephemeral; persisted only by being appended as an assistant [`Message`].
#[derive(Debug, Clone, Serialize)]
pub struct ReplyResult {
    pub content: String,
    pub model: String,
}

/// Produces companion replies, preferring the external generation call and
/// silently degrading to the template fallback.
pub struct ReplyGenerator {
    client: Option<Arc<dyn GenerationClient>>,
    model: String,
    prompts: CompanionPromptBuilder,
}

impl ReplyGenerator {
    pub fn new(
        client: Option<Arc<dyn GenerationClient>>,
        model: impl Into<String>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            client,
            model: model.into(),
            prompts: CompanionPromptBuilder::new()?,
        })
    }

    pub fn from_config(config: &GenerationConfig) -> anyhow::Result<Self> {
        Self::new(
            generation::create_generation_client(config),
            config.model.clone(),
        )
    }

    /// Generate one assistant reply. Infallible from the caller's view: every
    /// failure of the external path resolves to the fallback template.
    pub async fn reply(&self, companion: &CompanionProfile, messages: &[Message]) -> ReplyResult {
        let Some(client) = &self.client else {
            return fallback_reply(companion, messages);
        };

        let prompt = match self.prompts.render(companion, messages) {
            Ok(prompt) => prompt,
            Err(error) => {
                tracing::warn!(%error, "prompt render failed — using fallback reply");
                return fallback_reply(companion, messages);
            }
        };

        match client.generate(&prompt).await {
            Ok(text) => {
                let content = text.trim();
                if content.is_empty() {
                    tracing::warn!("generation returned empty text — using fallback reply");
                    return fallback_reply(companion, messages);
                }
                ReplyResult {
                    content: content.to_string(),
                    model: self.model.clone(),
                }
            }
            Err(error) => {
                tracing::warn!(%error, "generation failed — using fallback reply");
                fallback_reply(companion, messages)
            }
        }
    }
}

/// Deterministic template reply.
///
/// Quotes the most recent user-role message in the window (reverse scan).
/// When there is none, or its content is empty, the quoted clause is omitted
/// entirely rather than rendered as empty quotes.
pub fn fallback_reply(companion: &CompanionProfile, messages: &[Message]) -> ReplyResult {
    let quoted = messages
        .iter()
        .rev()
        .find(|m| m.role == MessageRole::User)
        .filter(|m| !m.content.is_empty())
        .map(|m| format!("You said: \"{}\". ", m.content))
        .unwrap_or_default();

    ReplyResult {
        content: format!(
            "{}: I hear you. {quoted}Let's unpack this one step at a time.",
            companion.name
        ),
        model: FALLBACK_MODEL.to_string(),
    }
}
