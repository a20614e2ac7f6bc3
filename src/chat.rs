//! Conversation-context selection and the persistent-mode chat flow.
//!
//! Once a durable conversation exists, persisted history overrides any
//! client-supplied message list: the context handed to the Reply Generator is
//! always the stored window, so clients cannot inject arbitrary history and
//! prompt growth stays bounded.

use crate::companion::{CompanionProfile, NewCompanion};
use crate::error::StoreError;
use crate::reply::{CONTEXT_WINDOW, Message, MessageRole, ReplyGenerator, ReplyResult};
use crate::store::{CompanionStore, Conversation, UserAccount};

/// Inputs to one persistent chat turn, already validated by the route layer
/// (`message` is trimmed and non-empty).
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub companion_id: Option<String>,
    pub companion_name: Option<String>,
    pub conversation_id: Option<String>,
    pub message: String,
}

/// Result of a persistent chat turn.
pub struct ChatOutcome {
    pub conversation: Conversation,
    pub reply: ReplyResult,
}

/// Stateless context selector: append the optional new message (trimmed,
/// non-empty) as a `user` entry to the client-supplied list.
pub fn effective_messages(mut messages: Vec<Message>, new_message: Option<&str>) -> Vec<Message> {
    if let Some(raw) = new_message {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            messages.push(Message::user(trimmed));
        }
    }
    messages
}

/// Run one chat turn against the durable store:
/// resolve companion and conversation, append the user's message, fetch the
/// bounded context window, generate a reply, and append it.
pub async fn run_persistent_turn(
    store: &dyn CompanionStore,
    generator: &ReplyGenerator,
    user: &UserAccount,
    turn: ChatTurn,
) -> Result<ChatOutcome, StoreError> {
    let companion = resolve_companion(store, &user.id, &turn).await?;
    let conversation = resolve_conversation(store, user, &companion, turn.conversation_id.as_deref()).await?;

    store
        .append_message(&conversation.id, MessageRole::User, &turn.message)
        .await?;

    let window: Vec<Message> = store
        .recent_messages(&conversation.id, CONTEXT_WINDOW)
        .await?
        .into_iter()
        .map(|m| Message {
            role: m.role,
            content: m.content,
        })
        .collect();

    let reply = generator.reply(&companion, &window).await;

    store
        .append_message(&conversation.id, MessageRole::Assistant, &reply.content)
        .await?;

    Ok(ChatOutcome {
        conversation,
        reply,
    })
}

/// Resolve the companion: by id, then by name, else create one from the
/// request-supplied name with creation defaults.
async fn resolve_companion(
    store: &dyn CompanionStore,
    owner_id: &str,
    turn: &ChatTurn,
) -> Result<CompanionProfile, StoreError> {
    if let Some(id) = turn.companion_id.as_deref() {
        if let Some(profile) = store.get_companion(owner_id, id).await? {
            return Ok(profile);
        }
    }

    if let Some(name) = turn.companion_name.as_deref() {
        if let Some(profile) = store.find_companion_by_name(owner_id, name).await? {
            return Ok(profile);
        }
    }

    let name = turn.companion_name.as_deref().unwrap_or("Your companion");
    store.create_companion(owner_id, NewCompanion::named(name)).await
}

/// Resolve the conversation. A supplied id that does not exist under the
/// current user, or that references a different companion, is treated as
/// absent — a fresh conversation is created instead of leaking state.
async fn resolve_conversation(
    store: &dyn CompanionStore,
    user: &UserAccount,
    companion: &CompanionProfile,
    conversation_id: Option<&str>,
) -> Result<Conversation, StoreError> {
    if let Some(id) = conversation_id {
        if let Some(conversation) = store.get_conversation(&user.id, id).await? {
            if conversation.companion_id == companion.id {
                return Ok(conversation);
            }
            tracing::warn!(
                conversation_id = id,
                "conversation references a different companion — starting a new one"
            );
        }
    }

    store
        .create_conversation(&user.id, &companion.id, &format!("Chat with {}", companion.name))
        .await
}
