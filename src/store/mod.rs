//! Durable persistence for accounts, companions, conversations, and messages.
//!
//! The store is optional: when no database URL is configured the service runs
//! in transient "in-memory" mode and this module is simply not instantiated.

mod postgres;

pub use postgres::PgCompanionStore;

use crate::companion::{CompanionProfile, NewCompanion};
use crate::error::StoreError;
use crate::reply::MessageRole;
use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    #[serde(skip_serializing)]
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub user_id: String,
    pub companion_id: String,
    pub title: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Listing row for `GET /api/conversations`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub companion_id: String,
    pub companion_name: String,
    pub last_message: Option<String>,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    pub id: String,
    #[serde(skip_serializing)]
    pub conversation_id: String,
    pub role: MessageRole,
    pub content: String,
    pub created_at: String,
}

/// Async persistence contract consumed by the chat flow and route handlers.
///
/// All lookups are owner-scoped: a row that exists under a different owner is
/// indistinguishable from an absent row.
#[async_trait]
pub trait CompanionStore: Send + Sync {
    /// Upsert by unique (lowercased) email. A provided display name
    /// overwrites the stored one; an absent one leaves it untouched.
    async fn upsert_user(
        &self,
        email: &str,
        display_name: Option<&str>,
    ) -> Result<UserAccount, StoreError>;

    async fn get_user(&self, id: &str) -> Result<Option<UserAccount>, StoreError>;

    async fn create_companion(
        &self,
        owner_id: &str,
        new: NewCompanion,
    ) -> Result<CompanionProfile, StoreError>;

    async fn get_companion(
        &self,
        owner_id: &str,
        id: &str,
    ) -> Result<Option<CompanionProfile>, StoreError>;

    async fn find_companion_by_name(
        &self,
        owner_id: &str,
        name: &str,
    ) -> Result<Option<CompanionProfile>, StoreError>;

    /// Newest first.
    async fn list_companions(&self, owner_id: &str) -> Result<Vec<CompanionProfile>, StoreError>;

    async fn create_conversation(
        &self,
        user_id: &str,
        companion_id: &str,
        title: &str,
    ) -> Result<Conversation, StoreError>;

    async fn get_conversation(
        &self,
        user_id: &str,
        id: &str,
    ) -> Result<Option<Conversation>, StoreError>;

    /// Newest-updated first, bounded by `limit`.
    async fn list_conversations(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationSummary>, StoreError>;

    /// Append-only insert; also bumps the conversation's `updated_at`.
    async fn append_message(
        &self,
        conversation_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<StoredMessage, StoreError>;

    /// The `limit` most recent messages, queried by descending recency and
    /// returned in chronological order.
    async fn recent_messages(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, StoreError>;

    /// Full history, ascending.
    async fn list_messages(&self, conversation_id: &str)
    -> Result<Vec<StoredMessage>, StoreError>;
}

pub(crate) fn role_to_str(role: MessageRole) -> &'static str {
    role.as_str()
}

pub(crate) fn str_to_role(value: &str) -> Result<MessageRole, StoreError> {
    match value {
        "user" => Ok(MessageRole::User),
        "assistant" => Ok(MessageRole::Assistant),
        "system" => Ok(MessageRole::System),
        _ => Err(StoreError::Query(format!("unknown message role: {value}"))),
    }
}
