//! Shared fakes for integration tests: an in-memory `CompanionStore` and
//! scripted `GenerationClient` implementations.

#![allow(dead_code)]

use async_trait::async_trait;
use kindred::companion::{CompanionProfile, NewCompanion};
use kindred::error::{GenerationError, StoreError};
use kindred::generation::GenerationClient;
use kindred::reply::MessageRole;
use kindred::store::{
    CompanionStore, Conversation, ConversationSummary, StoredMessage, UserAccount,
};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: Vec<UserAccount>,
    /// (owner id, profile)
    companions: Vec<(String, CompanionProfile)>,
    conversations: Vec<Conversation>,
    messages: Vec<StoredMessage>,
    seq: u64,
}

impl Tables {
    // Monotonic synthetic timestamps keep recency ordering deterministic even
    // when many rows land within one wall-clock tick.
    fn next_timestamp(&mut self) -> String {
        self.seq += 1;
        format!("2026-01-01T00:00:00.{:09}+00:00", self.seq)
    }
}

/// Trait-level in-memory store fake.
pub struct MemoryCompanionStore {
    tables: Mutex<Tables>,
}

impl MemoryCompanionStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
        }
    }

    pub fn message_count(&self, conversation_id: &str) -> usize {
        self.tables
            .lock()
            .unwrap()
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .count()
    }

    pub fn companion_count(&self, owner_id: &str) -> usize {
        self.tables
            .lock()
            .unwrap()
            .companions
            .iter()
            .filter(|(owner, _)| owner == owner_id)
            .count()
    }

    pub fn last_message(&self, conversation_id: &str) -> Option<StoredMessage> {
        self.tables
            .lock()
            .unwrap()
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .next_back()
            .cloned()
    }
}

#[async_trait]
impl CompanionStore for MemoryCompanionStore {
    async fn upsert_user(
        &self,
        email: &str,
        display_name: Option<&str>,
    ) -> Result<UserAccount, StoreError> {
        let mut tables = self.tables.lock().unwrap();

        if let Some(user) = tables.users.iter_mut().find(|u| u.email == email) {
            if let Some(name) = display_name {
                user.display_name = Some(name.to_string());
            }
            return Ok(user.clone());
        }

        let created_at = tables.next_timestamp();
        let user = UserAccount {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            display_name: display_name.map(ToString::to_string),
            created_at,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: &str) -> Result<Option<UserAccount>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn create_companion(
        &self,
        owner_id: &str,
        new: NewCompanion,
    ) -> Result<CompanionProfile, StoreError> {
        let profile = CompanionProfile::create(new);
        let mut tables = self.tables.lock().unwrap();
        tables
            .companions
            .push((owner_id.to_string(), profile.clone()));
        Ok(profile)
    }

    async fn get_companion(
        &self,
        owner_id: &str,
        id: &str,
    ) -> Result<Option<CompanionProfile>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .companions
            .iter()
            .find(|(owner, profile)| owner == owner_id && profile.id == id)
            .map(|(_, profile)| profile.clone()))
    }

    async fn find_companion_by_name(
        &self,
        owner_id: &str,
        name: &str,
    ) -> Result<Option<CompanionProfile>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .companions
            .iter()
            .find(|(owner, profile)| owner == owner_id && profile.name.eq_ignore_ascii_case(name))
            .map(|(_, profile)| profile.clone()))
    }

    async fn list_companions(&self, owner_id: &str) -> Result<Vec<CompanionProfile>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .companions
            .iter()
            .rev()
            .filter(|(owner, _)| owner == owner_id)
            .map(|(_, profile)| profile.clone())
            .collect())
    }

    async fn create_conversation(
        &self,
        user_id: &str,
        companion_id: &str,
        title: &str,
    ) -> Result<Conversation, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        let timestamp = tables.next_timestamp();
        let conversation = Conversation {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            companion_id: companion_id.to_string(),
            title: title.to_string(),
            created_at: timestamp.clone(),
            updated_at: timestamp,
        };
        tables.conversations.push(conversation.clone());
        Ok(conversation)
    }

    async fn get_conversation(
        &self,
        user_id: &str,
        id: &str,
    ) -> Result<Option<Conversation>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .conversations
            .iter()
            .find(|c| c.id == id && c.user_id == user_id)
            .cloned())
    }

    async fn list_conversations(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationSummary>, StoreError> {
        let tables = self.tables.lock().unwrap();

        let mut conversations: Vec<&Conversation> = tables
            .conversations
            .iter()
            .filter(|c| c.user_id == user_id)
            .collect();
        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        Ok(conversations
            .into_iter()
            .take(limit)
            .map(|c| ConversationSummary {
                id: c.id.clone(),
                title: c.title.clone(),
                companion_id: c.companion_id.clone(),
                companion_name: tables
                    .companions
                    .iter()
                    .find(|(_, profile)| profile.id == c.companion_id)
                    .map(|(_, profile)| profile.name.clone())
                    .unwrap_or_default(),
                last_message: tables
                    .messages
                    .iter()
                    .filter(|m| m.conversation_id == c.id)
                    .next_back()
                    .map(|m| m.content.clone()),
                updated_at: c.updated_at.clone(),
            })
            .collect())
    }

    async fn append_message(
        &self,
        conversation_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<StoredMessage, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        let created_at = tables.next_timestamp();
        let message = StoredMessage {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            role,
            content: content.to_string(),
            created_at: created_at.clone(),
        };
        tables.messages.push(message.clone());

        if let Some(conversation) = tables
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
        {
            conversation.updated_at = created_at;
        }
        Ok(message)
    }

    async fn recent_messages(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        let tables = self.tables.lock().unwrap();

        let mut recent: Vec<StoredMessage> = tables
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .rev()
            .take(limit)
            .cloned()
            .collect();
        recent.reverse();
        Ok(recent)
    }

    async fn list_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect())
    }
}

/// Generation client that records every prompt and returns a fixed reply.
pub struct RecordingClient {
    pub prompts: Arc<Mutex<Vec<String>>>,
    reply: String,
}

impl RecordingClient {
    pub fn new(reply: &str) -> Self {
        Self {
            prompts: Arc::new(Mutex::new(Vec::new())),
            reply: reply.to_string(),
        }
    }
}

#[async_trait]
impl GenerationClient for RecordingClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

/// Generation client that always fails.
pub struct FailingClient;

#[async_trait]
impl GenerationClient for FailingClient {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        Err(GenerationError::Request("connection refused".into()))
    }
}
