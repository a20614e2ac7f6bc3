use super::{
    CompanionStore, Conversation, ConversationSummary, StoredMessage, UserAccount, role_to_str,
    str_to_role,
};
use crate::companion::{CompanionProfile, NewCompanion};
use crate::error::StoreError;
use crate::reply::MessageRole;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use uuid::Uuid;

/// PostgreSQL-backed store using a sqlx async pool.
pub struct PgCompanionStore {
    pool: PgPool,
}

impl PgCompanionStore {
    /// Connect and run the idempotent schema setup.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(8)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Connect(e.to_string()))?;

        Self::new(pool).await
    }

    /// Create a store from an existing pool and ensure the schema exists.
    pub async fn new(pool: PgPool) -> Result<Self, StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS user_accounts (
                 id TEXT PRIMARY KEY,
                 email TEXT NOT NULL UNIQUE,
                 display_name TEXT,
                 created_at TEXT NOT NULL
             )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS companions (
                 id TEXT PRIMARY KEY,
                 owner_id TEXT NOT NULL REFERENCES user_accounts(id) ON DELETE CASCADE,
                 name TEXT NOT NULL,
                 archetype TEXT NOT NULL,
                 tone TEXT NOT NULL,
                 boundaries TEXT NOT NULL,
                 bio TEXT NOT NULL,
                 visibility TEXT NOT NULL,
                 created_at TEXT NOT NULL
             )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_companions_owner
                 ON companions(owner_id, name)",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS conversations (
                 id TEXT PRIMARY KEY,
                 user_id TEXT NOT NULL REFERENCES user_accounts(id) ON DELETE CASCADE,
                 companion_id TEXT NOT NULL REFERENCES companions(id) ON DELETE CASCADE,
                 title TEXT NOT NULL,
                 created_at TEXT NOT NULL,
                 updated_at TEXT NOT NULL
             )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_conversations_user
                 ON conversations(user_id, updated_at)",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS messages (
                 id TEXT PRIMARY KEY,
                 conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                 role TEXT NOT NULL,
                 content TEXT NOT NULL,
                 created_at TEXT NOT NULL
             )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_conversation
                 ON messages(conversation_id, created_at)",
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    /// Access the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn map_user_row(row: &PgRow) -> Result<UserAccount, StoreError> {
    Ok(UserAccount {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        display_name: row.try_get("display_name")?,
        created_at: row.try_get("created_at")?,
    })
}

fn map_companion_row(row: &PgRow) -> Result<CompanionProfile, StoreError> {
    let tone_raw: String = row.try_get("tone")?;
    let visibility_raw: String = row.try_get("visibility")?;
    let boundaries_raw: String = row.try_get("boundaries")?;

    Ok(CompanionProfile {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        archetype: row.try_get("archetype")?,
        tone: tone_raw
            .parse()
            .map_err(|_| StoreError::Query(format!("unknown tone: {tone_raw}")))?,
        boundaries: serde_json::from_str(&boundaries_raw)
            .map_err(|e| StoreError::Query(format!("decode boundaries: {e}")))?,
        bio: row.try_get("bio")?,
        visibility: visibility_raw
            .parse()
            .map_err(|_| StoreError::Query(format!("unknown visibility: {visibility_raw}")))?,
        created_at: row.try_get("created_at")?,
    })
}

fn map_conversation_row(row: &PgRow) -> Result<Conversation, StoreError> {
    Ok(Conversation {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        companion_id: row.try_get("companion_id")?,
        title: row.try_get("title")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn map_message_row(row: &PgRow) -> Result<StoredMessage, StoreError> {
    let role_raw: String = row.try_get("role")?;

    Ok(StoredMessage {
        id: row.try_get("id")?,
        conversation_id: row.try_get("conversation_id")?,
        role: str_to_role(&role_raw)?,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl CompanionStore for PgCompanionStore {
    async fn upsert_user(
        &self,
        email: &str,
        display_name: Option<&str>,
    ) -> Result<UserAccount, StoreError> {
        let user_id = Uuid::new_v4().to_string();
        let timestamp = Utc::now().to_rfc3339();

        let row = sqlx::query(
            "INSERT INTO user_accounts (id, email, display_name, created_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (email) DO UPDATE
                 SET display_name = COALESCE(EXCLUDED.display_name, user_accounts.display_name)
             RETURNING id, email, display_name, created_at",
        )
        .bind(&user_id)
        .bind(email)
        .bind(display_name)
        .bind(&timestamp)
        .fetch_one(&self.pool)
        .await?;

        map_user_row(&row)
    }

    async fn get_user(&self, id: &str) -> Result<Option<UserAccount>, StoreError> {
        let row = sqlx::query(
            "SELECT id, email, display_name, created_at
             FROM user_accounts
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_user_row).transpose()
    }

    async fn create_companion(
        &self,
        owner_id: &str,
        new: NewCompanion,
    ) -> Result<CompanionProfile, StoreError> {
        let profile = CompanionProfile::create(new);
        let boundaries = serde_json::to_string(&profile.boundaries)
            .map_err(|e| StoreError::Query(format!("encode boundaries: {e}")))?;

        sqlx::query(
            "INSERT INTO companions
                 (id, owner_id, name, archetype, tone, boundaries, bio, visibility, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(&profile.id)
        .bind(owner_id)
        .bind(&profile.name)
        .bind(&profile.archetype)
        .bind(profile.tone.to_string())
        .bind(&boundaries)
        .bind(&profile.bio)
        .bind(profile.visibility.to_string())
        .bind(&profile.created_at)
        .execute(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn get_companion(
        &self,
        owner_id: &str,
        id: &str,
    ) -> Result<Option<CompanionProfile>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, archetype, tone, boundaries, bio, visibility, created_at
             FROM companions
             WHERE owner_id = $1 AND id = $2",
        )
        .bind(owner_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_companion_row).transpose()
    }

    async fn find_companion_by_name(
        &self,
        owner_id: &str,
        name: &str,
    ) -> Result<Option<CompanionProfile>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, archetype, tone, boundaries, bio, visibility, created_at
             FROM companions
             WHERE owner_id = $1 AND LOWER(name) = LOWER($2)
             ORDER BY created_at ASC
             LIMIT 1",
        )
        .bind(owner_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_companion_row).transpose()
    }

    async fn list_companions(&self, owner_id: &str) -> Result<Vec<CompanionProfile>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, name, archetype, tone, boundaries, bio, visibility, created_at
             FROM companions
             WHERE owner_id = $1
             ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_companion_row).collect()
    }

    async fn create_conversation(
        &self,
        user_id: &str,
        companion_id: &str,
        title: &str,
    ) -> Result<Conversation, StoreError> {
        let conversation_id = Uuid::new_v4().to_string();
        let timestamp = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO conversations (id, user_id, companion_id, title, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $5)",
        )
        .bind(&conversation_id)
        .bind(user_id)
        .bind(companion_id)
        .bind(title)
        .bind(&timestamp)
        .execute(&self.pool)
        .await?;

        Ok(Conversation {
            id: conversation_id,
            user_id: user_id.to_string(),
            companion_id: companion_id.to_string(),
            title: title.to_string(),
            created_at: timestamp.clone(),
            updated_at: timestamp,
        })
    }

    async fn get_conversation(
        &self,
        user_id: &str,
        id: &str,
    ) -> Result<Option<Conversation>, StoreError> {
        let row = sqlx::query(
            "SELECT id, user_id, companion_id, title, created_at, updated_at
             FROM conversations
             WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_conversation_row).transpose()
    }

    async fn list_conversations(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationSummary>, StoreError> {
        #[allow(clippy::cast_possible_wrap)]
        let limit_i64 = limit as i64;

        let rows = sqlx::query(
            "SELECT c.id, c.title, c.updated_at,
                    p.id AS companion_id, p.name AS companion_name,
                    (SELECT m.content
                     FROM messages m
                     WHERE m.conversation_id = c.id
                     ORDER BY m.created_at DESC
                     LIMIT 1) AS last_message
             FROM conversations c
             JOIN companions p ON p.id = c.companion_id
             WHERE c.user_id = $1
             ORDER BY c.updated_at DESC
             LIMIT $2",
        )
        .bind(user_id)
        .bind(limit_i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(ConversationSummary {
                    id: row.try_get("id")?,
                    title: row.try_get("title")?,
                    companion_id: row.try_get("companion_id")?,
                    companion_name: row.try_get("companion_name")?,
                    last_message: row.try_get("last_message")?,
                    updated_at: row.try_get("updated_at")?,
                })
            })
            .collect()
    }

    async fn append_message(
        &self,
        conversation_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<StoredMessage, StoreError> {
        let message_id = Uuid::new_v4().to_string();
        let created_at = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO messages (id, conversation_id, role, content, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&message_id)
        .bind(conversation_id)
        .bind(role_to_str(role))
        .bind(content)
        .bind(&created_at)
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "UPDATE conversations
             SET updated_at = $1
             WHERE id = $2",
        )
        .bind(&created_at)
        .bind(conversation_id)
        .execute(&self.pool)
        .await?;

        Ok(StoredMessage {
            id: message_id,
            conversation_id: conversation_id.to_string(),
            role,
            content: content.to_string(),
            created_at,
        })
    }

    async fn recent_messages(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        #[allow(clippy::cast_possible_wrap)]
        let limit_i64 = limit as i64;

        let rows = sqlx::query(
            "SELECT id, conversation_id, role, content, created_at
             FROM messages
             WHERE conversation_id = $1
             ORDER BY created_at DESC
             LIMIT $2",
        )
        .bind(conversation_id)
        .bind(limit_i64)
        .fetch_all(&self.pool)
        .await?;

        let mut messages: Vec<StoredMessage> = rows
            .iter()
            .map(map_message_row)
            .collect::<Result<_, _>>()?;
        messages.reverse();
        Ok(messages)
    }

    async fn list_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, conversation_id, role, content, created_at
             FROM messages
             WHERE conversation_id = $1
             ORDER BY created_at ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_message_row).collect()
    }
}
