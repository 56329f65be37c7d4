//! PostgreSQL backend.
//!
//! Follows the repository patterns used elsewhere in the workspace:
//! - scoped connection acquisition per operation, released by RAII
//! - transactions only where one operation issues several statements
//! - JOINs for list counts (no N+1), bulk loads grouped in memory
//!
//! Stage payloads are stored as JSONB columns on the messages table.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use council_core::conversation::{
    AssistantMessage, Conversation, Message, RankingResult, StageResponse, UserMessage,
};

use crate::{ConversationStore, ConversationSummary, Result, StoreError};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an already-connected pool. The pool is built once at
    /// process start (see `pool::create_pool`) and injected here.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn message_from_row(row: &PgRow) -> Message {
    let role: String = row.get("role");
    let timestamp: Option<DateTime<Utc>> = row.get("timestamp");

    if role == "assistant" {
        Message::Assistant(AssistantMessage {
            stage1: row
                .get::<Option<Json<Vec<StageResponse>>>, _>("stage1")
                .map(|json| json.0)
                .unwrap_or_default(),
            stage2: row
                .get::<Option<Json<Vec<RankingResult>>>, _>("stage2")
                .map(|json| json.0)
                .unwrap_or_default(),
            stage3: row
                .get::<Option<Json<StageResponse>>, _>("stage3")
                .map(|json| json.0),
            timestamp,
        })
    } else {
        Message::User(UserMessage {
            content: row.get::<Option<String>, _>("content").unwrap_or_default(),
            timestamp,
        })
    }
}

#[async_trait::async_trait]
impl ConversationStore for PgStore {
    async fn create(&self, id: Uuid) -> Result<Conversation> {
        let conversation = Conversation::new(id);

        let mut conn = self.pool.acquire().await?;
        sqlx::query("INSERT INTO conversations (id, created_at, title) VALUES ($1, $2, $3)")
            .bind(conversation.id)
            .bind(conversation.created_at)
            .bind(&conversation.title)
            .execute(&mut *conn)
            .await?;

        Ok(conversation)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Conversation>> {
        let mut conn = self.pool.acquire().await?;

        let Some(row) = sqlx::query(
            "SELECT id, created_at, title, archived FROM conversations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        else {
            return Ok(None);
        };

        let message_rows = sqlx::query(
            r#"
            SELECT role, content, stage1, stage2, stage3, timestamp
            FROM messages
            WHERE conversation_id = $1
            ORDER BY timestamp ASC, seq ASC
            "#,
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(Some(Conversation {
            id: row.get("id"),
            created_at: row.get("created_at"),
            title: row.get("title"),
            archived: row.get("archived"),
            messages: message_rows.iter().map(message_from_row).collect(),
        }))
    }

    async fn save(&self, conversation: &Conversation) -> Result<()> {
        // Full overwrite of the message sequence. One transaction so
        // a failed rewrite cannot leave it half-written.
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO conversations (id, created_at, title, archived)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET title = EXCLUDED.title, archived = EXCLUDED.archived
            "#,
        )
        .bind(conversation.id)
        .bind(conversation.created_at)
        .bind(&conversation.title)
        .bind(conversation.archived)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM messages WHERE conversation_id = $1")
            .bind(conversation.id)
            .execute(&mut *tx)
            .await?;

        for message in &conversation.messages {
            let timestamp = message.timestamp().unwrap_or_else(Utc::now);
            match message {
                Message::User(user) => {
                    sqlx::query(
                        r#"
                        INSERT INTO messages (conversation_id, role, content, timestamp)
                        VALUES ($1, 'user', $2, $3)
                        "#,
                    )
                    .bind(conversation.id)
                    .bind(&user.content)
                    .bind(timestamp)
                    .execute(&mut *tx)
                    .await?;
                }
                Message::Assistant(turn) => {
                    sqlx::query(
                        r#"
                        INSERT INTO messages (conversation_id, role, stage1, stage2, stage3, timestamp)
                        VALUES ($1, 'assistant', $2, $3, $4, $5)
                        "#,
                    )
                    .bind(conversation.id)
                    .bind(Json(&turn.stage1))
                    .bind(Json(&turn.stage2))
                    .bind(turn.stage3.as_ref().map(Json))
                    .bind(timestamp)
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list(&self, include_archived: bool) -> Result<Vec<ConversationSummary>> {
        let mut conn = self.pool.acquire().await?;

        let rows = sqlx::query(
            r#"
            SELECT c.id, c.created_at, c.title, c.archived, COUNT(m.id) AS message_count
            FROM conversations c
            LEFT JOIN messages m ON m.conversation_id = c.id
            WHERE ($1 OR NOT c.archived)
            GROUP BY c.id, c.created_at, c.title, c.archived
            ORDER BY c.created_at DESC
            "#,
        )
        .bind(include_archived)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ConversationSummary {
                id: row.get("id"),
                created_at: row.get("created_at"),
                title: row.get("title"),
                message_count: row.get("message_count"),
                archived: row.get("archived"),
            })
            .collect())
    }

    async fn load_unarchived(&self) -> Result<Vec<Conversation>> {
        let mut conn = self.pool.acquire().await?;

        let conversation_rows = sqlx::query(
            r#"
            SELECT id, created_at, title, archived
            FROM conversations
            WHERE NOT archived
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;

        let message_rows = sqlx::query(
            r#"
            SELECT m.conversation_id, m.role, m.content, m.stage1, m.stage2, m.stage3, m.timestamp
            FROM messages m
            JOIN conversations c ON c.id = m.conversation_id
            WHERE NOT c.archived
            ORDER BY m.timestamp ASC, m.seq ASC
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<Message>> = HashMap::new();
        for row in &message_rows {
            grouped
                .entry(row.get("conversation_id"))
                .or_default()
                .push(message_from_row(row));
        }

        Ok(conversation_rows
            .into_iter()
            .map(|row| {
                let id: Uuid = row.get("id");
                Conversation {
                    id,
                    created_at: row.get("created_at"),
                    title: row.get("title"),
                    archived: row.get("archived"),
                    messages: grouped.remove(&id).unwrap_or_default(),
                }
            })
            .collect())
    }

    async fn append_user_message(&self, id: Uuid, content: &str) -> Result<()> {
        let mut conn = self.pool.acquire().await?;

        let exists: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM conversations WHERE id = $1)")
                .bind(id)
                .fetch_one(&mut *conn)
                .await?;
        if !exists.0 {
            return Err(StoreError::NotFound { id });
        }

        sqlx::query(
            "INSERT INTO messages (conversation_id, role, content, timestamp) VALUES ($1, 'user', $2, NOW())",
        )
        .bind(id)
        .bind(content)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    async fn append_assistant_message(
        &self,
        id: Uuid,
        stage1: Vec<StageResponse>,
        stage2: Vec<RankingResult>,
        stage3: Option<StageResponse>,
    ) -> Result<()> {
        let mut conn = self.pool.acquire().await?;

        let exists: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM conversations WHERE id = $1)")
                .bind(id)
                .fetch_one(&mut *conn)
                .await?;
        if !exists.0 {
            return Err(StoreError::NotFound { id });
        }

        sqlx::query(
            r#"
            INSERT INTO messages (conversation_id, role, stage1, stage2, stage3, timestamp)
            VALUES ($1, 'assistant', $2, $3, $4, NOW())
            "#,
        )
        .bind(id)
        .bind(Json(&stage1))
        .bind(Json(&stage2))
        .bind(stage3.as_ref().map(Json))
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    async fn set_title(&self, id: Uuid, title: &str) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        let result = sqlx::query("UPDATE conversations SET title = $1 WHERE id = $2")
            .bind(title)
            .bind(id)
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { id });
        }
        Ok(())
    }

    async fn set_archived(&self, id: Uuid, archived: bool) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        let result = sqlx::query("UPDATE conversations SET archived = $1 WHERE id = $2")
            .bind(archived)
            .bind(id)
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { id });
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        // Cascades to messages. Deleting an unknown id is a no-op.
        let mut conn = self.pool.acquire().await?;
        sqlx::query("DELETE FROM conversations WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{migrations, overall_scores, pool::create_pool};

    // Integration tests require a real database:
    // DATABASE_URL=postgres://... cargo test -p council-store -- --ignored

    async fn test_store() -> PgStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = create_pool(&url, 2).await.expect("pool creation failed");
        migrations::run(&pool).await.expect("migrations failed");
        PgStore::new(pool)
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn round_trip_preserves_message_order() {
        let store = test_store().await;
        let id = Uuid::new_v4();

        let mut conversation = store.create(id).await.expect("create failed");
        conversation.messages.push(Message::user("first"));
        conversation.messages.push(Message::assistant(
            vec![StageResponse {
                model: "model-a".into(),
                response: "answer".into(),
            }],
            vec![RankingResult {
                model: "judge-a".into(),
                ranking: Some("1. Response A".into()),
                parsed_ranking: vec!["Response A".into()],
            }],
            None,
        ));
        conversation.messages.push(Message::user("second"));
        store.save(&conversation).await.expect("save failed");

        let loaded = store.get(id).await.expect("get failed").expect("missing");
        assert_eq!(loaded.messages, conversation.messages);

        store.delete(id).await.expect("delete failed");
        assert!(store.get(id).await.expect("get failed").is_none());
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn archived_conversations_are_excluded_from_scores() {
        let store = test_store().await;
        let id = Uuid::new_v4();
        store.create(id).await.expect("create failed");
        store
            .append_assistant_message(
                id,
                Vec::new(),
                vec![RankingResult {
                    model: "judge-a".into(),
                    ranking: None,
                    parsed_ranking: vec!["m1".into()],
                }],
                None,
            )
            .await
            .expect("append failed");

        let before = overall_scores(&store).await.expect("scores failed");
        store.set_archived(id, true).await.expect("archive failed");
        let after = overall_scores(&store).await.expect("scores failed");
        assert!(
            after.total_conversations_analyzed < before.total_conversations_analyzed
                || before.total_conversations_analyzed == 0
        );

        store.delete(id).await.expect("delete failed");
    }
}
