//! Conversation persistence for council runs.
//!
//! One `ConversationStore` contract with two interchangeable
//! backends: flat JSON documents on disk and PostgreSQL. Scoring
//! lives in council-core and operates on the conversation shape
//! alone, so neither backend carries its own copy.

pub mod config;
pub mod json;
pub mod migrations;
pub mod pool;
pub mod postgres;

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use council_core::conversation::{Conversation, RankingResult, StageResponse};
use council_core::scores::{compute_leaderboard, Leaderboard};

pub use config::{Backend, StoreConfig};
pub use json::JsonStore;
pub use postgres::PgStore;

/// Store error taxonomy. IO and database failures propagate to the
/// caller unrecovered; `NotFound` is reserved for mutating operations
/// addressing a conversation that does not exist.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error in {path:?}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("conversation '{id}' not found")]
    NotFound { id: Uuid },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Metadata-only projection returned by list operations.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub message_count: i64,
    pub archived: bool,
}

/// The storage contract shared by both backends.
///
/// Operations are synchronous-per-request: each call is one unit of
/// work against the store, with no cross-operation locking. A scan
/// running concurrently with writers sees whatever the store returns
/// at that moment.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Create an empty conversation under the given id.
    async fn create(&self, id: Uuid) -> Result<Conversation>;

    /// Load one conversation, or `None` if the id is unknown.
    async fn get(&self, id: Uuid) -> Result<Option<Conversation>>;

    /// Persist the full conversation, overwriting the stored message
    /// sequence.
    async fn save(&self, conversation: &Conversation) -> Result<()>;

    /// List conversation summaries, newest first. Archived
    /// conversations are omitted unless `include_archived` is set.
    async fn list(&self, include_archived: bool) -> Result<Vec<ConversationSummary>>;

    /// Load every non-archived conversation in full, for the scoring
    /// pass. Ordered oldest first.
    async fn load_unarchived(&self) -> Result<Vec<Conversation>>;

    /// Append a user turn.
    async fn append_user_message(&self, id: Uuid, content: &str) -> Result<()>;

    /// Append an assistant turn with its three stages.
    async fn append_assistant_message(
        &self,
        id: Uuid,
        stage1: Vec<StageResponse>,
        stage2: Vec<RankingResult>,
        stage3: Option<StageResponse>,
    ) -> Result<()>;

    /// Rename a conversation.
    async fn set_title(&self, id: Uuid, title: &str) -> Result<()>;

    /// Archive or restore a conversation.
    async fn set_archived(&self, id: Uuid, archived: bool) -> Result<()>;

    /// Delete a conversation permanently. Deleting an unknown id is
    /// not an error.
    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// Aggregate stage2 rankings across every non-archived conversation
/// into the global leaderboard. Purely a read: the snapshot is
/// whatever `load_unarchived` returns.
pub async fn overall_scores(store: &dyn ConversationStore) -> Result<Leaderboard> {
    let conversations = store.load_unarchived().await?;
    Ok(compute_leaderboard(&conversations))
}
