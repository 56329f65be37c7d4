//! Flat-file backend: one JSON document per conversation.
//!
//! Documents live at `<data_dir>/<id>.json` and hold the full
//! conversation shape. The directory is created on demand. Files
//! that fail to parse are logged and skipped during scans rather
//! than failing the whole operation.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use uuid::Uuid;

use council_core::conversation::{Conversation, Message, RankingResult, StageResponse};

use crate::{ConversationStore, ConversationSummary, Result, StoreError};

pub struct JsonStore {
    data_dir: PathBuf,
}

impl JsonStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn conversation_path(&self, id: Uuid) -> PathBuf {
        self.data_dir.join(format!("{id}.json"))
    }

    async fn ensure_data_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir).await?;
        Ok(())
    }

    async fn read_document(&self, path: &Path) -> Result<Conversation> {
        let bytes = fs::read(path).await?;
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Json {
            path: path.to_owned(),
            source,
        })
    }

    async fn write_document(&self, conversation: &Conversation) -> Result<()> {
        self.ensure_data_dir().await?;
        let path = self.conversation_path(conversation.id);
        let body = serde_json::to_vec_pretty(conversation).map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, body).await?;
        Ok(())
    }

    async fn load_or_not_found(&self, id: Uuid) -> Result<Conversation> {
        self.get(id).await?.ok_or(StoreError::NotFound { id })
    }

    /// Read every parseable document in the data directory.
    async fn scan(&self) -> Result<Vec<Conversation>> {
        self.ensure_data_dir().await?;

        let mut conversations = Vec::new();
        let mut entries = fs::read_dir(&self.data_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map(|ext| ext == "json") != Some(true) {
                continue;
            }
            match self.read_document(&path).await {
                Ok(conversation) => conversations.push(conversation),
                Err(err) => {
                    tracing::warn!("skipping {}: {}", path.display(), err);
                }
            }
        }
        Ok(conversations)
    }
}

#[async_trait::async_trait]
impl ConversationStore for JsonStore {
    async fn create(&self, id: Uuid) -> Result<Conversation> {
        let conversation = Conversation::new(id);
        self.write_document(&conversation).await?;
        Ok(conversation)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Conversation>> {
        let path = self.conversation_path(id);
        match fs::read(&path).await {
            Ok(bytes) => {
                let conversation =
                    serde_json::from_slice(&bytes).map_err(|source| StoreError::Json {
                        path,
                        source,
                    })?;
                Ok(Some(conversation))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, conversation: &Conversation) -> Result<()> {
        self.write_document(conversation).await
    }

    async fn list(&self, include_archived: bool) -> Result<Vec<ConversationSummary>> {
        let mut summaries: Vec<ConversationSummary> = self
            .scan()
            .await?
            .into_iter()
            .filter(|c| include_archived || !c.archived)
            .map(|c| ConversationSummary {
                id: c.id,
                created_at: c.created_at,
                title: c.title,
                message_count: c.messages.len() as i64,
                archived: c.archived,
            })
            .collect();

        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }

    async fn load_unarchived(&self) -> Result<Vec<Conversation>> {
        let mut conversations: Vec<Conversation> = self
            .scan()
            .await?
            .into_iter()
            .filter(|c| !c.archived)
            .collect();

        conversations.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(conversations)
    }

    async fn append_user_message(&self, id: Uuid, content: &str) -> Result<()> {
        let mut conversation = self.load_or_not_found(id).await?;
        conversation.messages.push(Message::user(content));
        self.write_document(&conversation).await
    }

    async fn append_assistant_message(
        &self,
        id: Uuid,
        stage1: Vec<StageResponse>,
        stage2: Vec<RankingResult>,
        stage3: Option<StageResponse>,
    ) -> Result<()> {
        let mut conversation = self.load_or_not_found(id).await?;
        conversation
            .messages
            .push(Message::assistant(stage1, stage2, stage3));
        self.write_document(&conversation).await
    }

    async fn set_title(&self, id: Uuid, title: &str) -> Result<()> {
        let mut conversation = self.load_or_not_found(id).await?;
        conversation.title = title.to_owned();
        self.write_document(&conversation).await
    }

    async fn set_archived(&self, id: Uuid, archived: bool) -> Result<()> {
        let mut conversation = self.load_or_not_found(id).await?;
        conversation.archived = archived;
        self.write_document(&conversation).await
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        match fs::remove_file(self.conversation_path(id)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
