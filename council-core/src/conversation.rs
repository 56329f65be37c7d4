use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Title given to conversations before the first turn names them.
pub const DEFAULT_TITLE: &str = "New Conversation";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub messages: Vec<Message>,
}

fn default_title() -> String {
    DEFAULT_TITLE.to_owned()
}

impl Conversation {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            title: DEFAULT_TITLE.to_owned(),
            archived: false,
            messages: Vec::new(),
        }
    }
}

/// One turn in a conversation, tagged by `role` in the persisted
/// document. User turns carry plain content; assistant turns carry
/// the three council stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    User(UserMessage),
    Assistant(AssistantMessage),
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Message::User(UserMessage {
            content: content.into(),
            timestamp: Some(Utc::now()),
        })
    }

    pub fn assistant(
        stage1: Vec<StageResponse>,
        stage2: Vec<RankingResult>,
        stage3: Option<StageResponse>,
    ) -> Self {
        Message::Assistant(AssistantMessage {
            stage1,
            stage2,
            stage3,
            timestamp: Some(Utc::now()),
        })
    }

    pub fn as_assistant(&self) -> Option<&AssistantMessage> {
        match self {
            Message::Assistant(turn) => Some(turn),
            Message::User(_) => None,
        }
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Message::User(m) => m.timestamp,
            Message::Assistant(m) => m.timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMessage {
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Assistant turn: stage1 holds each council member's candidate
/// answer, stage2 each judge's ranking of those candidates, stage3
/// the synthesized final answer. All stages are optional in the
/// persisted document; absent stages decode as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessage {
    #[serde(default)]
    pub stage1: Vec<StageResponse>,
    #[serde(default)]
    pub stage2: Vec<RankingResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage3: Option<StageResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// A single model's output: a stage1 candidate or the stage3 synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResponse {
    pub model: String,
    #[serde(default)]
    pub response: String,
}

/// One judge's stage2 verdict. `ranking` is the raw judge text,
/// `parsed_ranking` the extracted labels ordered best to worst.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingResult {
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranking: Option<String>,
    #[serde(default)]
    pub parsed_ranking: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_documents_are_role_tagged() {
        let msg = Message::User(UserMessage {
            content: "hello".into(),
            timestamp: None,
        });
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"role": "user", "content": "hello"}));
    }

    #[test]
    fn assistant_turn_decodes_without_stage_fields() {
        let msg: Message = serde_json::from_value(json!({"role": "assistant"})).unwrap();
        let turn = msg.as_assistant().unwrap();
        assert!(turn.stage1.is_empty());
        assert!(turn.stage2.is_empty());
        assert!(turn.stage3.is_none());
    }

    #[test]
    fn ranking_result_decodes_without_parsed_ranking() {
        let result: RankingResult =
            serde_json::from_value(json!({"model": "judge-a", "ranking": "gibberish"})).unwrap();
        assert_eq!(result.model, "judge-a");
        assert!(result.parsed_ranking.is_empty());
    }

    #[test]
    fn conversation_document_round_trips() {
        let mut conversation = Conversation::new(Uuid::new_v4());
        conversation.messages.push(Message::user("what is rust"));
        conversation.messages.push(Message::assistant(
            vec![StageResponse {
                model: "model-a".into(),
                response: "a language".into(),
            }],
            vec![RankingResult {
                model: "judge-a".into(),
                ranking: Some("1. Response A".into()),
                parsed_ranking: vec!["Response A".into()],
            }],
            Some(StageResponse {
                model: "chairman".into(),
                response: "Rust is a systems language".into(),
            }),
        ));

        let body = serde_json::to_string_pretty(&conversation).unwrap();
        let decoded: Conversation = serde_json::from_str(&body).unwrap();
        assert_eq!(decoded, conversation);
    }

    #[test]
    fn legacy_document_without_flags_decodes() {
        // Documents written before the archived flag existed carry
        // only id, created_at, title, and messages.
        let decoded: Conversation = serde_json::from_value(json!({
            "id": "7c9e6679-7425-40de-944b-e07fc1f90ae7",
            "created_at": "2025-11-02T10:00:00Z",
            "messages": [{"role": "user", "content": "hi"}]
        }))
        .unwrap();
        assert!(!decoded.archived);
        assert_eq!(decoded.title, DEFAULT_TITLE);
        assert_eq!(decoded.messages.len(), 1);
    }
}
