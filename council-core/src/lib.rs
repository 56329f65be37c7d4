pub mod conversation;
pub mod scores;

pub use conversation::{
    AssistantMessage, Conversation, Message, RankingResult, StageResponse, UserMessage,
};
pub use scores::{compute_leaderboard, Leaderboard, ScoreEntry};
