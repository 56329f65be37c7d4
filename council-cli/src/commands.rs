use anyhow::{Context, Result};
use clap::Args;
use uuid::Uuid;

use council_core::conversation::Message;
use council_store::{overall_scores, ConversationStore};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Include archived conversations
    #[arg(long)]
    pub all: bool,
}

#[derive(Args, Debug)]
pub struct IdArgs {
    /// Conversation id
    pub id: Uuid,
}

#[derive(Args, Debug)]
pub struct SayArgs {
    /// Conversation id
    pub id: Uuid,
    /// Message content
    pub content: String,
}

#[derive(Args, Debug)]
pub struct TitleArgs {
    /// Conversation id
    pub id: Uuid,
    /// New title
    pub title: String,
}

#[derive(Args, Debug)]
pub struct ScoresArgs {
    /// Emit the leaderboard as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

pub async fn run_new(store: &dyn ConversationStore) -> Result<()> {
    let conversation = store
        .create(Uuid::new_v4())
        .await
        .context("failed to create conversation")?;
    println!("{}", conversation.id);
    Ok(())
}

pub async fn run_list(store: &dyn ConversationStore, args: ListArgs) -> Result<()> {
    let summaries = store
        .list(args.all)
        .await
        .context("failed to list conversations")?;

    if summaries.is_empty() {
        println!("No conversations.");
        return Ok(());
    }

    for summary in summaries {
        let marker = if summary.archived { " (archived)" } else { "" };
        println!(
            "{}  {}  {:>3} msgs  {}{}",
            summary.id,
            summary.created_at.format("%Y-%m-%d %H:%M"),
            summary.message_count,
            summary.title,
            marker,
        );
    }
    Ok(())
}

pub async fn run_show(store: &dyn ConversationStore, args: IdArgs) -> Result<()> {
    let conversation = store
        .get(args.id)
        .await
        .context("failed to load conversation")?
        .with_context(|| format!("conversation '{}' not found", args.id))?;

    println!("{} ({})", conversation.title, conversation.id);
    println!("created {}", conversation.created_at.format("%Y-%m-%d %H:%M"));
    if conversation.archived {
        println!("archived");
    }
    println!();

    for message in &conversation.messages {
        match message {
            Message::User(user) => {
                println!("user: {}", user.content);
            }
            Message::Assistant(turn) => {
                match &turn.stage3 {
                    Some(answer) => println!("assistant [{}]: {}", answer.model, answer.response),
                    None => println!("assistant: (no final answer)"),
                }
                for result in &turn.stage2 {
                    if !result.parsed_ranking.is_empty() {
                        println!(
                            "  ranked by {}: {}",
                            result.model,
                            result.parsed_ranking.join(" > ")
                        );
                    }
                }
            }
        }
        println!();
    }
    Ok(())
}

pub async fn run_say(store: &dyn ConversationStore, args: SayArgs) -> Result<()> {
    store
        .append_user_message(args.id, &args.content)
        .await
        .context("failed to append message")?;
    Ok(())
}

pub async fn run_title(store: &dyn ConversationStore, args: TitleArgs) -> Result<()> {
    store
        .set_title(args.id, &args.title)
        .await
        .context("failed to set title")?;
    Ok(())
}

pub async fn run_set_archived(
    store: &dyn ConversationStore,
    args: IdArgs,
    archived: bool,
) -> Result<()> {
    store
        .set_archived(args.id, archived)
        .await
        .context("failed to update archive flag")?;
    Ok(())
}

pub async fn run_delete(store: &dyn ConversationStore, args: IdArgs) -> Result<()> {
    store
        .delete(args.id)
        .await
        .context("failed to delete conversation")?;
    Ok(())
}

pub async fn run_scores(store: &dyn ConversationStore, args: ScoresArgs) -> Result<()> {
    let board = overall_scores(store)
        .await
        .context("failed to compute scores")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&board)?);
        return Ok(());
    }

    if board.entries.is_empty() {
        println!("No rankings yet.");
        return Ok(());
    }

    println!(
        "{:<4} {:<36} {:>7} {:>8} {:>8} {:>5} {:>5} {:>5} {:>9}",
        "#", "model", "points", "avg pts", "avg pos", "1st", "2nd", "3rd", "rankings"
    );
    for (rank, entry) in board.entries.iter().enumerate() {
        println!(
            "{:<4} {:<36} {:>7} {:>8.2} {:>8.2} {:>5} {:>5} {:>5} {:>9}",
            rank + 1,
            entry.model,
            entry.total_points,
            entry.average_points,
            entry.average_position,
            entry.first_places,
            entry.second_places,
            entry.third_places,
            entry.rankings_received,
        );
    }
    println!();
    println!(
        "{} conversations analyzed, {} rankings processed",
        board.total_conversations_analyzed, board.total_rankings_processed
    );
    Ok(())
}
