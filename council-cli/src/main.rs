//! councilctl - conversation store operations and the model leaderboard
//!
//! Thin operational CLI over the conversation store:
//! - conversation CRUD (new, list, show, say, title, archive, delete)
//! - the cross-conversation model leaderboard (`scores`)
//!
//! The backend (JSON documents or Postgres) comes from
//! `~/.council/config.toml`, overridable via COUNCIL_BACKEND,
//! COUNCIL_DATA_DIR, and DATABASE_URL.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use council_store::StoreConfig;

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "councilctl",
    version,
    about = "Conversation store and model leaderboard for council runs"
)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new conversation and print its id
    New,
    /// List conversations, newest first
    List(commands::ListArgs),
    /// Show a conversation's turns
    Show(commands::IdArgs),
    /// Append a user message to a conversation
    Say(commands::SayArgs),
    /// Rename a conversation
    Title(commands::TitleArgs),
    /// Archive a conversation
    Archive(commands::IdArgs),
    /// Restore an archived conversation
    Unarchive(commands::IdArgs),
    /// Delete a conversation permanently
    Delete(commands::IdArgs),
    /// Show the cross-conversation model leaderboard
    Scores(commands::ScoresArgs),
}

fn init_tracing(debug: bool) -> Result<()> {
    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(debug)
        .compact()
        .try_init()
        .map_err(|err| anyhow::anyhow!(err))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug)?;

    let config = StoreConfig::load()?;
    let store = config.open_store().await?;
    let store = store.as_ref();

    match cli.command {
        Commands::New => commands::run_new(store).await,
        Commands::List(args) => commands::run_list(store, args).await,
        Commands::Show(args) => commands::run_show(store, args).await,
        Commands::Say(args) => commands::run_say(store, args).await,
        Commands::Title(args) => commands::run_title(store, args).await,
        Commands::Archive(args) => commands::run_set_archived(store, args, true).await,
        Commands::Unarchive(args) => commands::run_set_archived(store, args, false).await,
        Commands::Delete(args) => commands::run_delete(store, args).await,
        Commands::Scores(args) => commands::run_scores(store, args).await,
    }
}
