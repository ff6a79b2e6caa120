//! Command implementations for EDX CLI.
//!
//! Provides subcommands for asking questions against the hosted
//! text-generation services, an interactive chat, and offline parsing and
//! extraction for checking queries and saved replies.

use clap::Subcommand;
use std::path::PathBuf;

pub mod ask;
pub mod chat;
pub mod config;
pub mod export;
pub mod turn;

use config::Settings;

#[derive(Subcommand)]
pub enum Command {
    /// Ask one question and print the report, charts and map summary
    Ask {
        query: String,

        /// Skip map generation
        #[arg(long)]
        no_map: bool,

        /// Also write the value table to this CSV file
        #[arg(long)]
        table_csv: Option<PathBuf>,
    },

    /// Interactive chat; :history lists chats, :new starts one, :quit exits
    Chat {
        /// Skip map generation
        #[arg(long)]
        no_map: bool,
    },

    /// Print the states, years and metrics a query asks for, as JSON
    Parse { query: String },

    /// Extract values from a saved reply and print the table and charts
    Extract {
        query: String,

        /// File holding the values service reply
        #[arg(short = 'r', long)]
        reply_file: PathBuf,

        /// Also write the value table to this CSV file
        #[arg(long)]
        table_csv: Option<PathBuf>,
    },
}

pub async fn run(command: Command, settings: Settings) -> anyhow::Result<()> {
    match command {
        Command::Ask {
            query,
            no_map,
            table_csv,
        } => ask::run_ask(&settings, &query, no_map, table_csv.as_deref()).await,
        Command::Chat { no_map } => {
            let collaborators = settings.collaborators(!no_map)?;
            chat::run_chat(&collaborators).await
        }
        Command::Parse { query } => ask::run_parse(&query),
        Command::Extract {
            query,
            reply_file,
            table_csv,
        } => ask::run_extract(&query, &reply_file, table_csv.as_deref()),
    }
}
