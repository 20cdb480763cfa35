//! CartSync CLI
//!
//! Command-line shopping list that works offline and syncs on demand.
//!
//! # Commands
//!
//! - `add` - Add an item to the list
//! - `list` - Show the list
//! - `edit` - Change an item's name, quantity or note
//! - `bought` - Mark an item as bought (or not)
//! - `remove` - Delete an item locally
//! - `sync` - Run one sync cycle against the server

mod commands;
mod file_store;
mod http_client;

use clap::{Parser, Subcommand};
use commands::list::OutputFormat;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Offline-first shopping list.
#[derive(Parser)]
#[command(name = "cartsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the local data file
    #[arg(global = true, short, long, default_value = "cartsync.json")]
    data: PathBuf,

    /// Base URL of the sync server
    #[arg(global = true, short, long)]
    server: Option<String>,

    /// Retries after a failed request
    #[arg(global = true, long, default_value = "3")]
    max_retries: u32,

    /// Delay before the first retry, in milliseconds
    #[arg(global = true, long, default_value = "1000")]
    base_delay_ms: u64,

    /// Per-request timeout, in seconds
    #[arg(global = true, long, default_value = "30")]
    timeout_secs: u64,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add an item to the list
    Add {
        /// Item name
        name: String,

        /// Quantity to buy
        #[arg(short, long, default_value = "1")]
        quantity: u32,

        /// Optional note
        #[arg(short, long)]
        note: Option<String>,
    },

    /// Show the list
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Change an item
    Edit {
        /// Item id or unique id prefix
        id: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New quantity
        #[arg(short, long)]
        quantity: Option<u32>,

        /// New note
        #[arg(short, long, conflicts_with = "clear_note")]
        note: Option<String>,

        /// Remove the note
        #[arg(long)]
        clear_note: bool,
    },

    /// Mark an item as bought
    Bought {
        /// Item id or unique id prefix
        id: String,

        /// Mark as not bought instead
        #[arg(short, long)]
        undo: bool,
    },

    /// Delete an item from this device
    Remove {
        /// Item id or unique id prefix
        id: String,
    },

    /// Sync with the server
    Sync,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Add {
            name,
            quantity,
            note,
        } => {
            commands::add::run(&cli.data, &name, quantity, note.as_deref())?;
        }
        Commands::List { format } => {
            commands::list::run(&cli.data, format)?;
        }
        Commands::Edit {
            id,
            name,
            quantity,
            note,
            clear_note,
        } => {
            let changes = commands::edit::Changes {
                name,
                quantity,
                note: if clear_note { Some(None) } else { note.map(Some) },
            };
            commands::edit::run(&cli.data, &id, changes)?;
        }
        Commands::Bought { id, undo } => {
            commands::bought::run(&cli.data, &id, !undo)?;
        }
        Commands::Remove { id } => {
            commands::remove::run(&cli.data, &id)?;
        }
        Commands::Sync => {
            let server = cli.server.ok_or("Server URL required for sync")?;
            let options = commands::sync::Options {
                server_url: server,
                max_retries: cli.max_retries,
                base_delay_ms: cli.base_delay_ms,
                timeout_secs: cli.timeout_secs,
            };
            commands::sync::run(&cli.data, options).await?;
        }
    }

    Ok(())
}
