//! CLI interface for confpilot.

pub mod handlers;
pub mod output;

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

use output::OutputMode;

/// confpilot - change editor settings and run commands by asking in plain language
#[derive(Parser)]
#[command(name = "confpilot", version, about, long_about = None)]
pub struct Cli {
    /// Override data directory (default: ~/.confpilot)
    #[arg(long, env = "CONFPILOT_DATA_PATH", global = true)]
    pub data_path: Option<PathBuf>,

    /// Output as JSON instead of human-readable format
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search settings and commands by keywords
    #[command(alias = "find")]
    Search {
        /// Keywords, or an exact setting/command key
        #[arg(required = true, num_args = 1..)]
        keywords: Vec<String>,
        /// Maximum results
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Show a single setting or command
    Lookup {
        /// Exact setting or command key
        key: String,
    },

    /// Print the tool manifest offered to the model
    Manifest,

    /// Ask the assistant to change settings or run a command
    Chat {
        /// The request, e.g. "switch to a light theme"
        request: String,
        /// Approve confirmation prompts automatically
        #[arg(long, short = 'y')]
        yes: bool,
        /// Do not offer undo after the turn
        #[arg(long)]
        no_undo: bool,
        /// Ignore and clear the stored conversation first
        #[arg(long)]
        fresh: bool,
    },

    /// Restore settings to their values before the last chat turn
    Undo,

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, elvish, powershell)
        shell: clap_complete::Shell,
    },
}

pub fn print_completions(shell: clap_complete::Shell) {
    clap_complete::generate(
        shell,
        &mut Cli::command(),
        "confpilot",
        &mut std::io::stdout(),
    );
}

pub async fn execute(
    command: &Commands,
    ctx: &crate::init::AppContext,
    mode: OutputMode,
) -> anyhow::Result<()> {
    match command {
        Commands::Search { keywords, limit } => {
            handlers::catalog::handle_search(ctx, &keywords.join(" "), *limit, mode).await?
        }
        Commands::Lookup { key } => handlers::catalog::handle_lookup(ctx, key, mode).await?,
        Commands::Manifest => handlers::catalog::handle_manifest(ctx)?,
        Commands::Chat {
            request,
            yes,
            no_undo,
            fresh,
        } => {
            let options = handlers::chat::ChatOptions {
                auto_approve: *yes,
                offer_undo: !*no_undo,
                fresh: *fresh,
            };
            handlers::chat::handle_chat(ctx, request, options, mode).await?
        }
        Commands::Undo => handlers::chat::handle_undo(ctx, mode).await?,
        Commands::Completions { shell } => print_completions(*shell),
    }
    Ok(())
}
