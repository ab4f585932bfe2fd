//! confpilot - change editor settings and run commands by asking in plain language
//!
//! Usage:
//!   confpilot search "font size"          Search settings and commands
//!   confpilot lookup editor.fontSize      Show one setting or command
//!   confpilot chat "use a light theme"    Run one assistant turn
//!   confpilot manifest                    Print the tool manifest
//!   confpilot --help                      Show all commands

use anyhow::Result;
use clap::Parser;

use confpilot::cli::output::OutputMode;
use confpilot::cli::{Cli, Commands};
use confpilot::init::AppContext;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Tracing to stderr so streamed responses on stdout stay clean
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("confpilot=info".parse()?),
        )
        .init();

    let mode = OutputMode::from_json_flag(cli.json);

    match &cli.command {
        Commands::Completions { shell } => confpilot::cli::print_completions(*shell),
        cmd => {
            let ctx = AppContext::new(cli.data_path.clone())?;
            confpilot::cli::execute(cmd, &ctx, mode).await?;
        }
    }

    Ok(())
}
