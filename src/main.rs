mod cli;
mod server;
mod tools;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dotspark::config::DotsparkConfig;

#[derive(Parser)]
#[command(
    name = "dotspark",
    version,
    about = "Thought classification, hybrid retrieval and conversational context over MCP"
)]
struct Cli {
    /// Path to a config file (defaults to ~/.dotspark/config.toml)
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server on the configured transport (stdio or http)
    Serve,
    /// Classify a thought as a dot, wheel or chakra without storing it
    Classify {
        text: String,
    },
    /// Search a user's stored material
    Search {
        query: String,
        #[arg(long, default_value = "local")]
        user: String,
    },
    /// Classify and store a thought
    Add {
        text: String,
        #[arg(long, default_value = "local")]
        user: String,
    },
    /// Check the database and provider configuration
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => DotsparkConfig::load_from(path)?,
        None => DotsparkConfig::load()?,
    };

    // Log to stderr so stdout stays clean for MCP JSON-RPC.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => server::serve(config).await?,
        Command::Classify { text } => cli::classify::classify(&config, &text).await?,
        Command::Search { query, user } => cli::search::search(&config, &query, &user).await?,
        Command::Add { text, user } => cli::add::add(&config, &text, &user).await?,
        Command::Doctor => cli::doctor::doctor(&config)?,
    }

    Ok(())
}
