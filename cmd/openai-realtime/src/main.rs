//! OpenAI Realtime CLI - A command line interface for OpenAI Realtime voice sessions.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{ChatCommand, ConfigCommand};

/// OpenAI Realtime CLI - A command line interface for OpenAI Realtime voice sessions.
///
/// This tool connects to the OpenAI Realtime API, sends text prompts or PCM16
/// audio and prints the assistant's transcript while saving its audio.
///
/// Configuration is stored in ~/.rtvoice/openai-realtime/ and supports multiple
/// contexts, similar to kubectl's context management.
#[derive(Parser)]
#[command(name = "openai-realtime")]
#[command(about = "OpenAI Realtime API CLI tool")]
#[command(version)]
pub struct Cli {
    /// Config file (default is ~/.rtvoice/openai-realtime/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Context name to use
    #[arg(short = 'c', long, global = true)]
    pub context: Option<String>,

    /// Output file (default: stdout)
    #[arg(short = 'o', long, global = true)]
    pub output: Option<String>,

    /// Input request file (YAML or JSON)
    #[arg(short = 'f', long = "file", global = true)]
    pub input: Option<String>,

    /// Output as JSON (for piping)
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage CLI configuration
    Config(ConfigCommand),
    /// Run one realtime conversation turn
    Chat(ChatCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Errs only when a provider is already installed.
    let _ = rustls::crypto::ring::default_provider().install_default();

    match &cli.command {
        Commands::Config(cmd) => cmd.run(&cli).await,
        Commands::Chat(cmd) => cmd.run(&cli).await,
    }
}
