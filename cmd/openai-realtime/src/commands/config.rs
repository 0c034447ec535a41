//! Configuration management commands.

use clap::{Args, Subcommand};
use serde::Serialize;

use rtvoice_cli::config::{Config, Context as CliContext};
use rtvoice_cli::output::{Output, OutputFormat};

use super::{get_config, print_success};
use crate::Cli;

/// Manage CLI configuration.
///
/// Contexts allow you to manage multiple API configurations,
/// similar to kubectl's context management.
///
/// Configuration is stored in ~/.rtvoice/openai-realtime/config.yaml
#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// Add or replace a context
    #[command(name = "add-context")]
    AddContext(AddContextArgs),
    /// Delete a context
    #[command(name = "delete-context")]
    DeleteContext {
        /// Context name
        name: String,
    },
    /// Set the current context
    #[command(name = "use-context")]
    UseContext {
        /// Context name
        name: String,
    },
    /// Display the current context
    #[command(name = "get-context")]
    GetContext,
    /// List all contexts
    #[command(name = "get-contexts", alias = "list-contexts")]
    GetContexts,
    /// View the configuration with API keys masked
    View,
}

#[derive(Args)]
struct AddContextArgs {
    /// Context name
    name: String,
    /// OpenAI API key
    #[arg(long)]
    api_key: String,
    /// WebSocket URL (default: wss://api.openai.com/v1/realtime)
    #[arg(long)]
    base_url: Option<String>,
    /// Organization ID
    #[arg(long)]
    organization: Option<String>,
    /// Project ID
    #[arg(long)]
    project: Option<String>,
    /// Realtime model
    #[arg(long)]
    model: Option<String>,
    /// Default voice
    #[arg(long)]
    default_voice: Option<String>,
    /// Default instructions for chat sessions
    #[arg(long)]
    instructions: Option<String>,
}

impl AddContextArgs {
    fn to_context(&self) -> CliContext {
        let mut ctx = CliContext {
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone().unwrap_or_default(),
            organization: self.organization.clone().unwrap_or_default(),
            project: self.project.clone().unwrap_or_default(),
            model: self.model.clone().unwrap_or_default(),
            default_voice: self.default_voice.clone().unwrap_or_default(),
            ..Default::default()
        };
        if let Some(ref instructions) = self.instructions {
            ctx.set_extra("instructions", instructions);
        }
        ctx
    }
}

/// Masked snapshot printed by `config view`.
#[derive(Serialize)]
struct ConfigView<'a> {
    path: String,
    current_context: &'a str,
    contexts: Vec<CliContext>,
}

impl ConfigCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let mut cfg = get_config(cli)?;
        match &self.command {
            ConfigSubcommand::AddContext(args) => {
                cfg.add_context(&args.name, args.to_context())?;
                print_success(&format!("Context \"{}\" added", args.name));
            }
            ConfigSubcommand::DeleteContext { name } => {
                cfg.delete_context(name)?;
                print_success(&format!("Context \"{}\" deleted", name));
            }
            ConfigSubcommand::UseContext { name } => {
                cfg.use_context(name)?;
                print_success(&format!("Switched to context \"{}\"", name));
            }
            ConfigSubcommand::GetContext => match cfg.get_current_context() {
                Some(ctx) => println!("{}", ctx.name),
                None => println!("No current context set"),
            },
            ConfigSubcommand::GetContexts => print_contexts(&cfg),
            ConfigSubcommand::View => {
                let view = ConfigView {
                    path: cfg.path().display().to_string(),
                    current_context: &cfg.current_context,
                    contexts: cfg.contexts.values().map(CliContext::masked).collect(),
                };
                Output::new(OutputFormat::from_json_flag(cli.json), cli.output.clone())
                    .write(&view)?;
            }
        }
        Ok(())
    }
}

fn print_contexts(cfg: &Config) {
    if cfg.contexts.is_empty() {
        println!("No contexts configured");
        return;
    }

    println!("{:<8} {:<20} {:<32} {:<12}", "CURRENT", "NAME", "MODEL", "VOICE");
    for (name, ctx) in &cfg.contexts {
        let marker = if *name == cfg.current_context { "*" } else { "" };
        println!(
            "{:<8} {:<20} {:<32} {:<12}",
            marker,
            name,
            or_dash(&ctx.model),
            or_dash(&ctx.default_voice)
        );
    }
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() { "-" } else { s }
}
