//! Utility functions for CLI commands.

use rtvoice_cli::config::{Config, Context, load_config};
use rtvoice_cli::load_request as load_file;
use rtvoice_openai_realtime::client::{ENV_API_KEY, ENV_BASE_URL};
use rtvoice_openai_realtime::Client;

use crate::Cli;

const APP_NAME: &str = "openai-realtime";

/// Gets the global configuration.
pub fn get_config(cli: &Cli) -> anyhow::Result<Config> {
    load_config(APP_NAME, cli.config.as_deref())
}

/// Gets the context to use: the one named with `-c`, else the current one.
///
/// Returns `None` when no context is selected, in which case the client is
/// configured from the environment.
pub fn get_context(cli: &Cli) -> anyhow::Result<Option<Context>> {
    let cfg = get_config(cli)?;
    Ok(cfg.resolve_context(cli.context.as_deref())?.cloned())
}

/// Loads a request from a YAML or JSON file.
pub fn load_request<T: serde::de::DeserializeOwned>(path: &str) -> anyhow::Result<T> {
    Ok(load_file(path)?)
}

/// Creates a client from the context, falling back to the environment.
///
/// `model` overrides the context's model when set.
pub fn create_client(ctx: Option<&Context>, model: Option<&str>) -> anyhow::Result<Client> {
    let (api_key, base_url) = match ctx {
        Some(ctx) if !ctx.api_key.is_empty() => (ctx.api_key.clone(), ctx.base_url.clone()),
        Some(ctx) => anyhow::bail!("no api_key in context '{}'", ctx.name),
        None => {
            let api_key = std::env::var(ENV_API_KEY).map_err(|_| {
                anyhow::anyhow!(
                    "no context selected and {} is not set. Use -c or 'openai-realtime config add-context'",
                    ENV_API_KEY
                )
            })?;
            (api_key, std::env::var(ENV_BASE_URL).unwrap_or_default())
        }
    };

    let mut builder = Client::builder(api_key).websocket_url(base_url);
    if let Some(ctx) = ctx {
        builder = builder
            .organization(&ctx.organization)
            .project(&ctx.project)
            .model(&ctx.model);
    }
    if let Some(model) = model {
        builder = builder.model(model);
    }

    Ok(builder.build()?)
}

/// Prints success message.
pub fn print_success(msg: &str) {
    eprintln!("\x1b[32m✓\x1b[0m {}", msg);
}

/// Prints error message.
pub fn print_error(msg: &str) {
    eprintln!("\x1b[31m✗\x1b[0m {}", msg);
}

/// Prints info message.
pub fn print_info(msg: &str) {
    eprintln!("\x1b[34mℹ\x1b[0m {}", msg);
}

/// Prints warning message.
pub fn print_warning(msg: &str) {
    eprintln!("\x1b[33m⚠\x1b[0m {}", msg);
}

/// Formats bytes to human readable string.
pub fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
