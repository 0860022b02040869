use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lumen_core::config::{MarkupFormat, WidgetConfig};
use lumen_core::credential::passkey_digest;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod repl;
mod terminal_view;

#[derive(Parser)]
#[command(name = "lumen")]
#[command(about = "Lumen - passkey-gated knowledge chat", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Unlock the widget and chat about the loaded context
    Chat {
        /// Path to a TOML widget configuration
        #[arg(long)]
        config: Option<PathBuf>,

        /// Generation API key (falls back to GEMINI_API_KEY, then a prompt)
        #[arg(long)]
        api_key: Option<String>,

        /// Print replies as Markdown instead of converted HTML
        #[arg(long)]
        markdown: bool,
    },
    /// Print the SHA-256 digest of a passkey for `passkey_digest`
    Digest {
        text: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Chat {
            config,
            api_key,
            markdown,
        } => {
            let _log_guard = init_logging()?;
            let mut config = resolve_config(config.as_deref())?;
            if markdown {
                config.markup = MarkupFormat::Markdown;
            }
            let api_key = api_key.or_else(|| std::env::var("GEMINI_API_KEY").ok());
            repl::run_chat(config, api_key).await?;
        }
        Commands::Digest { text } => println!("{}", passkey_digest(&text)),
    }

    Ok(())
}

/// Sends log events to a daily file so they never interleave with the transcript.
fn init_logging() -> Result<WorkerGuard> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("lumen")
        .join("logs");
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&log_dir, "lumen.log"));

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("LUMEN_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();

    tracing::info!(log_dir = %log_dir.display(), "logging initialized");
    Ok(guard)
}

/// `--config`, else `<config_dir>/lumen/config.toml` when present, else defaults.
fn resolve_config(explicit: Option<&Path>) -> Result<WidgetConfig> {
    if let Some(path) = explicit {
        return WidgetConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()));
    }

    let default_path = dirs::config_dir().map(|dir| dir.join("lumen").join("config.toml"));
    match default_path {
        Some(path) if path.exists() => WidgetConfig::load(&path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        _ => Ok(WidgetConfig::default()),
    }
}
