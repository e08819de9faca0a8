pub mod ask;
pub mod chat;
pub mod history;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use nd_chat::ChatService;
use nd_client::RestChatClient;
use nd_domain::config::Config;
use nd_domain::stream::StreamEvent;
use nd_sessions::TokenStore;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "NEWSDESK_CONFIG";

/// newsdesk: chat with the news assistant from your terminal.
#[derive(Debug, Parser)]
#[command(name = "newsdesk", version, about)]
pub struct Cli {
    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactive chat (default when no subcommand is given).
    Chat,
    /// Ask a single question and print the answer.
    Ask {
        /// The question to send.
        message: String,
        /// Print the rendered answer as JSON instead of streaming text.
        #[arg(long)]
        json: bool,
    },
    /// Print the current session's conversation.
    History,
    /// Forget the stored session; the next command starts a new one.
    Reset,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Shared helpers ────────────────────────────────────────────────────

/// Load the configuration from `NEWSDESK_CONFIG` (or `newsdesk.toml` by
/// default).  Returns the parsed [`Config`] and the path that was used.
pub fn load_config() -> anyhow::Result<(Config, PathBuf)> {
    let path = PathBuf::from(
        std::env::var(CONFIG_ENV).unwrap_or_else(|_| "newsdesk.toml".into()),
    );
    let config = Config::load(&path).with_context(|| format!("loading {}", path.display()))?;
    Ok((config, path))
}

/// Open the persisted session token named by the config.
pub fn token_store(config: &Config) -> anyhow::Result<TokenStore> {
    TokenStore::open(&config.session.state_path, config.session.storage_key.clone())
        .with_context(|| {
            format!("opening session store in {}", config.session.state_path.display())
        })
}

/// Wire the REST client and token store into a [`ChatService`].
pub fn build_service(config: &Config) -> anyhow::Result<ChatService> {
    let client = RestChatClient::new(&config.backend).context("building backend client")?;
    tracing::debug!(base_url = client.base_url(), "chat backend configured");
    Ok(ChatService::new(Arc::new(client), token_store(config)?))
}

/// Delete the stored session token.
pub fn reset(config: &Config) -> anyhow::Result<()> {
    let store = token_store(config)?;
    match store.load()? {
        Some(old) => {
            store.clear()?;
            eprintln!("Session {old} forgotten. The next chat starts a new one.");
        }
        None => eprintln!("No session stored."),
    }
    Ok(())
}

/// Print the resolved config as TOML.
pub fn show_config(config: &Config, path: &std::path::Path) -> anyhow::Result<()> {
    eprintln!("# resolved from {}", path.display());
    print!("{}", config.to_toml()?);
    Ok(())
}

/// Sink that echoes answer chunks to stderr as they arrive.  The finished
/// answer is printed to stdout afterwards, re-rendered with citations.
pub fn live_preview(color: bool) -> impl FnMut(&StreamEvent) {
    move |event: &StreamEvent| {
        if let StreamEvent::MessageChunk { text, .. } = event {
            if color {
                eprint!("\x1B[2m{text}\x1B[0m");
            } else {
                eprint!("{text}");
            }
            std::io::stderr().flush().ok();
        }
    }
}
