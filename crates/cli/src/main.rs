use clap::Parser;
use tracing_subscriber::EnvFilter;

use nd_cli::cli::{self, Cli, Command, ConfigCommand};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_cli_tracing(cli.log_json);

    let (config, config_path) = cli::load_config()?;

    match cli.command {
        // Default to chat when no subcommand is given.
        None | Some(Command::Chat) => cli::chat::chat(&config).await,
        Some(Command::Ask { message, json }) => cli::ask::ask(&config, &message, json).await,
        Some(Command::History) => cli::history::history(&config).await,
        Some(Command::Reset) => cli::reset(&config),
        Some(Command::Config(ConfigCommand::Show)) => cli::show_config(&config, &config_path),
    }
}

/// Tracing for CLI commands: warnings only unless `RUST_LOG` says
/// otherwise, always on stderr so stdout stays clean for answers.
fn init_cli_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}
