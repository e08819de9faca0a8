//! `newsdesk history`: print the current conversation.

use nd_domain::config::Config;

use crate::render::render_message;

pub async fn history(config: &Config) -> anyhow::Result<()> {
    let service = super::build_service(config)?;
    if service.load_history().await?.is_none() {
        eprintln!("History is unavailable right now.");
        return Ok(());
    }

    let messages = service.rendered();
    if messages.is_empty() {
        eprintln!("No messages yet.");
    }
    for msg in &messages {
        println!("{}", render_message(msg, &config.display));
    }
    Ok(())
}
