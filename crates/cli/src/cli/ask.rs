//! `newsdesk ask`: one-shot question.
//!
//! Streams the raw answer to stderr as it arrives, then prints the
//! rendered message with citation markers and sources to stdout.  With
//! `--json` nothing is streamed; the finished
//! [`RenderedMessage`](nd_chat::RenderedMessage) is printed as JSON.

use nd_chat::NoopSink;
use nd_domain::config::Config;

use crate::render::render_message;

pub async fn ask(config: &Config, message: &str, json_output: bool) -> anyhow::Result<()> {
    let service = super::build_service(config)?;

    if json_output {
        let rendered = service.send_message(message, &mut NoopSink).await?;
        println!("{}", serde_json::to_string_pretty(&rendered)?);
        return Ok(());
    }

    let mut preview = super::live_preview(config.display.color);
    let result = service.send_message(message, &mut preview).await;
    eprintln!();

    let rendered = result?;
    println!("{}", render_message(&rendered, &config.display));
    Ok(())
}
