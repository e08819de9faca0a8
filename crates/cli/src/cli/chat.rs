//! `newsdesk chat`: interactive REPL command.
//!
//! Opens a readline loop that sends each line to the assistant and
//! streams the answer back.  Slash commands cover session management.

use nd_chat::ChatService;
use nd_domain::config::Config;

use crate::render::render_message;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Public entry point
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Run the interactive chat REPL.
///
/// Loads the stored session's history first, then reads lines until
/// `/exit` or Ctrl+D.
pub async fn chat(config: &Config) -> anyhow::Result<()> {
    let service = super::build_service(config)?;

    // Session and history.  A backend that is down now may be up by the
    // time the first message is sent, so this is not fatal.
    if let Err(e) = service.init().await {
        eprintln!("\x1B[33mwarning: could not start a session: {e}\x1B[0m");
    }

    let history_path = config.session.state_path.join("chat_history.txt");
    let mut rl = rustyline::DefaultEditor::new()?;
    let _ = rl.load_history(&history_path);

    eprintln!("newsdesk interactive chat");
    eprintln!("Type /help for commands, Ctrl+D to exit");
    eprintln!();
    print_conversation(&service, config);

    loop {
        match rl.readline("you> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                rl.add_history_entry(&line).ok();

                // ── Slash commands ────────────────────────────────
                if trimmed.starts_with('/') {
                    if handle_slash_command(trimmed, &service, config).await {
                        break;
                    }
                    continue;
                }

                // ── User message → streamed answer ────────────────
                if let Err(e) = send(&service, config, trimmed).await {
                    eprintln!("\x1B[31merror: {e}\x1B[0m");
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                eprintln!("(Use Ctrl+D or /exit to quit)");
                continue;
            }
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("\x1B[31mreadline error: {e}\x1B[0m");
                break;
            }
        }
    }

    rl.save_history(&history_path).ok();
    eprintln!("Goodbye!");
    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Slash command handling
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Process a slash command.  Returns `true` if the REPL should exit.
async fn handle_slash_command(input: &str, service: &ChatService, config: &Config) -> bool {
    let cmd = input.split_whitespace().next().unwrap_or(input);

    match cmd {
        "/exit" | "/quit" => return true,

        "/reset" => match service.reset_session().await {
            Ok(()) => eprintln!("Conversation reset."),
            Err(e) => eprintln!("\x1B[31mreset failed: {e}\x1B[0m"),
        },

        "/history" => print_conversation(service, config),

        "/session" => match service.sessions().current() {
            Ok(Some(id)) => eprintln!("Current session: {id}"),
            Ok(None) => eprintln!("No session yet; one is created with the next message."),
            Err(e) => eprintln!("\x1B[31merror: {e}\x1B[0m"),
        },

        "/help" => {
            eprintln!("Commands:");
            eprintln!("  /reset           Start a fresh conversation");
            eprintln!("  /history         Reprint the conversation");
            eprintln!("  /session         Show the current session id");
            eprintln!("  /exit, /quit     Exit the chat");
            eprintln!("  /help            Show this help");
        }

        other => {
            eprintln!("Unknown command: {other}  (type /help for a list)");
        }
    }

    false
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Sending + streaming
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

async fn send(service: &ChatService, config: &Config, text: &str) -> anyhow::Result<()> {
    let mut preview = super::live_preview(config.display.color);
    let result = service.send_message(text, &mut preview).await;
    // End the preview line even when the send failed.
    eprintln!();

    let rendered = result?;
    println!("{}", render_message(&rendered, &config.display));
    println!();
    Ok(())
}

fn print_conversation(service: &ChatService, config: &Config) {
    for msg in service.rendered() {
        println!("{}", render_message(&msg, &config.display));
    }
}
