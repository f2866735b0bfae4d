//! Interactive chat client for a streaming question-answering backend.
//!
//! This binary provides a REPL that renders the session as it changes:
//! answers stream in as they arrive, and follow-up suggestions are listed
//! once an answer completes.
//!
//! # Usage
//!
//! ```bash
//! # Talk to a backend on localhost:8000
//! palaver-chat
//!
//! # Point at another backend
//! palaver-chat --backend https://chat.example.com/api
//!
//! # Offer starter prompts on an empty conversation
//! palaver-chat --prompts "What are you working on?|Any recent talks?"
//!
//! # Disable colors (useful for piping output)
//! palaver-chat --no-color
//! ```
//!
//! Set `PALAVER_LOG` (e.g. `PALAVER_LOG=palaver=debug`) to see diagnostics.
//!
//! Ctrl+C while an answer streams stops printing it; a second Ctrl+C before
//! the exchange settles exits.
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/clear` - Clear conversation history
//! - `/use <n>` - Send a suggestion or starter prompt
//! - `/suggestions` - List suggestions or starter prompts
//! - `/history` - Replay the conversation
//! - `/ping` - Check the backend is alive
//! - `/stats` - Show session statistics
//! - `/quit` - Exit the application

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;

use palaver::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, Renderer, SessionUpdate,
    clamp_input, help_text, parse_command,
};
use palaver::{ChatBackend, Error, HttpBackend};

const LOG_ENV: &str = "PALAVER_LOG";
/// Exit status of a process ended by SIGINT.
const INTERRUPTED_EXIT: i32 = 130;

/// Ctrl+C state shared with the signal handler.
#[derive(Default)]
struct Interrupt {
    pressed: Arc<AtomicBool>,
    streaming: AtomicBool,
    wake: Notify,
}

impl Interrupt {
    fn on_signal(&self) {
        let again = self.pressed.swap(true, Ordering::SeqCst);
        if again && self.streaming.load(Ordering::SeqCst) {
            std::process::exit(INTERRUPTED_EXIT);
        }
        self.wake.notify_waiters();
    }

    fn is_pressed(&self) -> bool {
        self.pressed.load(Ordering::SeqCst)
    }
}

/// Main entry point for the palaver-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let (args, _) = ChatArgs::from_command_line_relaxed("palaver-chat [OPTIONS]");
    let config = ChatConfig::from(args);
    let use_color = config.use_color;
    let max_input_chars = config.max_input_chars;

    let backend =
        match HttpBackend::with_options(config.backend_url.clone(), Some(config.connect_timeout)) {
            Ok(backend) => backend,
            Err(err) if err.is_validation() => {
                eprintln!("palaver-chat: {err}");
                std::process::exit(2);
            }
            Err(err) => return Err(err.into()),
        };
    let backend_url = backend.base_url().to_string();
    let mut session = ChatSession::with_backend(backend, config);

    let interrupt = Arc::new(Interrupt::default());
    let mut renderer =
        PlainTextRenderer::with_color(use_color).with_interrupt(Arc::clone(&interrupt.pressed));
    let mut rl = DefaultEditor::new()?;

    let handler = Arc::clone(&interrupt);
    ctrlc::set_handler(move || handler.on_signal())?;

    println!("Palaver Chat (backend: {backend_url})");
    println!("Type /help for commands, /quit to exit\n");
    session.on_ready();
    renderer.print_suggestions("Try asking (/use <n>):", session.default_prompts());

    loop {
        interrupt.pressed.store(false, Ordering::SeqCst);

        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Check for slash commands
                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Clear => {
                            if session.clear() {
                                renderer.print_info("Conversation cleared.");
                            } else {
                                renderer.print_error("Cannot clear while an answer is streaming.");
                            }
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::Use(index) => {
                            if session.use_suggestion(index) {
                                stream_answer(&mut session, &mut renderer, &interrupt).await;
                            } else {
                                renderer.print_error(&format!("No suggestion number {}", index + 1));
                            }
                        }
                        ChatCommand::Suggestions => {
                            if session.transcript().is_empty() {
                                renderer.print_suggestions("Try asking:", session.default_prompts());
                            } else {
                                renderer.print_suggestions("Follow-ups:", session.suggestions());
                            }
                        }
                        ChatCommand::History => {
                            if session.transcript().is_empty() {
                                renderer.print_info("(no conversation yet)");
                            }
                            for turn in session.transcript() {
                                renderer.print_turn(turn);
                            }
                        }
                        ChatCommand::Ping => match session.ping().await {
                            Ok(()) => renderer.print_info("Backend is alive."),
                            Err(err) => renderer.print_error(&ping_failure(&err)),
                        },
                        ChatCommand::Stats => {
                            print_stats(&session, &backend_url);
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                // Regular message - send to the backend
                let text = clamp_input(line, max_input_chars);
                if text.len() < line.len() {
                    renderer.print_info(&format!(
                        "(message cut to {max_input_chars} characters)"
                    ));
                }
                session.set_input(text);
                if session.submit(text) {
                    stream_answer(&mut session, &mut renderer, &interrupt).await;
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

/// Renders updates until the exchange and its follow-ups are done.
///
/// The first Ctrl+C stops the output, not the exchange; the session still has
/// to settle before it accepts the next message.  A stalled backend can be
/// left with a second Ctrl+C, which exits.
async fn stream_answer<B: ChatBackend + 'static>(
    session: &mut ChatSession<B>,
    renderer: &mut PlainTextRenderer,
    interrupt: &Interrupt,
) {
    interrupt.streaming.store(true, Ordering::SeqCst);
    let mut watching = true;
    loop {
        let wake = interrupt.wake.notified();
        tokio::pin!(wake);
        wake.as_mut().enable();
        if watching && interrupt.is_pressed() {
            renderer.print_interrupted();
            renderer.print_info("(waiting for the backend; Ctrl+C again to quit)");
            watching = false;
        }

        let update = tokio::select! {
            update = session.next_update() => update,
            () = &mut wake, if watching => continue,
        };
        let Some(update) = update else {
            break;
        };
        if !watching {
            continue;
        }
        match update {
            SessionUpdate::Opened => {
                renderer.start_response();
                renderer.show_typing(session.is_typing());
            }
            SessionUpdate::Delta(text) => renderer.print_text(&text),
            SessionUpdate::Completed => renderer.finish_response(),
            SessionUpdate::Failed(message) => renderer.print_error(&message),
            SessionUpdate::Suggestions(suggestions) => {
                renderer.print_suggestions("Follow-ups (/use <n>):", &suggestions);
            }
            SessionUpdate::Stale => {}
        }
    }
    interrupt.streaming.store(false, Ordering::SeqCst);
}

fn ping_failure(err: &Error) -> String {
    match err.status_code() {
        Some(status) => format!("Backend is reachable but unhealthy (status {status})"),
        None if err.is_transport() => format!("Backend unreachable: {err}"),
        None => format!("Ping failed: {err}"),
    }
}

fn print_stats<B: ChatBackend + 'static>(session: &ChatSession<B>, backend_url: &str) {
    let stats = session.stats();
    println!("    Session Statistics:");
    println!("      Backend: {}", backend_url);
    println!("      Turns: {}", stats.turn_count);
    println!(
        "      Exchanges: {} started / {} completed / {} failed",
        stats.exchanges_started, stats.exchanges_completed, stats.exchanges_failed
    );
    println!("      Suggestions shown: {}", stats.suggestion_count);
    println!(
        "      Request body: {}",
        if session.config().legacy_question {
            "latest question"
        } else {
            "full history"
        }
    );
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn first_signal_wakes_a_stalled_stream() {
        let interrupt = Interrupt::default();
        interrupt.streaming.store(true, Ordering::SeqCst);

        let wake = interrupt.wake.notified();
        tokio::pin!(wake);
        wake.as_mut().enable();
        interrupt.on_signal();

        assert!(interrupt.is_pressed());
        tokio::time::timeout(Duration::from_secs(1), wake)
            .await
            .expect("signal did not wake the stream");
    }

    #[test]
    fn ping_failure_reports_status() {
        assert_eq!(
            ping_failure(&Error::api(503, "warming up")),
            "Backend is reachable but unhealthy (status 503)"
        );
        assert!(ping_failure(&Error::connection("refused", None)).starts_with("Backend unreachable"));
    }
}
