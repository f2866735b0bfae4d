//! Output rendering for the chat REPL.
//!
//! This module provides the renderer trait and a plain-text implementation
//! that writes the session's state to stdout as it changes.

use std::io::{self, Stdout, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::types::{Role, Turn};

/// ANSI escape code for dim text (used for the typing indicator).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for italic text (used for the typing indicator).
const ANSI_ITALIC: &str = "\x1b[3m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for speaker labels).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for yellow text (used for suggestions).
const ANSI_YELLOW: &str = "\x1b[33m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Text shown while the answer is open but empty.
const TYPING_INDICATOR: &str = "...";

/// Trait for rendering session output.
///
/// This abstraction allows for different rendering strategies:
/// - Plain text with ANSI styling
/// - Plain text without styling (for piping/redirecting)
pub trait Renderer: Send {
    /// Called when an assistant turn opens.
    fn start_response(&mut self);

    /// Shows or hides the typing indicator.
    fn show_typing(&mut self, typing: bool);

    /// Print a chunk of answer text.
    ///
    /// This is called incrementally as increments arrive from the backend.
    fn print_text(&mut self, text: &str);

    /// Called when a response is complete.
    ///
    /// Used to ensure proper newlines and cleanup after streaming.
    fn finish_response(&mut self);

    /// Print a whole turn, as when replaying a transcript.
    fn print_turn(&mut self, turn: &Turn);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Print a numbered list of prompts the user can pick with `/use`.
    fn print_suggestions(&mut self, heading: &str, suggestions: &[String]);

    /// Called when the user stops watching the current answer.
    fn print_interrupted(&mut self) {}

    /// Returns true if output for the current answer should stop.
    fn should_interrupt(&self) -> bool {
        false
    }
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    typing_shown: bool,
    line_start: bool,
    interrupted: Option<Arc<AtomicBool>>,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            typing_shown: false,
            line_start: true,
            interrupted: None,
        }
    }

    /// Attaches an interrupt flag to the renderer.
    pub fn with_interrupt(mut self, interrupted: Arc<AtomicBool>) -> Self {
        self.interrupted = Some(interrupted);
        self
    }

    /// Flushes stdout to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn write(&mut self, text: &str) {
        print!("{text}");
        if !text.is_empty() {
            self.line_start = text.ends_with('\n');
        }
        self.flush();
    }

    fn styled(&self, style: &str, text: &str) -> String {
        if self.use_color {
            format!("{style}{text}{ANSI_RESET}")
        } else {
            text.to_string()
        }
    }

    fn label(&self, role: Role) -> String {
        self.styled(ANSI_CYAN, &format!("{role}>"))
    }

    /// Erases the typing indicator.  It is the only thing written since the
    /// label, so backing over it is enough.
    fn clear_typing(&mut self) {
        if self.typing_shown {
            let width = TYPING_INDICATOR.len();
            self.write(&format!("{}{}{}", "\x08".repeat(width), " ".repeat(width), "\x08".repeat(width)));
            self.typing_shown = false;
        }
    }

    fn end_line(&mut self) {
        if !self.line_start {
            self.write("\n");
        }
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn start_response(&mut self) {
        self.end_line();
        let label = self.label(Role::Assistant);
        self.write(&format!("{label} "));
    }

    fn show_typing(&mut self, typing: bool) {
        if typing && !self.typing_shown {
            let indicator = if self.use_color {
                format!("{ANSI_DIM}{ANSI_ITALIC}{TYPING_INDICATOR}{ANSI_RESET}")
            } else {
                TYPING_INDICATOR.to_string()
            };
            self.write(&indicator);
            self.typing_shown = true;
        } else if !typing {
            self.clear_typing();
        }
    }

    fn print_text(&mut self, text: &str) {
        self.clear_typing();
        self.write(text);
    }

    fn finish_response(&mut self) {
        self.clear_typing();
        self.write("\n");
    }

    fn print_turn(&mut self, turn: &Turn) {
        self.end_line();
        let label = self.label(turn.role());
        self.write(&format!("{label} {}\n", turn.content()));
    }

    fn print_error(&mut self, error: &str) {
        self.clear_typing();
        self.end_line();
        let message = self.styled(ANSI_RED, &format!("Error: {error}"));
        eprintln!("{message}");
    }

    fn print_info(&mut self, info: &str) {
        self.end_line();
        println!("{info}");
        self.line_start = true;
        self.flush();
    }

    fn print_suggestions(&mut self, heading: &str, suggestions: &[String]) {
        if suggestions.is_empty() {
            return;
        }
        self.end_line();
        let mut out = format!("{heading}\n");
        for (i, suggestion) in suggestions.iter().enumerate() {
            let item = self.styled(ANSI_YELLOW, suggestion);
            out.push_str(&format!("  {}. {item}\n", i + 1));
        }
        self.write(&out);
    }

    fn print_interrupted(&mut self) {
        self.clear_typing();
        self.write("\n[interrupted]\n");
    }

    fn should_interrupt(&self) -> bool {
        self.interrupted
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderer_default_has_color() {
        let renderer = PlainTextRenderer::new();
        assert!(renderer.use_color);
    }

    #[test]
    fn renderer_without_color() {
        let renderer = PlainTextRenderer::with_color(false);
        assert!(!renderer.use_color);
        assert_eq!(renderer.styled(ANSI_RED, "plain"), "plain");
        assert_eq!(renderer.label(Role::User), "user>");
    }

    #[test]
    fn styled_wraps_and_resets() {
        let renderer = PlainTextRenderer::with_color(true);
        assert_eq!(
            renderer.styled(ANSI_CYAN, "assistant>"),
            "\x1b[36massistant>\x1b[0m"
        );
    }

    #[test]
    fn interrupt_flag_is_observed() {
        let flag = Arc::new(AtomicBool::new(false));
        let renderer = PlainTextRenderer::with_color(false).with_interrupt(flag.clone());
        assert!(!renderer.should_interrupt());
        flag.store(true, Ordering::Relaxed);
        assert!(renderer.should_interrupt());
    }
}
