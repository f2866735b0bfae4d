//! Chat session control for a streaming question-answering backend.
//!
//! This module provides the session controller the REPL is built on.  It
//! supports:
//!
//! - Streaming answers applied increment by increment
//! - A typing indicator and follow-up suggestions
//! - Slash commands for session control
//! - Configurable backend, input limits and request shape
//!
//! # Architecture
//!
//! The module is organized into several components:
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: Core chat session management and backend exchanges
//! - [`commands`]: Slash command parsing and handling

mod commands;
mod config;
mod session;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, DEFAULT_MAX_INPUT_CHARS};
pub use session::{
    ChatSession, ERROR_PREFIX, SessionState, SessionStats, SessionUpdate, SessionView,
    clamp_input,
};
