//! Core chat session management.
//!
//! [`ChatSession`] owns the transcript and the session flags, and runs at most
//! one exchange with the backend at a time.  The network side of an exchange
//! runs as a spawned task that reports back over a channel; nothing changes in
//! the session until the owner applies those reports with
//! [`ChatSession::next_update`], so every mutation happens on the caller's
//! loop and in arrival order.

use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use tokio::sync::mpsc;

use crate::chat::config::ChatConfig;
use crate::client::{ChatBackend, HttpBackend};
use crate::error::{Error, Result};
use crate::ingest::text_stream;
use crate::observability::{
    SESSION_EXCHANGE_DURATION, SESSION_EXCHANGE_FAILURES, SESSION_EXCHANGES,
    SESSION_REJECTED_CLEARS, SESSION_REJECTED_SUBMITS, SESSION_TTFB,
};
use crate::scroll::{FollowState, ScrollMetrics, ScrollTracker};
use crate::suggest::fetch_suggestions;
use crate::transcript::Transcript;
use crate::types::{ChatRequest, Turn};

/// Prefix of the assistant turn recorded when an exchange fails to open.
pub const ERROR_PREFIX: &str = "Error fetching response";

/// Flags and buffers the presentation layer renders alongside the transcript.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// An exchange is in flight; new submissions are rejected.
    pub sending: bool,
    /// The answer has been opened but nothing has arrived yet.
    pub typing: bool,
    /// The text currently in the input box.
    pub input: String,
    /// Follow-up prompts for the last completed answer.
    pub suggestions: Vec<String>,
}

/// What a call to [`ChatSession::next_update`] changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// An empty assistant turn was opened; the typing indicator is on.
    Opened,
    /// Text was appended to the in-flight assistant turn.
    Delta(String),
    /// The answer finished streaming and the turn is frozen.
    Completed,
    /// The exchange failed.  Carries the user-facing message.
    Failed(String),
    /// Follow-up suggestions replaced the previous (empty) list.
    Suggestions(Vec<String>),
    /// A report from an exchange or fetch that no longer matters was dropped.
    Stale,
}

/// A point-in-time copy of everything a renderer needs.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub turns: Vec<Turn>,
    pub sending: bool,
    pub typing: bool,
    pub input: String,
    pub suggestions: Vec<String>,
    pub follow_bottom: bool,
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// The number of turns in the transcript.
    pub turn_count: usize,
    /// Exchanges opened since the session started.
    pub exchanges_started: u64,
    /// Exchanges whose answer streamed to the end.
    pub exchanges_completed: u64,
    /// Exchanges that failed.
    pub exchanges_failed: u64,
    /// The number of suggestions currently shown.
    pub suggestion_count: usize,
}

#[derive(Debug)]
enum ExchangeEvent {
    Opened,
    Delta(String),
    Failed(Error),
    Finished,
    Suggestions(Vec<String>),
}

#[derive(Debug)]
struct Envelope {
    generation: u64,
    event: ExchangeEvent,
}

/// A chat session that manages conversation state and backend exchanges.
///
/// Methods that start network work spawn onto the current Tokio runtime.
pub struct ChatSession<B: ChatBackend + 'static = HttpBackend> {
    backend: Arc<B>,
    config: ChatConfig,
    transcript: Transcript,
    state: SessionState,
    scroll: ScrollTracker,
    // Bumped on every submit and clear; reports tagged with an older value are
    // dropped.
    generation: u64,
    suggestions_pending: bool,
    events_tx: mpsc::UnboundedSender<Envelope>,
    events_rx: mpsc::UnboundedReceiver<Envelope>,
    exchange_started: Option<Instant>,
    exchanges_started: u64,
    exchanges_completed: u64,
    exchanges_failed: u64,
}

impl ChatSession<HttpBackend> {
    /// Creates a new chat session talking HTTP to the configured backend.
    pub fn new(config: ChatConfig) -> Result<Self> {
        let backend =
            HttpBackend::with_options(config.backend_url.clone(), Some(config.connect_timeout))?;
        Ok(Self::with_backend(backend, config))
    }
}

impl<B: ChatBackend + 'static> ChatSession<B> {
    /// Creates a new chat session with a custom backend.
    pub fn with_backend(backend: B, config: ChatConfig) -> Self {
        Self::with_shared_backend(Arc::new(backend), config)
    }

    /// Creates a new chat session over a backend shared with other owners.
    pub fn with_shared_backend(backend: Arc<B>, config: ChatConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let scroll = ScrollTracker::new(config.scroll_threshold);
        Self {
            backend,
            config,
            transcript: Transcript::new(),
            state: SessionState::default(),
            scroll,
            generation: 0,
            suggestions_pending: false,
            events_tx,
            events_rx,
            exchange_started: None,
            exchanges_started: 0,
            exchanges_completed: 0,
            exchanges_failed: 0,
        }
    }

    /// Lifecycle hook for when the session is first shown.
    ///
    /// Fires a liveness check and returns immediately.  Its outcome is
    /// only logged.
    pub fn on_ready(&self) {
        if !self.config.ping_on_ready {
            return;
        }
        let backend = Arc::clone(&self.backend);
        tokio::spawn(async move {
            match backend.ping().await {
                Ok(()) => tracing::debug!("backend is alive"),
                Err(err) => tracing::warn!(error = %err, "liveness check failed"),
            }
        });
    }

    /// Pings the backend and waits for the answer.
    pub async fn ping(&self) -> Result<()> {
        self.backend.ping().await
    }

    /// Submits a user message.
    ///
    /// Returns false, changing nothing, while an exchange is in flight or when
    /// `text` is blank.  Otherwise records the trimmed text as a user turn,
    /// clears the input and suggestions, and opens an exchange with the full
    /// transcript.
    pub fn submit(&mut self, text: &str) -> bool {
        if self.state.sending {
            SESSION_REJECTED_SUBMITS.click();
            tracing::debug!("submit rejected: exchange in flight");
            return false;
        }
        let text = text.trim();
        if text.is_empty() {
            return false;
        }

        self.transcript.push_user(text);
        self.state.input.clear();
        self.state.suggestions.clear();
        self.state.sending = true;
        self.state.typing = false;
        self.suggestions_pending = false;
        self.generation += 1;
        self.scroll.jump_to_bottom();
        self.start_exchange();
        true
    }

    /// Submits the suggestion at `index`.  On an empty conversation the
    /// starter prompt at `index` is used instead.
    pub fn use_suggestion(&mut self, index: usize) -> bool {
        let choices = if self.transcript.is_empty() {
            &self.config.default_prompts
        } else {
            &self.state.suggestions
        };
        match choices.get(index).cloned() {
            Some(text) => self.submit(&text),
            None => false,
        }
    }

    /// Clears the conversation and suggestions.
    ///
    /// Returns false, changing nothing, while an exchange is in flight.
    pub fn clear(&mut self) -> bool {
        if self.state.sending {
            SESSION_REJECTED_CLEARS.click();
            tracing::debug!("clear rejected: exchange in flight");
            return false;
        }
        self.transcript.clear();
        self.state.suggestions.clear();
        self.suggestions_pending = false;
        self.generation += 1;
        self.scroll.reset();
        true
    }

    /// Replaces the input buffer.
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.state.input = text.into();
    }

    /// True while an exchange or suggestion fetch has reports outstanding.
    pub fn is_busy(&self) -> bool {
        self.state.sending || self.suggestions_pending
    }

    /// Waits for the next report from the backend and applies it.
    ///
    /// Returns `None` once nothing is outstanding.
    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        if !self.is_busy() {
            return None;
        }
        let envelope = self.events_rx.recv().await?;
        Some(self.apply(envelope))
    }

    /// Applies every report that has already arrived, without waiting.
    pub fn drain_updates(&mut self) -> Vec<SessionUpdate> {
        let mut updates = Vec::new();
        while let Ok(envelope) = self.events_rx.try_recv() {
            updates.push(self.apply(envelope));
        }
        updates
    }

    /// Applies reports until the exchange and any suggestion fetch are done.
    pub async fn settle(&mut self) {
        while self.next_update().await.is_some() {}
    }

    /// The conversation so far.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// The session flags and buffers.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_sending(&self) -> bool {
        self.state.sending
    }

    pub fn is_typing(&self) -> bool {
        self.state.typing
    }

    pub fn input(&self) -> &str {
        &self.state.input
    }

    pub fn suggestions(&self) -> &[String] {
        &self.state.suggestions
    }

    /// Starter prompts offered on an empty conversation.
    pub fn default_prompts(&self) -> &[String] {
        &self.config.default_prompts
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Whether the transcript view should follow new content.
    pub fn follow_bottom(&self) -> bool {
        self.scroll.follow_bottom()
    }

    /// Scroll-event reporter; the presentation layer calls this on every
    /// scroll.
    pub fn report_scroll(&mut self, metrics: ScrollMetrics) -> FollowState {
        self.scroll.report_scroll(metrics)
    }

    /// Returns true once per requested jump to the bottom of the transcript.
    pub fn apply_pending_scroll(&mut self) -> bool {
        self.scroll.apply_pending_scroll()
    }

    /// Returns a snapshot for rendering.
    pub fn view(&self) -> SessionView {
        SessionView {
            turns: self.transcript.turns().to_vec(),
            sending: self.state.sending,
            typing: self.state.typing,
            input: self.state.input.clone(),
            suggestions: self.state.suggestions.clone(),
            follow_bottom: self.scroll.follow_bottom(),
        }
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            turn_count: self.transcript.len(),
            exchanges_started: self.exchanges_started,
            exchanges_completed: self.exchanges_completed,
            exchanges_failed: self.exchanges_failed,
            suggestion_count: self.state.suggestions.len(),
        }
    }

    fn start_exchange(&mut self) {
        let turns = self.transcript.turns();
        let request = if self.config.legacy_question {
            ChatRequest::question(turns).unwrap_or_else(|| ChatRequest::history(turns))
        } else {
            ChatRequest::history(turns)
        };
        SESSION_EXCHANGES.click();
        self.exchanges_started += 1;
        self.exchange_started = Some(Instant::now());
        tracing::debug!(
            generation = self.generation,
            turns = turns.len(),
            "starting exchange"
        );
        tokio::spawn(run_exchange(
            Arc::clone(&self.backend),
            request,
            self.events_tx.clone(),
            self.generation,
        ));
    }

    fn start_suggestions(&mut self) {
        let backend = Arc::clone(&self.backend);
        let history = self.transcript.turns().to_vec();
        let limit = self.config.max_suggestions;
        let tx = self.events_tx.clone();
        let generation = self.generation;
        self.suggestions_pending = true;
        tokio::spawn(async move {
            let suggestions = fetch_suggestions(backend.as_ref(), history, limit).await;
            let _ = tx.send(Envelope {
                generation,
                event: ExchangeEvent::Suggestions(suggestions),
            });
        });
    }

    fn finish_exchange(&mut self) {
        self.state.sending = false;
        self.state.typing = false;
        if let Some(started) = self.exchange_started.take() {
            SESSION_EXCHANGE_DURATION.add(started.elapsed().as_secs_f64());
        }
    }

    fn apply(&mut self, envelope: Envelope) -> SessionUpdate {
        let Envelope { generation, event } = envelope;
        if generation != self.generation {
            tracing::trace!(generation, current = self.generation, "dropping stale report");
            return SessionUpdate::Stale;
        }

        match event {
            ExchangeEvent::Opened => {
                self.transcript.open_assistant();
                self.state.typing = true;
                self.scroll.on_transcript_changed();
                SessionUpdate::Opened
            }
            ExchangeEvent::Delta(text) => {
                if !self.transcript.extend_in_flight(&text) {
                    tracing::warn!("dropping increment with no answer in flight");
                    return SessionUpdate::Stale;
                }
                if self.state.typing && !text.is_empty() {
                    self.state.typing = false;
                    if let Some(started) = self.exchange_started {
                        SESSION_TTFB.add(started.elapsed().as_secs_f64());
                    }
                }
                self.scroll.on_transcript_changed();
                SessionUpdate::Delta(text)
            }
            ExchangeEvent::Failed(err) => {
                SESSION_EXCHANGE_FAILURES.click();
                self.exchanges_failed += 1;
                let message = format!("{ERROR_PREFIX}: {err}");
                if self.transcript.finish_in_flight() {
                    tracing::warn!(error = %err, "answer broke off; keeping partial content");
                } else {
                    tracing::warn!(
                        error = %err,
                        status = ?err.status_code(),
                        transport = err.is_transport(),
                        "exchange failed"
                    );
                    self.transcript.push_assistant(message.clone());
                    self.scroll.on_transcript_changed();
                }
                self.finish_exchange();
                SessionUpdate::Failed(message)
            }
            ExchangeEvent::Finished => {
                self.transcript.finish_in_flight();
                self.finish_exchange();
                self.exchanges_completed += 1;
                if self.config.suggestions_enabled {
                    self.start_suggestions();
                }
                SessionUpdate::Completed
            }
            ExchangeEvent::Suggestions(suggestions) => {
                if !self.suggestions_pending {
                    return SessionUpdate::Stale;
                }
                self.suggestions_pending = false;
                self.state.suggestions = suggestions.clone();
                SessionUpdate::Suggestions(suggestions)
            }
        }
    }
}

/// Runs the network side of one exchange, reporting each step in order.
async fn run_exchange<B>(
    backend: Arc<B>,
    request: ChatRequest,
    tx: mpsc::UnboundedSender<Envelope>,
    generation: u64,
) where
    B: ChatBackend + ?Sized,
{
    let send = |event: ExchangeEvent| tx.send(Envelope { generation, event }).is_ok();

    let body = match backend.chat(request).await {
        Ok(body) => body,
        Err(err) => {
            send(ExchangeEvent::Failed(err));
            return;
        }
    };
    if !send(ExchangeEvent::Opened) {
        return;
    }

    let mut increments = text_stream(body);
    while let Some(increment) = increments.next().await {
        let event = match increment {
            Ok(text) => ExchangeEvent::Delta(text),
            Err(err) => {
                send(ExchangeEvent::Failed(err));
                return;
            }
        };
        if !send(event) {
            return;
        }
    }
    send(ExchangeEvent::Finished);
}

/// Cuts `text` to at most `max_chars` characters.
///
/// The input surface applies this before anything reaches
/// [`ChatSession::set_input`] or [`ChatSession::submit`].
pub fn clamp_input(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
