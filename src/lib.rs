// Public modules
pub mod chat;
pub mod client;
pub mod error;
pub mod ingest;
pub mod observability;
pub mod render;
pub mod scroll;
pub mod suggest;
pub mod transcript;
pub mod types;

// Re-exports
pub use chat::{ChatConfig, ChatSession, SessionUpdate};
pub use client::{ChatBackend, ChatBody, HttpBackend};
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use scroll::{FollowState, ScrollMetrics, ScrollTracker};
pub use transcript::Transcript;
pub use types::*;
