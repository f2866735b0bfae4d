// Public modules
pub mod chat_request;
pub mod responses;
pub mod turn;

// Re-exports
pub use chat_request::{ChatRequest, SuggestRequest};
pub(crate) use responses::ErrorDetail;
pub use responses::{AnswerResponse, SuggestResponse};
pub use turn::{Role, Turn};
