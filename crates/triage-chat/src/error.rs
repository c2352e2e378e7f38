//! Error types for the conversational engine.

use triage_core::TriageError;
use triage_llm::LlmError;
use triage_store::StoreError;

/// Errors from the chat engine.
///
/// These never reach the API caller as errors: the orchestrator converts
/// every variant into an apologetic natural-language response.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("query execution failed: {0}")]
    Execution(String),
    #[error("summarization failed: {0}")]
    Summarization(String),
    #[error("ticket not found: {0}")]
    TicketNotFound(String),
    #[error("LLM error: {0}")]
    Llm(String),
    #[error("session error: {0}")]
    Session(String),
}

impl From<StoreError> for ChatError {
    fn from(err: StoreError) -> Self {
        ChatError::Execution(err.to_string())
    }
}

impl From<LlmError> for ChatError {
    fn from(err: LlmError) -> Self {
        ChatError::Llm(err.to_string())
    }
}

impl From<ChatError> for TriageError {
    fn from(err: ChatError) -> Self {
        TriageError::Chat(err.to_string())
    }
}
