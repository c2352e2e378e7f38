//! Language-model collaborator interface.
//!
//! The engine consumes a language model as a black box with two
//! capabilities: classifying a message into a decision shape, and
//! generating free text. Both are fallible by contract; every caller must
//! have a deterministic fallback. No prompt text lives in this crate.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use triage_core::TriageError;

// =============================================================================
// Types
// =============================================================================

/// One prior turn handed to the classifier for context.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TurnContext {
    pub input: String,
    pub action: String,
    pub response: String,
}

/// Everything the classifier sees about the current request.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClassifyContext {
    pub message: String,
    /// Most recent turns, oldest first (the engine passes up to 3).
    pub recent_turns: Vec<TurnContext>,
    pub last_ticket: Option<String>,
    pub last_customer: Option<String>,
}

/// The loosely-shaped decision a model returns.
///
/// The intent router parses `action` into its typed decision and falls back
/// to a heuristic when the value is unrecognized.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawDecision {
    pub action: String,
    #[serde(default)]
    pub instruction: String,
    #[serde(default)]
    pub confidence: f32,
}

/// Errors from a language-model call.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("language model unavailable: {0}")]
    Unavailable(String),
    #[error("language model returned malformed output: {0}")]
    Malformed(String),
    #[error("language model call timed out")]
    Timeout,
}

impl From<LlmError> for TriageError {
    fn from(err: LlmError) -> Self {
        TriageError::Llm(err.to_string())
    }
}

// =============================================================================
// Trait
// =============================================================================

/// A natural-language understanding/generation collaborator.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Classify a message into a decision shape.
    async fn classify(&self, context: &ClassifyContext) -> Result<RawDecision, LlmError>;

    /// Generate free text from a prompt.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

// =============================================================================
// Implementations
// =============================================================================

/// The default collaborator when no model is configured: every call fails,
/// so callers exercise their deterministic fallbacks.
pub struct UnavailableLanguageModel;

#[async_trait]
impl LanguageModel for UnavailableLanguageModel {
    async fn classify(&self, _context: &ClassifyContext) -> Result<RawDecision, LlmError> {
        Err(LlmError::Unavailable("no language model configured".into()))
    }

    async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
        Err(LlmError::Unavailable("no language model configured".into()))
    }
}

/// Scripted reply for [`ScriptedLanguageModel`].
pub enum ScriptedReply {
    Decision(RawDecision),
    Text(String),
    Failure(LlmError),
}

/// Deterministic test double that replays queued replies in order.
///
/// When the queue runs dry, calls fail as if the model were unreachable.
pub struct ScriptedLanguageModel {
    replies: Mutex<VecDeque<ScriptedReply>>,
}

impl ScriptedLanguageModel {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
        }
    }

    fn next(&self) -> Option<ScriptedReply> {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
    }
}

#[async_trait]
impl LanguageModel for ScriptedLanguageModel {
    async fn classify(&self, _context: &ClassifyContext) -> Result<RawDecision, LlmError> {
        match self.next() {
            Some(ScriptedReply::Decision(d)) => Ok(d),
            Some(ScriptedReply::Failure(e)) => Err(e),
            Some(ScriptedReply::Text(t)) => Err(LlmError::Malformed(format!(
                "expected decision, got text: {}",
                t
            ))),
            None => Err(LlmError::Unavailable("script exhausted".into())),
        }
    }

    async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
        match self.next() {
            Some(ScriptedReply::Text(t)) => Ok(t),
            Some(ScriptedReply::Failure(e)) => Err(e),
            Some(ScriptedReply::Decision(_)) => {
                Err(LlmError::Malformed("expected text, got decision".into()))
            }
            None => Err(LlmError::Unavailable("script exhausted".into())),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
