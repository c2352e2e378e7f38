use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// Lifecycle state of a ticket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketState {
    /// Freshly created, no agent has touched it yet.
    New,
    /// An agent is working on it.
    Open,
    /// Waiting on the customer or a scheduled follow-up.
    Pending,
    /// Resolved and closed.
    Closed,
}

impl TicketState {
    /// Whether the ticket still needs agent attention.
    pub fn is_open(&self) -> bool {
        !matches!(self, TicketState::Closed)
    }

    /// Store-level string value, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketState::New => "new",
            TicketState::Open => "open",
            TicketState::Pending => "pending",
            TicketState::Closed => "closed",
        }
    }
}

impl std::fmt::Display for TicketState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ticket priority.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
        };
        f.write_str(s)
    }
}

/// Who authored a ticket message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderRole {
    Customer,
    Agent,
    System,
}

impl std::fmt::Display for SenderRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SenderRole::Customer => "customer",
            SenderRole::Agent => "agent",
            SenderRole::System => "system",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Records
// =============================================================================

/// One message in a ticket's conversation thread.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TicketMessage {
    /// Who wrote the message.
    pub sender: SenderRole,
    /// Message body text.
    pub body: String,
    /// When the message was written.
    pub created_at: DateTime<Utc>,
    /// Internal notes are not visible to the customer.
    #[serde(default)]
    pub internal: bool,
}

/// A file attached to a ticket.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    /// MIME type, e.g. `application/pdf`.
    pub content_type: String,
    pub size_bytes: u64,
}

/// A support ticket record as returned by the data store.
///
/// Tickets are read-only from the engine's point of view: the conversational
/// core queries and renders them but never mutates store data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    /// Internal record identity.
    pub id: Uuid,
    /// External ticket number shown to customers, e.g. `2025010610000001`.
    pub number: String,
    pub title: String,
    /// Customer email address.
    pub customer: String,
    pub state: TicketState,
    #[serde(default)]
    pub priority: Priority,
    /// The queue (group) the ticket is assigned to.
    pub queue: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set once the ticket reaches `closed`.
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    /// Conversation thread, oldest first.
    #[serde(default)]
    pub messages: Vec<TicketMessage>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl Ticket {
    /// Messages visible to the customer (excludes internal notes).
    pub fn public_messages(&self) -> impl Iterator<Item = &TicketMessage> {
        self.messages.iter().filter(|m| !m.internal)
    }

    /// The sender of the most recent message, if any.
    pub fn last_actor(&self) -> Option<SenderRole> {
        self.messages.last().map(|m| m.sender)
    }
}

// =============================================================================
// Tests
// =============================================================================
