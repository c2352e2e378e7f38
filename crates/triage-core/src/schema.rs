//! Schema-path table: semantic field names mapped to store field paths.
//!
//! The query planner builds filters against store paths; the intent router
//! answers "what is X" questions from the explanation texts. Both consume
//! this table read-only.

use serde::{Deserialize, Serialize};

/// A schema concept the assistant can filter on or explain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Concept {
    /// The whole ticket record (structure explanation only, no path).
    Structure,
    Number,
    Customer,
    Status,
    Priority,
    Queue,
    Created,
    Body,
}

/// All concepts, in the order they are listed when explaining the structure.
pub const ALL_CONCEPTS: &[Concept] = &[
    Concept::Number,
    Concept::Customer,
    Concept::Status,
    Concept::Priority,
    Concept::Queue,
    Concept::Created,
    Concept::Body,
];

impl Concept {
    /// The store field path this concept filters on.
    ///
    /// `Structure` has no path; it exists only for explanations.
    pub fn store_path(&self) -> Option<&'static str> {
        match self {
            Concept::Structure => None,
            Concept::Number => Some("number"),
            Concept::Customer => Some("customer"),
            Concept::Status => Some("state"),
            Concept::Priority => Some("priority"),
            Concept::Queue => Some("queue"),
            Concept::Created => Some("created_at"),
            Concept::Body => Some("messages.body"),
        }
    }

    /// Human-readable name used in responses.
    pub fn name(&self) -> &'static str {
        match self {
            Concept::Structure => "ticket structure",
            Concept::Number => "ticket number",
            Concept::Customer => "customer",
            Concept::Status => "status",
            Concept::Priority => "priority",
            Concept::Queue => "queue",
            Concept::Created => "creation date",
            Concept::Body => "message body",
        }
    }

    /// Explanation text for the `explain` action.
    pub fn describe(&self) -> &'static str {
        match self {
            Concept::Structure => {
                "A ticket has a header (number, title, customer, status, priority, queue, \
                 timestamps), an ordered conversation thread of messages (each with a sender \
                 role, body, timestamp, and an internal-note flag), and a list of attachments \
                 (filename, MIME type, size)."
            }
            Concept::Number => {
                "The ticket number is the external identifier shown to customers, \
                 e.g. 2025010610000001. Use it to reference a specific ticket."
            }
            Concept::Customer => {
                "The customer is the person the ticket belongs to, identified by email address."
            }
            Concept::Status => {
                "The status tracks a ticket's lifecycle: new, open, pending, or closed. \
                 Everything except closed still needs agent attention."
            }
            Concept::Priority => "The priority is one of low, normal, or high.",
            Concept::Queue => {
                "The queue is the team inbox a ticket is assigned to, e.g. Support or Sales."
            }
            Concept::Created => "The creation date records when the ticket was first opened.",
            Concept::Body => {
                "Message bodies hold the conversation text exchanged between the customer \
                 and agents."
            }
        }
    }

    /// Look a concept up by a word from user text.
    ///
    /// Matches the aliases users actually type, not just the canonical names.
    pub fn lookup(word: &str) -> Option<Concept> {
        match word.to_lowercase().as_str() {
            "structure" | "ticket" | "tickets" | "record" | "fields" => Some(Concept::Structure),
            "number" | "id" => Some(Concept::Number),
            "customer" | "customers" | "email" | "requester" => Some(Concept::Customer),
            "status" | "state" => Some(Concept::Status),
            "priority" => Some(Concept::Priority),
            "queue" | "queues" | "group" => Some(Concept::Queue),
            "created" | "creation" | "date" => Some(Concept::Created),
            "body" | "message" | "messages" | "conversation" => Some(Concept::Body),
            _ => None,
        }
    }

    /// All store paths, used by the store to validate incoming filters.
    pub fn known_paths() -> impl Iterator<Item = &'static str> {
        ALL_CONCEPTS.iter().filter_map(|c| c.store_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_paths() {
        assert_eq!(Concept::Customer.store_path(), Some("customer"));
        assert_eq!(Concept::Status.store_path(), Some("state"));
        assert_eq!(Concept::Body.store_path(), Some("messages.body"));
        assert_eq!(Concept::Structure.store_path(), None);
    }

    #[test]
    fn test_lookup_aliases() {
        assert_eq!(Concept::lookup("email"), Some(Concept::Customer));
        assert_eq!(Concept::lookup("state"), Some(Concept::Status));
        assert_eq!(Concept::lookup("STATUS"), Some(Concept::Status));
        assert_eq!(Concept::lookup("group"), Some(Concept::Queue));
        assert_eq!(Concept::lookup("fields"), Some(Concept::Structure));
        assert_eq!(Concept::lookup("nonsense"), None);
    }

    #[test]
    fn test_every_concept_has_description() {
        for c in ALL_CONCEPTS {
            assert!(!c.describe().is_empty());
            assert!(!c.name().is_empty());
        }
        assert!(!Concept::Structure.describe().is_empty());
    }

    #[test]
    fn test_known_paths_complete() {
        let paths: Vec<_> = Concept::known_paths().collect();
        assert_eq!(paths.len(), ALL_CONCEPTS.len());
        assert!(paths.contains(&"created_at"));
        assert!(paths.contains(&"messages.body"));
    }
}
