//! Ticket summarization.
//!
//! Builds a structured digest of one or more tickets and renders it as
//! headed markdown sections in a fixed order. Only fields actually present
//! in the input records are rendered. Narrative generation for multi-ticket
//! summaries is best-effort via the language model, with a structured-only
//! fallback.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use triage_core::types::{Attachment, SenderRole, Ticket};
use triage_llm::LanguageModel;

/// Maximum characters of a message body shown in the conversation flow.
const BODY_PREVIEW_CHARS: usize = 160;

// =============================================================================
// Digest
// =============================================================================

/// One entry in the chronological conversation flow.
#[derive(Clone, Debug)]
pub struct TimelineEntry {
    pub at: DateTime<Utc>,
    pub sender: SenderRole,
    pub body: String,
    pub internal: bool,
}

/// Structured summary of a single ticket, computed before any rendering.
#[derive(Clone, Debug)]
pub struct TicketDigest {
    pub number: String,
    pub title: String,
    pub customer: String,
    pub state: String,
    pub priority: String,
    pub queue: String,
    pub created_at: DateTime<Utc>,
    pub timeline: Vec<TimelineEntry>,
    pub customer_messages: usize,
    pub agent_messages: usize,
    pub system_messages: usize,
    pub attachments: Vec<Attachment>,
    pub open: bool,
    /// Time from creation to closure, when closed.
    pub resolution: Option<Duration>,
    pub last_actor: Option<SenderRole>,
}

impl TicketDigest {
    /// Build the digest from a record. Pure; renders nothing.
    pub fn from_ticket(ticket: &Ticket) -> Self {
        let mut timeline: Vec<TimelineEntry> = ticket
            .messages
            .iter()
            .map(|m| TimelineEntry {
                at: m.created_at,
                sender: m.sender,
                body: m.body.clone(),
                internal: m.internal,
            })
            .collect();
        timeline.sort_by_key(|e| e.at);

        let count = |role: SenderRole| {
            ticket
                .messages
                .iter()
                .filter(|m| m.sender == role)
                .count()
        };

        Self {
            number: ticket.number.clone(),
            title: ticket.title.clone(),
            customer: ticket.customer.clone(),
            state: ticket.state.to_string(),
            priority: ticket.priority.to_string(),
            queue: ticket.queue.clone(),
            created_at: ticket.created_at,
            timeline,
            customer_messages: count(SenderRole::Customer),
            agent_messages: count(SenderRole::Agent),
            system_messages: count(SenderRole::System),
            attachments: ticket.attachments.clone(),
            open: ticket.state.is_open(),
            resolution: ticket.closed_at.map(|closed| closed - ticket.created_at),
            last_actor: ticket.last_actor(),
        }
    }
}

// =============================================================================
// Summarizer
// =============================================================================

/// Renders ticket digests as narrative markdown.
pub struct TicketSummarizer {
    llm: Arc<dyn LanguageModel>,
    /// Cross-record summaries digest at most this many tickets.
    multi_sample: usize,
}

impl TicketSummarizer {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self {
            llm,
            multi_sample: 3,
        }
    }

    /// Summarize one or more tickets.
    ///
    /// Single record: full sectioned digest. Multiple: per-ticket digests of
    /// the first few plus cross-record patterns, with an optional generated
    /// narrative. Never errors.
    pub async fn summarize(&self, records: &[Ticket]) -> String {
        match records {
            [] => "No tickets to summarize.".to_string(),
            [single] => render_digest(&TicketDigest::from_ticket(single)),
            many => self.summarize_many(many).await,
        }
    }

    async fn summarize_many(&self, records: &[Ticket]) -> String {
        let sample = &records[..records.len().min(self.multi_sample)];
        let mut out = format!(
            "Summary of {} tickets (showing the first {}):\n\n",
            records.len(),
            sample.len()
        );

        for ticket in sample {
            let digest = TicketDigest::from_ticket(ticket);
            out.push_str(&format!(
                "- #{} [{}] {} — {} message{}, customer {}\n",
                digest.number,
                digest.state,
                digest.title,
                digest.timeline.len(),
                plural(digest.timeline.len()),
                digest.customer
            ));
        }

        out.push('\n');
        out.push_str(&cross_patterns(records));

        // Best-effort narrative on top of the structured data.
        match self.llm.generate(&out).await {
            Ok(narrative) if !narrative.trim().is_empty() => {
                debug!("Narrative summary generated");
                format!("{}\n\n{}", narrative.trim(), out.trim_end())
            }
            Ok(_) => out.trim_end().to_string(),
            Err(e) => {
                warn!(error = %e, "Narrative generation failed, structured summary only");
                out.trim_end().to_string()
            }
        }
    }
}

// =============================================================================
// Rendering
// =============================================================================

/// Render a digest as markdown sections in fixed order. Sections with
/// nothing to show are omitted rather than filled with placeholders.
fn render_digest(digest: &TicketDigest) -> String {
    let mut out = String::new();

    out.push_str("## Ticket Information\n");
    out.push_str(&format!("- Number: {}\n", digest.number));
    out.push_str(&format!("- Title: {}\n", digest.title));
    out.push_str(&format!("- Customer: {}\n", digest.customer));
    out.push_str(&format!("- State: {}\n", digest.state));
    out.push_str(&format!("- Priority: {}\n", digest.priority));
    out.push_str(&format!("- Queue: {}\n", digest.queue));
    out.push_str(&format!(
        "- Created: {}\n",
        digest.created_at.format("%Y-%m-%d %H:%M UTC")
    ));

    let total = digest.timeline.len();
    if total > 0 {
        out.push_str("\n## Conversation Overview\n");
        out.push_str(&format!(
            "{} message{}: {} from the customer, {} from agents, {} from the system.\n",
            total,
            plural(total),
            digest.customer_messages,
            digest.agent_messages,
            digest.system_messages
        ));
        if let Some(actor) = digest.last_actor {
            out.push_str(&format!("Last activity was by the {}.\n", actor));
        }

        out.push_str("\n## Conversation Flow\n");
        for (i, entry) in digest.timeline.iter().enumerate() {
            let note = if entry.internal { " (internal note)" } else { "" };
            out.push_str(&format!(
                "{}. [{}] {}{}: {}\n",
                i + 1,
                entry.at.format("%Y-%m-%d %H:%M"),
                entry.sender,
                note,
                preview(&entry.body)
            ));
        }
    }

    out.push_str("\n## Analysis\n");
    if digest.open {
        out.push_str("The ticket is still open.\n");
    } else {
        out.push_str("The ticket is closed.\n");
        if let Some(resolution) = digest.resolution {
            out.push_str(&format!(
                "Time to resolution: {}.\n",
                humanize_duration(resolution)
            ));
        }
    }

    if !digest.attachments.is_empty() {
        out.push_str("\n## Attachments\n");
        for att in &digest.attachments {
            out.push_str(&format!(
                "- {} ({}, {} bytes)\n",
                att.filename, att.content_type, att.size_bytes
            ));
        }
    }

    if digest.open {
        out.push_str("\n## Next Steps\n");
        let step = match digest.last_actor {
            Some(SenderRole::Customer) => {
                "The customer replied last; an agent response is due."
            }
            Some(SenderRole::Agent) => {
                "An agent replied last; waiting on the customer or a follow-up."
            }
            _ => "No conversation yet; the ticket awaits a first response.",
        };
        out.push_str(step);
        out.push('\n');
    }

    out.trim_end().to_string()
}

/// Shared states and queues across a batch of tickets.
fn cross_patterns(records: &[Ticket]) -> String {
    let mut states: BTreeMap<String, usize> = BTreeMap::new();
    let mut queues: BTreeMap<String, usize> = BTreeMap::new();
    for t in records {
        *states.entry(t.state.to_string()).or_insert(0) += 1;
        *queues.entry(t.queue.clone()).or_insert(0) += 1;
    }

    let fmt = |map: &BTreeMap<String, usize>| {
        map.iter()
            .map(|(k, v)| format!("{} ({})", k, v))
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "Patterns: states {}; queues {}.",
        fmt(&states),
        fmt(&queues)
    )
}

/// Single-line body preview, truncated on a character boundary.
fn preview(body: &str) -> String {
    let flat = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= BODY_PREVIEW_CHARS {
        flat
    } else {
        let truncated: String = flat.chars().take(BODY_PREVIEW_CHARS).collect();
        format!("{}…", truncated.trim_end())
    }
}

fn humanize_duration(d: Duration) -> String {
    let hours = d.num_hours();
    if hours >= 48 {
        format!("{} days", d.num_days())
    } else if hours >= 1 {
        format!("{} hours", hours)
    } else {
        format!("{} minutes", d.num_minutes().max(0))
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

// =============================================================================
// Tests
// =============================================================================
