//! Result pagination and listing rendering.
//!
//! Decides how much of a result set one turn surfaces, how to resume later,
//! and renders the visible slice with an explicit continuation invitation
//! while more remains.

use triage_core::types::Ticket;

use crate::planner::QueryPlan;

/// One visible window into a result set.
#[derive(Debug)]
pub struct Page<'a> {
    /// Records visible this turn.
    pub slice: &'a [Ticket],
    /// Index of the first visible record.
    pub start: usize,
    /// Cursor to store for the next continuation.
    pub next_offset: usize,
    /// Records left after this page.
    pub remaining: usize,
    /// Total records in the set.
    pub total: usize,
}

/// Slices result sets into pages and renders them.
pub struct Paginator {
    /// Page size for general listings.
    pub page_size: usize,
    /// Page size for identifier-only listings (identifiers are compact).
    pub id_page_size: usize,
}

impl Default for Paginator {
    fn default() -> Self {
        Self {
            page_size: 20,
            id_page_size: 50,
        }
    }
}

impl Paginator {
    pub fn new(page_size: usize, id_page_size: usize) -> Self {
        Self {
            page_size,
            id_page_size,
        }
    }

    /// The page size a plan calls for.
    pub fn page_size_for(&self, plan: &QueryPlan) -> usize {
        if plan.is_id_listing() {
            self.id_page_size
        } else {
            self.page_size
        }
    }

    /// Slice `records` starting at `offset`.
    ///
    /// An offset at or past the end yields an empty slice with zero
    /// remaining; the cursor never moves backwards.
    pub fn page<'a>(&self, records: &'a [Ticket], offset: usize, page_size: usize) -> Page<'a> {
        let total = records.len();
        let start = offset.min(total);
        let end = (start + page_size.max(1)).min(total);
        Page {
            slice: &records[start..end],
            start,
            next_offset: end,
            remaining: total - end,
            total,
        }
    }

    /// Render a page as response text.
    pub fn render(&self, page: &Page<'_>, plan: &QueryPlan) -> String {
        if page.total == 0 {
            return format!(
                "No tickets matched ({}). Try a different filter, or ask for \
                 'all tickets' to see everything.",
                plan.explanation
            );
        }

        if page.slice.is_empty() {
            return format!("All {} results have already been shown.", page.total);
        }

        let mut out = String::new();
        if page.start == 0 {
            out.push_str(&format!(
                "Found {} ticket{} ({}). Showing {}-{}:\n",
                page.total,
                plural(page.total),
                plan.explanation,
                page.start + 1,
                page.next_offset
            ));
        } else {
            out.push_str(&format!(
                "Showing {}-{} of {}:\n",
                page.start + 1,
                page.next_offset,
                page.total
            ));
        }

        if plan.is_id_listing() {
            let numbers: Vec<&str> = page.slice.iter().map(|t| t.number.as_str()).collect();
            out.push_str(&numbers.join(", "));
        } else {
            for ticket in page.slice {
                out.push_str(&format!(
                    "- #{} [{}] {} ({})\n",
                    ticket.number, ticket.state, ticket.title, ticket.customer
                ));
            }
        }

        let out = out.trim_end().to_string();
        if page.remaining > 0 {
            format!(
                "{}\n\n{} more available. Say 'see more' to continue.",
                out, page.remaining
            )
        } else if page.start > 0 {
            format!("{}\n\nThat's all {} results.", out, page.total)
        } else {
            out
        }
    }

    /// Guidance when a continuation arrives with nothing cached.
    ///
    /// The router screens for this before the paginator runs, but the
    /// paginator answers sensibly on its own too.
    pub fn nothing_to_continue(&self) -> String {
        "There are no previous results to continue from. Ask for a listing first, \
         e.g. 'list all tickets'."
            .to_string()
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
