//! Data-store collaborator for Triage.
//!
//! Defines the filter/options query language the engine speaks, the
//! [`TicketStore`] trait the engine consumes, and an in-memory reference
//! implementation used by the binary and the tests. The engine treats the
//! store as an external collaborator: calls may fail and results are
//! read-only.

pub mod filter;
pub mod memory;
pub mod store;

pub use filter::{Condition, Filter, QueryOptions, Sort, SortOrder};
pub use memory::MemoryTicketStore;
pub use store::{StoreError, TicketStore};
