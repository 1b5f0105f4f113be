//! Query construction: date windows and per-view predicate builders.

pub mod predicates;
pub mod window;

use chrono::{DateTime, Utc};

use crate::queries::window::Zone;

/// Everything besides the filter that shapes a query.
#[derive(Debug, Clone, Copy)]
pub struct QueryContext {
    pub zone: Zone,
    /// Instant the query is built at; rolling windows end here.
    pub now: DateTime<Utc>,
    /// "Most recent N" cutoff for list views.
    pub recent_limit: usize,
}
