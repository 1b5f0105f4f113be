//! Record store seam.
//!
//! Views describe what they need as a `Query`; a `RecordStore` executes it and
//! hands back JSON rows keyed by column name. Related rows requested with
//! `embed` arrive nested under the related table's key (`analysis` / `call`),
//! or `null` when there is no match.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Calls,
    Analyses,
}

impl Table {
    /// Key an embedded row of this table is nested under.
    pub fn embed_key(self) -> &'static str {
        match self {
            Table::Calls => "call",
            Table::Analyses => "analysis",
        }
    }
}

/// Every column a predicate or ordering may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    CallId,
    CallCreatedAt,
    PhoneNumber,
    Name,
    Duration,
    DisconnectionReason,
    TourDate,
    AnalysisId,
    AnalysisCallId,
    AnalysisCreatedAt,
    Sentiment,
    AlertStatus,
    Summary,
}

impl Field {
    pub fn table(self) -> Table {
        match self {
            Field::CallId
            | Field::CallCreatedAt
            | Field::PhoneNumber
            | Field::Name
            | Field::Duration
            | Field::DisconnectionReason
            | Field::TourDate => Table::Calls,
            Field::AnalysisId
            | Field::AnalysisCallId
            | Field::AnalysisCreatedAt
            | Field::Sentiment
            | Field::AlertStatus
            | Field::Summary => Table::Analyses,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Field::CallId | Field::AnalysisId => "id",
            Field::CallCreatedAt | Field::AnalysisCreatedAt => "created_at",
            Field::PhoneNumber => "phone_number",
            Field::Name => "name",
            Field::Duration => "duration",
            Field::DisconnectionReason => "disconnection_reason",
            Field::TourDate => "tour_date",
            Field::AnalysisCallId => "call_id",
            Field::Sentiment => "sentiment",
            Field::AlertStatus => "alert_status",
            Field::Summary => "summary",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FilterValue {
    Int(i64),
    Text(String),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    Eq { field: Field, value: FilterValue },
    Gte { field: Field, value: FilterValue },
    Lte { field: Field, value: FilterValue },
    /// Categorical match that ignores case and surrounding whitespace in the
    /// stored value. `label` is expected lower-case.
    LabelIs { field: Field, label: String },
    /// Case-insensitive substring match.
    Ilike { field: Field, needle: String },
    NotNull { field: Field },
    /// Disjunction; matches when any inner predicate matches.
    AnyOf { predicates: Vec<Predicate> },
}

impl Predicate {
    /// True if this predicate (or any nested one) constrains `field`.
    pub fn references(&self, field: Field) -> bool {
        match self {
            Predicate::Eq { field: f, .. }
            | Predicate::Gte { field: f, .. }
            | Predicate::Lte { field: f, .. }
            | Predicate::LabelIs { field: f, .. }
            | Predicate::Ilike { field: f, .. }
            | Predicate::NotNull { field: f } => *f == field,
            Predicate::AnyOf { predicates } => predicates.iter().any(|p| p.references(field)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderBy {
    pub field: Field,
    pub direction: Direction,
}

/// `select → embed? → filter* → order → limit?`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub source: Table,
    pub embed: Option<Table>,
    pub predicates: Vec<Predicate>,
    pub order: OrderBy,
    pub limit: Option<usize>,
}

impl Query {
    /// Start a query over `source`, newest-first by its id until reordered.
    pub fn select(source: Table) -> Self {
        let id = match source {
            Table::Calls => Field::CallId,
            Table::Analyses => Field::AnalysisId,
        };
        Self {
            source,
            embed: None,
            predicates: Vec::new(),
            order: OrderBy {
                field: id,
                direction: Direction::Desc,
            },
            limit: None,
        }
    }

    pub fn embed(mut self, related: Table) -> Self {
        self.embed = Some(related);
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Append a predicate only when one was produced.
    pub fn filter_opt(self, predicate: Option<Predicate>) -> Self {
        match predicate {
            Some(p) => self.filter(p),
            None => self,
        }
    }

    pub fn order(mut self, field: Field, direction: Direction) -> Self {
        self.order = OrderBy { field, direction };
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn constrains(&self, field: Field) -> bool {
        self.predicates.iter().any(|p| p.references(field))
    }
}

/// A queryable record collection.
///
/// Errors are opaque; callers surface them and never retry on their own.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn execute(&self, query: &Query) -> Result<Vec<serde_json::Value>, StoreError>;
}
