//! Per-record classification and result-set rollups.

pub mod classify;
pub mod frequency;
pub mod stats;

pub use classify::{is_successful, AlertStatus, CallOutcome, Sentiment};
pub use frequency::{normalize, top_labels, LabelCount, TOP_K};
pub use stats::{summarize, DerivedStats, Metric, SentimentBreakdown};
