//! Rollup statistics over one filtered result set.
//!
//! Everything in `DerivedStats` is computed from the same slice in a single
//! pass, so a published value never mixes two windows. Every ratio has an
//! explicit fallback for an empty input.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::signals::classify::{is_successful, CallOutcome, Sentiment};
use crate::signals::frequency::{top_labels, LabelCount};
use crate::types::{AnalysisRecord, CallRecord};

/// A mean that may have no inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric {
    Available(f64),
    NotAvailable,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Available(v) => write!(f, "{:.1}%", v * 100.0),
            Metric::NotAvailable => f.write_str("not available"),
        }
    }
}

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Metric::Available(v) => serializer.serialize_f64(*v),
            Metric::NotAvailable => serializer.serialize_str("not available"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentBreakdown {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
    pub unknown: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedStats {
    pub total: usize,
    /// Seconds; unknown durations count as zero.
    pub average_duration: f64,
    pub success_count: usize,
    /// Percentage, 0..=100, full precision.
    pub success_rate: f64,
    /// Mean agent confidence over analyses that report one.
    pub average_confidence: Metric,
    pub analyzed_count: usize,
    pub missed_count: usize,
    pub sentiment: SentimentBreakdown,
    pub top_positive_indicators: Vec<LabelCount>,
    pub top_negative_indicators: Vec<LabelCount>,
    pub top_buying_signals: Vec<LabelCount>,
    /// Calls whose tour date falls in the window, whenever they were made.
    /// `summarize` leaves it at zero; the stats views fill it in.
    pub scheduled_tours: usize,
}

impl DerivedStats {
    /// Success rate as shown on the cards, one decimal place.
    pub fn success_rate_label(&self) -> String {
        format!("{:.1}%", self.success_rate)
    }

    /// Average duration as `m:ss`.
    pub fn average_duration_label(&self) -> String {
        let secs = self.average_duration.round() as u64;
        format!("{}:{:02}", secs / 60, secs % 60)
    }
}

pub fn average_duration(durations: &[Option<u32>]) -> f64 {
    if durations.is_empty() {
        return 0.0;
    }
    let sum: u64 = durations.iter().map(|d| u64::from(d.unwrap_or(0))).sum();
    sum as f64 / durations.len() as f64
}

pub fn success_rate(successful: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    successful as f64 / total as f64 * 100.0
}

/// Mean of the scores that are present. Non-finite scores are skipped.
pub fn average_confidence<I>(scores: I) -> Metric
where
    I: IntoIterator<Item = Option<f64>>,
{
    let (sum, n) = scores
        .into_iter()
        .flatten()
        .filter(|s| s.is_finite())
        .fold((0.0_f64, 0_usize), |(sum, n), s| (sum + s, n + 1));
    if n == 0 {
        Metric::NotAvailable
    } else {
        Metric::Available(sum / n as f64)
    }
}

/// Summarize calls joined with their (optional) analyses.
pub fn summarize(rows: &[(&CallRecord, Option<&AnalysisRecord>)], top_k: usize) -> DerivedStats {
    let total = rows.len();
    let durations: Vec<Option<u32>> = rows.iter().map(|(call, _)| call.duration).collect();
    let success_count = rows.iter().filter(|(_, a)| is_successful(*a)).count();
    let analyses: Vec<&AnalysisRecord> = rows.iter().filter_map(|(_, a)| *a).collect();

    let missed_count = rows
        .iter()
        .filter(|(call, _)| {
            CallOutcome::classify(call.disconnection_reason.as_deref()) == CallOutcome::Missed
        })
        .count();

    let mut sentiment = SentimentBreakdown::default();
    for (_, analysis) in rows {
        match Sentiment::classify(analysis.and_then(|a| a.sentiment.as_deref())) {
            Sentiment::Positive => sentiment.positive += 1,
            Sentiment::Neutral => sentiment.neutral += 1,
            Sentiment::Negative => sentiment.negative += 1,
            Sentiment::Unknown => sentiment.unknown += 1,
        }
    }

    DerivedStats {
        total,
        average_duration: average_duration(&durations),
        success_count,
        success_rate: success_rate(success_count, total),
        average_confidence: average_confidence(analyses.iter().map(|a| a.agent_confidence)),
        analyzed_count: analyses.len(),
        missed_count,
        sentiment,
        top_positive_indicators: top_labels(
            analyses.iter().map(|a| a.positive_indicators.as_ref()),
            top_k,
        ),
        top_negative_indicators: top_labels(
            analyses.iter().map(|a| a.negative_indicators.as_ref()),
            top_k,
        ),
        top_buying_signals: top_labels(analyses.iter().map(|a| a.buying_signals.as_ref()), top_k),
        scheduled_tours: 0,
    }
}
