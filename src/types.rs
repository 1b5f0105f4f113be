use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Configuration stored in ~/.callboard/config.json
///
/// Every field has a default so a missing or partial file is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardConfig {
    /// Quiet period before a debounced filter edit is applied.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// "Most recent N" cutoff for the list views.
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
    /// Size of each indicator frequency table.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// IANA zone name used for date windows. System local time when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    /// Record store location. Defaults to ~/.callboard/callboard.db
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<String>,
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_recent_limit() -> usize {
    100
}

fn default_top_k() -> usize {
    5
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            recent_limit: default_recent_limit(),
            top_k: default_top_k(),
            timezone: None,
            database_path: None,
        }
    }
}

/// A row from the `calls` table.
///
/// Store rows arrive keyed by column name; view models serialize camelCase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "snake_case"))]
pub struct CallRecord {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Seconds. `None` means unknown and counts as zero in averages.
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub disconnection_reason: Option<String>,
    #[serde(default)]
    pub recording_url: Option<String>,
    #[serde(default)]
    pub transcript: Option<String>,
    /// Scheduled tour / follow-up meeting. Calendar date, no time component.
    #[serde(default)]
    pub tour_date: Option<NaiveDate>,
}

/// A row from the `call_analysis` table. At most one per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "snake_case"))]
pub struct AnalysisRecord {
    pub id: i64,
    pub call_id: i64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub sentiment_confidence: Option<f64>,
    #[serde(default)]
    pub agent_confidence: Option<f64>,
    #[serde(default)]
    pub alert_status: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub positive_indicators: Option<IndicatorCollection>,
    #[serde(default)]
    pub negative_indicators: Option<IndicatorCollection>,
    #[serde(default)]
    pub buying_signals: Option<IndicatorCollection>,
}

/// The three shapes the analysis pipeline writes indicator fields in.
///
/// Decoding picks the variant from the JSON shape; everything downstream
/// matches on the tag (see `signals::frequency::normalize`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndicatorCollection {
    /// Ordered sequence of labels. Elements that are not strings are kept
    /// and stringified during normalization.
    Labels(Vec<serde_json::Value>),
    /// Named flags; only key presence carries meaning.
    Flags(BTreeMap<String, serde_json::Value>),
    /// A single bare label.
    Label(String),
}

/// User-entered criteria for one view. Empty string = no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    /// Free-text search (name / phone, or summary on the analyses view).
    pub search: String,
    /// Numeric call id search.
    pub call_id: String,
    /// Inclusive lower bound, `YYYY-MM-DD`.
    pub date_from: String,
    /// Inclusive upper bound, `YYYY-MM-DD`.
    pub date_to: String,
    pub sentiment: String,
    pub alert_status: String,
    /// Symbolic window token (`today`, `7d`, ...) for statistics views.
    pub range: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterField {
    Search,
    CallId,
    DateFrom,
    DateTo,
    Sentiment,
    AlertStatus,
    Range,
}

impl FilterField {
    /// Typed fields wait for the quiet period; pickers apply immediately.
    pub fn is_debounced(self) -> bool {
        matches!(self, FilterField::Search | FilterField::CallId)
    }
}

/// One raw edit from the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterEdit {
    pub field: FilterField,
    pub value: String,
}

impl FilterEdit {
    pub fn new(field: FilterField, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}

impl FilterState {
    /// Apply an edit. Returns false when the value did not change, so the
    /// caller can skip a redundant query.
    pub fn apply(&mut self, edit: &FilterEdit) -> bool {
        let slot = match edit.field {
            FilterField::Search => &mut self.search,
            FilterField::CallId => &mut self.call_id,
            FilterField::DateFrom => &mut self.date_from,
            FilterField::DateTo => &mut self.date_to,
            FilterField::Sentiment => &mut self.sentiment,
            FilterField::AlertStatus => &mut self.alert_status,
            FilterField::Range => &mut self.range,
        };
        if *slot == edit.value {
            return false;
        }
        *slot = edit.value.clone();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_from_empty_json() {
        let config: DashboardConfig = serde_json::from_str("{}").expect("parse");
        assert_eq!(config.debounce_ms, 500);
        assert_eq!(config.recent_limit, 100);
        assert_eq!(config.top_k, 5);
        assert!(config.timezone.is_none());
    }

    #[test]
    fn test_indicator_shapes_decode_to_variants() {
        let labels: IndicatorCollection = serde_json::from_str(r#"["a", "b"]"#).unwrap();
        assert!(matches!(labels, IndicatorCollection::Labels(ref v) if v.len() == 2));

        let flags: IndicatorCollection = serde_json::from_str(r#"{"b": true}"#).unwrap();
        assert!(matches!(flags, IndicatorCollection::Flags(ref m) if m.contains_key("b")));

        let label: IndicatorCollection = serde_json::from_str(r#""a""#).unwrap();
        assert_eq!(label, IndicatorCollection::Label("a".to_string()));
    }

    #[test]
    fn test_analysis_decodes_null_indicators() {
        let json = serde_json::json!({
            "id": 1,
            "call_id": 9,
            "created_at": "2026-03-10T12:00:00Z",
            "sentiment": "Positive",
            "positive_indicators": null,
        });
        let analysis: AnalysisRecord = serde_json::from_value(json).unwrap();
        assert_eq!(analysis.call_id, 9);
        assert!(analysis.positive_indicators.is_none());
        assert!(analysis.buying_signals.is_none());
    }

    #[test]
    fn test_filter_apply_reports_change() {
        let mut filter = FilterState::default();
        assert!(filter.apply(&FilterEdit::new(FilterField::Search, "ann")));
        assert!(!filter.apply(&FilterEdit::new(FilterField::Search, "ann")));
        assert_eq!(filter.search, "ann");
    }

    #[test]
    fn test_only_typed_fields_are_debounced() {
        assert!(FilterField::Search.is_debounced());
        assert!(FilterField::CallId.is_debounced());
        assert!(!FilterField::Sentiment.is_debounced());
        assert!(!FilterField::Range.is_debounced());
    }
}
