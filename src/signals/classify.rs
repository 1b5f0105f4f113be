//! Status classification for calls and analyses.
//!
//! Pure and total: every input, including null and the empty string, maps to
//! exactly one class. Unrecognized labels become `Unknown` and never fail a
//! query or an aggregation.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::types::AnalysisRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
    Unknown,
}

impl Sentiment {
    pub fn classify(label: Option<&str>) -> Self {
        match normalized(label).as_deref() {
            Some("positive") => Sentiment::Positive,
            Some("neutral") => Sentiment::Neutral,
            Some("negative") => Sentiment::Negative,
            _ => Sentiment::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Ok,
    Warning,
    Error,
    Unknown,
}

impl AlertStatus {
    pub fn classify(label: Option<&str>) -> Self {
        match normalized(label).as_deref() {
            Some("ok") => AlertStatus::Ok,
            Some("warning") => AlertStatus::Warning,
            Some("error") => AlertStatus::Error,
            _ => AlertStatus::Unknown,
        }
    }

    /// Warning and error are the only statuses that disqualify a call.
    pub fn is_failure(self) -> bool {
        matches!(self, AlertStatus::Warning | AlertStatus::Error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CallOutcome {
    Completed,
    Missed,
}

fn missed_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)missed|no-answer|failed").expect("missed-call regex should compile")
    })
}

impl CallOutcome {
    /// Derive the outcome from the disconnection reason. No reason means
    /// nothing went wrong.
    pub fn classify(disconnection_reason: Option<&str>) -> Self {
        match disconnection_reason {
            Some(reason) if missed_pattern().is_match(reason) => CallOutcome::Missed,
            _ => CallOutcome::Completed,
        }
    }
}

/// A call counts as successful only once it has been analyzed and the
/// analysis raised no warning or error. Unanalyzed calls are not successes.
pub fn is_successful(analysis: Option<&AnalysisRecord>) -> bool {
    analysis.is_some_and(|a| !AlertStatus::classify(a.alert_status.as_deref()).is_failure())
}

fn normalized(label: Option<&str>) -> Option<String> {
    label.map(|l| l.trim().to_lowercase())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn analysis(alert: Option<&str>) -> AnalysisRecord {
        AnalysisRecord {
            id: 1,
            call_id: 1,
            created_at: Utc::now(),
            sentiment: None,
            sentiment_confidence: None,
            agent_confidence: None,
            alert_status: alert.map(str::to_string),
            summary: None,
            positive_indicators: None,
            negative_indicators: None,
            buying_signals: None,
        }
    }

    #[test]
    fn test_outcome_classification() {
        assert_eq!(CallOutcome::classify(None), CallOutcome::Completed);
        assert_eq!(CallOutcome::classify(Some("")), CallOutcome::Completed);
        assert_eq!(
            CallOutcome::classify(Some("Customer requested no-answer retry")),
            CallOutcome::Missed
        );
        assert_eq!(CallOutcome::classify(Some("dial_FAILED")), CallOutcome::Missed);
        assert_eq!(CallOutcome::classify(Some("Missed call")), CallOutcome::Missed);
        assert_eq!(
            CallOutcome::classify(Some("user_hangup")),
            CallOutcome::Completed
        );
    }

    #[test]
    fn test_sentiment_is_case_insensitive_with_unknown_fallback() {
        assert_eq!(Sentiment::classify(Some("Positive")), Sentiment::Positive);
        assert_eq!(Sentiment::classify(Some(" NEGATIVE ")), Sentiment::Negative);
        assert_eq!(Sentiment::classify(Some("neutral")), Sentiment::Neutral);
        assert_eq!(Sentiment::classify(Some("ecstatic")), Sentiment::Unknown);
        assert_eq!(Sentiment::classify(None), Sentiment::Unknown);
    }

    #[test]
    fn test_alert_status_classification() {
        assert_eq!(AlertStatus::classify(Some("OK")), AlertStatus::Ok);
        assert_eq!(AlertStatus::classify(Some("Warning")), AlertStatus::Warning);
        assert_eq!(AlertStatus::classify(Some("error")), AlertStatus::Error);
        assert_eq!(AlertStatus::classify(Some("")), AlertStatus::Unknown);
        assert_eq!(AlertStatus::classify(None), AlertStatus::Unknown);
    }

    #[test]
    fn test_success_requires_analysis_without_alert() {
        assert!(!is_successful(None));
        assert!(is_successful(Some(&analysis(Some("ok")))));
        assert!(is_successful(Some(&analysis(None))));
        assert!(is_successful(Some(&analysis(Some("pending")))));
        assert!(!is_successful(Some(&analysis(Some("warning")))));
        assert!(!is_successful(Some(&analysis(Some("ERROR")))));
    }
}
