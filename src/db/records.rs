//! Write path for call and analysis rows.
//!
//! The dashboard itself only reads; these are used by the ingest side and
//! by tests that seed a store.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::params;

use super::sql::format_timestamp;
use super::SqliteRecordStore;
use crate::error::StoreError;
use crate::types::IndicatorCollection;

/// A call to insert. The store assigns the id.
#[derive(Debug, Clone, Default)]
pub struct NewCall {
    pub created_at: DateTime<Utc>,
    pub phone_number: Option<String>,
    pub name: Option<String>,
    pub duration: Option<u32>,
    pub disconnection_reason: Option<String>,
    pub recording_url: Option<String>,
    pub transcript: Option<String>,
    pub tour_date: Option<NaiveDate>,
}

/// An analysis to attach to an existing call.
#[derive(Debug, Clone, Default)]
pub struct NewAnalysis {
    pub call_id: i64,
    pub created_at: DateTime<Utc>,
    pub sentiment: Option<String>,
    pub sentiment_confidence: Option<f64>,
    pub agent_confidence: Option<f64>,
    pub alert_status: Option<String>,
    pub summary: Option<String>,
    pub positive_indicators: Option<IndicatorCollection>,
    pub negative_indicators: Option<IndicatorCollection>,
    pub buying_signals: Option<IndicatorCollection>,
}

fn indicator_json(value: &Option<IndicatorCollection>) -> Result<Option<String>, StoreError> {
    value
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(StoreError::from)
}

impl SqliteRecordStore {
    pub fn insert_call(&self, call: &NewCall) -> Result<i64, StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO calls (created_at, phone_number, name, duration,
                                disconnection_reason, recording_url, transcript, tour_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                format_timestamp(call.created_at),
                call.phone_number,
                call.name,
                call.duration,
                call.disconnection_reason,
                call.recording_url,
                call.transcript,
                call.tour_date.map(|d| d.format("%Y-%m-%d").to_string()),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Fails if the call already has an analysis.
    pub fn insert_analysis(&self, analysis: &NewAnalysis) -> Result<i64, StoreError> {
        let positive = indicator_json(&analysis.positive_indicators)?;
        let negative = indicator_json(&analysis.negative_indicators)?;
        let buying = indicator_json(&analysis.buying_signals)?;

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO call_analysis (call_id, created_at, sentiment, sentiment_confidence,
                                        agent_confidence, alert_status, summary,
                                        positive_indicators, negative_indicators, buying_signals)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                analysis.call_id,
                format_timestamp(analysis.created_at),
                analysis.sentiment,
                analysis.sentiment_confidence,
                analysis.agent_confidence,
                analysis.alert_status,
                analysis.summary,
                positive,
                negative,
                buying,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }
}
