//! Analyses list: recent call analyses with their calls and normalized
//! indicator labels.

use serde::Serialize;
use serde_json::Value;

use crate::error::StoreError;
use crate::queries::predicates::analyses_query;
use crate::queries::QueryContext;
use crate::services::view::{decode_row, take_embedded, ViewKind};
use crate::signals::{normalize, AlertStatus, Sentiment};
use crate::store::{Query, Table};
use crate::types::{AnalysisRecord, CallRecord, FilterState};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisEntry {
    #[serde(flatten)]
    pub analysis: AnalysisRecord,
    pub call: Option<CallRecord>,
    pub sentiment_class: Sentiment,
    pub alert_class: AlertStatus,
    pub positive_labels: Vec<String>,
    pub negative_labels: Vec<String>,
    pub buying_signal_labels: Vec<String>,
}

impl AnalysisEntry {
    pub fn new(analysis: AnalysisRecord, call: Option<CallRecord>) -> Self {
        Self {
            sentiment_class: Sentiment::classify(analysis.sentiment.as_deref()),
            alert_class: AlertStatus::classify(analysis.alert_status.as_deref()),
            positive_labels: normalize(analysis.positive_indicators.as_ref()),
            negative_labels: normalize(analysis.negative_indicators.as_ref()),
            buying_signal_labels: normalize(analysis.buying_signals.as_ref()),
            analysis,
            call,
        }
    }
}

pub struct AnalysesView;

impl ViewKind for AnalysesView {
    type Entry = AnalysisEntry;

    fn name(&self) -> &'static str {
        "AnalysesView"
    }

    fn build_query(&self, filter: &FilterState, ctx: &QueryContext) -> Query {
        analyses_query(filter, ctx)
    }

    fn decode(&self, rows: Vec<Value>, _ctx: &QueryContext) -> Result<Vec<AnalysisEntry>, StoreError> {
        rows.into_iter()
            .map(|mut row| {
                let call = take_embedded(&mut row, Table::Calls.embed_key())?;
                Ok(AnalysisEntry::new(decode_row(row)?, call))
            })
            .collect()
    }

    fn entry_id(entry: &AnalysisEntry) -> i64 {
        entry.analysis.id
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use serde_json::json;

    use super::*;
    use crate::db::test_utils::{exec_sql, test_store};
    use crate::db::{NewAnalysis, NewCall, SqliteRecordStore};
    use crate::services::view::test_support::{march_10, pinned_clock, settings};
    use crate::services::view::{ViewController, ViewPhase};
    use crate::types::{FilterEdit, FilterField, IndicatorCollection};

    fn seed(store: &SqliteRecordStore) -> (i64, i64) {
        let now = march_10();
        let first = store
            .insert_call(&NewCall {
                created_at: now - Duration::hours(4),
                name: Some("Priya Nair".into()),
                ..Default::default()
            })
            .unwrap();
        let second = store
            .insert_call(&NewCall {
                created_at: now - Duration::hours(3),
                ..Default::default()
            })
            .unwrap();
        store
            .insert_analysis(&NewAnalysis {
                call_id: first,
                created_at: now - Duration::hours(2),
                sentiment: Some("positive".into()),
                alert_status: Some("ok".into()),
                summary: Some("Caller confirmed a Saturday tour".into()),
                buying_signals: Some(IndicatorCollection::Flags(
                    [("asked_price".to_string(), json!(true))].into_iter().collect(),
                )),
                ..Default::default()
            })
            .unwrap();
        store
            .insert_analysis(&NewAnalysis {
                call_id: second,
                created_at: now - Duration::hours(1),
                sentiment: Some("negative".into()),
                alert_status: Some("error".into()),
                summary: Some("Hung up during greeting".into()),
                negative_indicators: Some(IndicatorCollection::Label("rushed".into())),
                ..Default::default()
            })
            .unwrap();
        (first, second)
    }

    #[tokio::test]
    async fn test_categorical_and_summary_filters() {
        let store = test_store();
        let (first, second) = seed(&store);
        let ctrl = ViewController::new(AnalysesView, Arc::new(store), settings())
            .with_clock(pinned_clock(march_10()));

        ctrl.refresh().await;
        let calls: Vec<i64> = ctrl
            .snapshot()
            .records
            .iter()
            .map(|e| e.analysis.call_id)
            .collect();
        assert_eq!(calls, vec![second, first]);

        ctrl.apply_edit(&FilterEdit::new(FilterField::Sentiment, "Positive"));
        ctrl.refresh().await;
        let model = ctrl.snapshot();
        assert_eq!(model.records.len(), 1);
        let entry = &model.records[0];
        assert_eq!(entry.analysis.call_id, first);
        assert_eq!(entry.buying_signal_labels, vec!["asked_price".to_string()]);
        assert_eq!(
            entry.call.as_ref().and_then(|c| c.name.as_deref()),
            Some("Priya Nair")
        );

        ctrl.apply_edit(&FilterEdit::new(FilterField::Sentiment, ""));
        ctrl.apply_edit(&FilterEdit::new(FilterField::Search, "GREETING"));
        ctrl.refresh().await;
        let model = ctrl.snapshot();
        assert_eq!(model.records.len(), 1);
        assert_eq!(model.records[0].negative_labels, vec!["rushed".to_string()]);
        assert_eq!(model.records[0].alert_class, AlertStatus::Error);
    }

    #[tokio::test]
    async fn test_call_id_filter_uses_analysis_foreign_key() {
        let store = test_store();
        let (first, _) = seed(&store);
        let ctrl = ViewController::new(AnalysesView, Arc::new(store), settings())
            .with_clock(pinned_clock(march_10()));
        ctrl.apply_edit(&FilterEdit::new(FilterField::CallId, format!(" {first} ")));
        ctrl.refresh().await;
        let model = ctrl.snapshot();
        assert_eq!(model.records.len(), 1);
        assert_eq!(model.records[0].analysis.call_id, first);
    }

    #[tokio::test]
    async fn test_mixed_case_stored_labels_match_picker_values() {
        let store = test_store();
        let now = march_10();
        let call_id = store
            .insert_call(&NewCall {
                created_at: now - Duration::hours(1),
                ..Default::default()
            })
            .unwrap();
        store
            .insert_analysis(&NewAnalysis {
                call_id,
                created_at: now,
                sentiment: Some("Positive ".into()),
                alert_status: Some("OK".into()),
                ..Default::default()
            })
            .unwrap();
        let ctrl = ViewController::new(AnalysesView, Arc::new(store), settings())
            .with_clock(pinned_clock(now));

        ctrl.apply_edit(&FilterEdit::new(FilterField::Sentiment, "positive"));
        ctrl.refresh().await;
        let model = ctrl.snapshot();
        assert_eq!(model.records.len(), 1);
        assert_eq!(model.records[0].sentiment_class, Sentiment::Positive);

        ctrl.apply_edit(&FilterEdit::new(FilterField::AlertStatus, "ok"));
        ctrl.refresh().await;
        let model = ctrl.snapshot();
        assert_eq!(model.records.len(), 1);
        assert_eq!(model.records[0].alert_class, AlertStatus::Ok);
    }

    #[tokio::test]
    async fn test_scalar_legacy_indicators_do_not_fail_the_view() {
        let store = test_store();
        let (first, _) = seed(&store);
        exec_sql(
            &store,
            &format!("UPDATE call_analysis SET buying_signals = '2024' WHERE call_id = {first}"),
        );
        let ctrl = ViewController::new(AnalysesView, Arc::new(store), settings())
            .with_clock(pinned_clock(march_10()));
        ctrl.refresh().await;

        let model = ctrl.snapshot();
        assert_eq!(model.phase(), ViewPhase::Ready);
        assert_eq!(model.records.len(), 2);
        let entry = model
            .records
            .iter()
            .find(|e| e.analysis.call_id == first)
            .expect("first analysis");
        assert_eq!(entry.buying_signal_labels, vec!["2024".to_string()]);
    }
}
