//! Scheduled tours booked on calls, soonest first.

use serde::Serialize;
use serde_json::Value;

use crate::error::StoreError;
use crate::queries::predicates::meetings_query;
use crate::queries::QueryContext;
use crate::services::view::{decode_row, ViewKind};
use crate::signals::CallOutcome;
use crate::store::Query;
use crate::types::{CallRecord, FilterState};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingEntry {
    #[serde(flatten)]
    pub call: CallRecord,
    pub outcome: CallOutcome,
    /// Calendar days from today (in the configured zone) to the tour.
    /// Negative once the tour date has passed.
    pub days_until: Option<i64>,
}

pub struct MeetingsView;

impl ViewKind for MeetingsView {
    type Entry = MeetingEntry;

    fn name(&self) -> &'static str {
        "MeetingsView"
    }

    fn build_query(&self, filter: &FilterState, ctx: &QueryContext) -> Query {
        meetings_query(filter, ctx)
    }

    fn decode(&self, rows: Vec<Value>, ctx: &QueryContext) -> Result<Vec<MeetingEntry>, StoreError> {
        let today = ctx.zone.today(ctx.now);
        rows.into_iter()
            .map(|row| {
                let call: CallRecord = decode_row(row)?;
                Ok(MeetingEntry {
                    outcome: CallOutcome::classify(call.disconnection_reason.as_deref()),
                    days_until: call.tour_date.map(|d| (d - today).num_days()),
                    call,
                })
            })
            .collect()
    }

    fn entry_id(entry: &MeetingEntry) -> i64 {
        entry.call.id
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, NaiveDate};

    use super::*;
    use crate::db::test_utils::test_store;
    use crate::db::NewCall;
    use crate::services::view::test_support::{march_10, pinned_clock, settings};
    use crate::services::view::ViewController;
    use crate::types::{FilterEdit, FilterField};

    fn tour(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[tokio::test]
    async fn test_only_calls_with_tours_soonest_first() {
        let store = test_store();
        let now = march_10();
        let later = store
            .insert_call(&NewCall {
                created_at: now - Duration::days(3),
                name: Some("Rosa Diaz".into()),
                tour_date: tour(2026, 3, 20),
                ..Default::default()
            })
            .unwrap();
        store
            .insert_call(&NewCall {
                created_at: now - Duration::days(2),
                name: Some("No tour".into()),
                ..Default::default()
            })
            .unwrap();
        let sooner = store
            .insert_call(&NewCall {
                created_at: now - Duration::days(1),
                name: Some("Kai Moreno".into()),
                tour_date: tour(2026, 3, 8),
                ..Default::default()
            })
            .unwrap();

        let ctrl = ViewController::new(MeetingsView, Arc::new(store), settings())
            .with_clock(pinned_clock(now));
        ctrl.refresh().await;
        let model = ctrl.snapshot();
        let ids: Vec<i64> = model.records.iter().map(|e| e.call.id).collect();
        assert_eq!(ids, vec![sooner, later]);
        assert_eq!(model.records[0].days_until, Some(-2));
        assert_eq!(model.records[1].days_until, Some(10));
        assert!(model.stats.is_none());

        // Tour dates are bounded as calendar dates, inclusive on both ends.
        ctrl.apply_edit(&FilterEdit::new(FilterField::DateFrom, "2026-03-20"));
        ctrl.apply_edit(&FilterEdit::new(FilterField::DateTo, "2026-03-20"));
        ctrl.refresh().await;
        let ids: Vec<i64> = ctrl.snapshot().records.iter().map(|e| e.call.id).collect();
        assert_eq!(ids, vec![later]);

        ctrl.apply_edit(&FilterEdit::new(FilterField::DateFrom, "bogus"));
        ctrl.apply_edit(&FilterEdit::new(FilterField::DateTo, ""));
        ctrl.apply_edit(&FilterEdit::new(FilterField::Search, "kai"));
        ctrl.refresh().await;
        let ids: Vec<i64> = ctrl.snapshot().records.iter().map(|e| e.call.id).collect();
        assert_eq!(ids, vec![sooner]);
    }
}
