//! Dashboard cards and the analytics page.
//!
//! Both load every call in the selected date window (no row cutoff) with its
//! analysis and publish one `DerivedStats` computed from that result set,
//! plus a count of tours scheduled inside the same window. They differ only
//! in which range tokens they offer and their default.

use serde_json::Value;

use crate::error::StoreError;
use crate::queries::predicates::{tour_window_query, window_query, StatsScope};
use crate::queries::QueryContext;
use crate::services::conversations::{decode_calls, ConversationEntry};
use crate::services::view::ViewKind;
use crate::signals::{summarize, DerivedStats};
use crate::store::Query;
use crate::types::FilterState;

pub struct StatsView {
    scope: StatsScope,
}

impl StatsView {
    pub fn dashboard() -> Self {
        Self {
            scope: StatsScope::Dashboard,
        }
    }

    pub fn analytics() -> Self {
        Self {
            scope: StatsScope::Analytics,
        }
    }
}

impl ViewKind for StatsView {
    type Entry = ConversationEntry;

    fn name(&self) -> &'static str {
        match self.scope {
            StatsScope::Dashboard => "DashboardView",
            StatsScope::Analytics => "AnalyticsView",
        }
    }

    fn build_query(&self, filter: &FilterState, ctx: &QueryContext) -> Query {
        window_query(self.scope, filter, ctx)
    }

    fn decode(&self, rows: Vec<Value>, _ctx: &QueryContext) -> Result<Vec<ConversationEntry>, StoreError> {
        decode_calls(rows)
    }

    fn entry_id(entry: &ConversationEntry) -> i64 {
        entry.call.id
    }

    fn count_query(&self, filter: &FilterState, ctx: &QueryContext) -> Option<Query> {
        Some(tour_window_query(self.scope, filter, ctx))
    }

    fn summarize(
        &self,
        entries: &[ConversationEntry],
        scheduled_tours: usize,
        top_k: usize,
    ) -> Option<DerivedStats> {
        let rows: Vec<_> = entries
            .iter()
            .map(|e| (&e.call, e.analysis.as_ref()))
            .collect();
        Some(DerivedStats {
            scheduled_tours,
            ..summarize(&rows, top_k)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, NaiveDate};
    use serde_json::json;

    use super::*;
    use crate::db::test_utils::test_store;
    use crate::db::{NewAnalysis, NewCall, SqliteRecordStore};
    use crate::services::view::test_support::{march_10, pinned_clock, settings};
    use crate::services::view::{ViewController, ViewPhase};
    use crate::signals::{LabelCount, Metric};
    use crate::types::{FilterEdit, FilterField, IndicatorCollection};

    /// Ten calls spread over the last seven days, six analyzed (four ok, two
    /// warning), plus one call well outside the window.
    fn seed_week(store: &SqliteRecordStore) {
        let now = march_10();
        store
            .insert_call(&NewCall {
                created_at: now - Duration::days(20),
                duration: Some(999),
                ..Default::default()
            })
            .unwrap();

        for i in 0..10_i64 {
            let created_at = now - Duration::hours(i * 15);
            let call_id = store
                .insert_call(&NewCall {
                    created_at,
                    duration: Some(60),
                    ..Default::default()
                })
                .unwrap();
            if i < 6 {
                let alert = if i < 4 { "ok" } else { "warning" };
                store
                    .insert_analysis(&NewAnalysis {
                        call_id,
                        created_at: created_at + Duration::minutes(5),
                        sentiment: Some("positive".into()),
                        agent_confidence: Some(0.5 + 0.05 * i as f64),
                        alert_status: Some(alert.into()),
                        positive_indicators: Some(if i % 2 == 0 {
                            IndicatorCollection::Labels(vec![json!("a"), json!("b")])
                        } else {
                            IndicatorCollection::Label("b".into())
                        }),
                        ..Default::default()
                    })
                    .unwrap();
            }
        }
    }

    fn controller(view: StatsView, store: SqliteRecordStore) -> ViewController<StatsView> {
        ViewController::new(view, Arc::new(store), settings()).with_clock(pinned_clock(march_10()))
    }

    #[tokio::test]
    async fn test_seven_day_window_end_to_end() {
        let store = test_store();
        seed_week(&store);
        let ctrl = controller(StatsView::dashboard(), store);
        ctrl.apply_edit(&FilterEdit::new(FilterField::Range, "7d"));
        ctrl.refresh().await;

        let model = ctrl.snapshot();
        assert_eq!(model.phase(), ViewPhase::Ready);
        let stats = model.stats.expect("stats published");
        assert_eq!(stats.total, 10);
        assert_eq!(stats.success_count, 4);
        assert_eq!(stats.success_rate, 40.0);
        assert_eq!(stats.success_rate_label(), "40.0%");
        assert_eq!(stats.analyzed_count, 6);
        assert_eq!(stats.average_duration, 60.0);
        match stats.average_confidence {
            Metric::Available(confidence) => assert!((confidence - 0.625).abs() < 1e-9),
            Metric::NotAvailable => panic!("expected an average confidence"),
        }
        assert_eq!(
            stats.top_positive_indicators,
            vec![
                LabelCount {
                    label: "b".into(),
                    count: 6
                },
                LabelCount {
                    label: "a".into(),
                    count: 3
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_dashboard_defaults_to_today() {
        let store = test_store();
        seed_week(&store);
        let ctrl = controller(StatsView::dashboard(), store);
        ctrl.refresh().await;

        // Offsets of 0, 15 hours (00:00 on the 10th) fall on March 10 UTC.
        let stats = ctrl.snapshot().stats.expect("stats");
        assert_eq!(stats.total, 2);
    }

    #[tokio::test]
    async fn test_unsupported_range_falls_back_to_default() {
        let store = test_store();
        seed_week(&store);
        let ctrl = controller(StatsView::dashboard(), store);
        ctrl.apply_edit(&FilterEdit::new(FilterField::Range, "90d"));
        ctrl.refresh().await;
        assert_eq!(ctrl.snapshot().stats.expect("stats").total, 2);
    }

    #[tokio::test]
    async fn test_analytics_defaults_to_all() {
        let store = test_store();
        seed_week(&store);
        let ctrl = controller(StatsView::analytics(), store);
        ctrl.refresh().await;
        let stats = ctrl.snapshot().stats.expect("stats");
        assert_eq!(stats.total, 11);
        assert_eq!(stats.success_count, 4);
    }

    #[tokio::test]
    async fn test_tours_counted_by_calendar_date_in_window() {
        let store = test_store();
        let old = march_10() - Duration::days(40);
        for day in [3, 4, 10, 11] {
            store
                .insert_call(&NewCall {
                    created_at: old,
                    tour_date: NaiveDate::from_ymd_opt(2026, 3, day),
                    ..Default::default()
                })
                .unwrap();
        }
        let ctrl = controller(StatsView::dashboard(), store);

        // Today runs through the whole of March 10, regardless of the clock.
        ctrl.refresh().await;
        let stats = ctrl.snapshot().stats.expect("stats");
        assert_eq!(stats.total, 0);
        assert_eq!(stats.scheduled_tours, 1);

        // 7d covers March 4 through March 10 inclusive.
        ctrl.apply_edit(&FilterEdit::new(FilterField::Range, "7d"));
        ctrl.refresh().await;
        assert_eq!(ctrl.snapshot().stats.expect("stats").scheduled_tours, 2);
    }

    #[tokio::test]
    async fn test_analytics_all_counts_every_tour() {
        let store = test_store();
        seed_week(&store);
        store
            .insert_call(&NewCall {
                created_at: march_10(),
                tour_date: NaiveDate::from_ymd_opt(2027, 1, 2),
                ..Default::default()
            })
            .unwrap();
        let ctrl = controller(StatsView::analytics(), store);
        ctrl.refresh().await;
        let stats = ctrl.snapshot().stats.expect("stats");
        assert_eq!(stats.total, 12);
        assert_eq!(stats.scheduled_tours, 1);
    }

    #[tokio::test]
    async fn test_empty_window_publishes_zeroed_stats() {
        let ctrl = controller(StatsView::analytics(), test_store());
        ctrl.apply_edit(&FilterEdit::new(FilterField::Range, "30d"));
        ctrl.refresh().await;
        let model = ctrl.snapshot();
        assert_eq!(model.phase(), ViewPhase::Empty);
        let stats = model.stats.expect("stats");
        assert_eq!(stats.total, 0);
        assert_eq!(stats.success_rate, 0.0);
        assert_eq!(stats.average_confidence, Metric::NotAvailable);
    }
}
