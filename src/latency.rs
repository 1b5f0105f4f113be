//! Per-view refresh timings.
//!
//! The view controller reports one sample for every refresh it applies, and
//! bumps a counter for every response it drops as stale or every refresh that
//! fails. `get_rollups` summarizes the recent window for each view.

use std::collections::{BTreeMap, VecDeque};
use std::sync::OnceLock;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;

/// Samples kept per view; older ones fall out of the percentiles.
const SAMPLE_WINDOW: usize = 256;

/// Refreshes slower than this count as over budget.
pub const QUERY_BUDGET: Duration = Duration::from_millis(750);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewLatencyRollup {
    pub view: String,
    pub samples: usize,
    pub p50_ms: u64,
    pub p95_ms: u64,
    pub max_ms: u64,
    pub over_budget: u64,
    /// Responses that arrived after a newer refresh had started.
    pub discarded: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyRollupsPayload {
    pub generated_at: String,
    pub budget_ms: u64,
    /// Sorted by view name.
    pub views: Vec<ViewLatencyRollup>,
}

#[derive(Debug, Default)]
struct ViewTimings {
    recent_ms: VecDeque<u64>,
    over_budget: u64,
    discarded: u64,
    failed: u64,
}

impl ViewTimings {
    fn push(&mut self, elapsed: Duration) {
        if elapsed > QUERY_BUDGET {
            self.over_budget += 1;
        }
        if self.recent_ms.len() == SAMPLE_WINDOW {
            self.recent_ms.pop_front();
        }
        self.recent_ms
            .push_back(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
    }

    fn rollup(&self, view: &str) -> ViewLatencyRollup {
        let mut sorted: Vec<u64> = self.recent_ms.iter().copied().collect();
        sorted.sort_unstable();
        ViewLatencyRollup {
            view: view.to_string(),
            samples: sorted.len(),
            p50_ms: nearest_rank(&sorted, 50),
            p95_ms: nearest_rank(&sorted, 95),
            max_ms: sorted.last().copied().unwrap_or(0),
            over_budget: self.over_budget,
            discarded: self.discarded,
            failed: self.failed,
        }
    }
}

/// Nearest-rank percentile of an ascending slice; zero when empty.
fn nearest_rank(sorted: &[u64], pct: usize) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let rank = (pct * sorted.len()).div_ceil(100);
    sorted[rank.saturating_sub(1).min(sorted.len() - 1)]
}

#[derive(Debug, Default)]
struct TimingLog {
    views: Mutex<BTreeMap<String, ViewTimings>>,
}

impl TimingLog {
    fn with_view(&self, view: &str, update: impl FnOnce(&mut ViewTimings)) {
        let mut views = self.views.lock();
        update(views.entry(view.to_string()).or_default());
    }

    fn rollups(&self) -> LatencyRollupsPayload {
        let views = self.views.lock();
        LatencyRollupsPayload {
            generated_at: Utc::now().to_rfc3339(),
            budget_ms: u64::try_from(QUERY_BUDGET.as_millis()).unwrap_or(u64::MAX),
            views: views
                .iter()
                .map(|(view, timings)| timings.rollup(view))
                .collect(),
        }
    }
}

fn timings() -> &'static TimingLog {
    static LOG: OnceLock<TimingLog> = OnceLock::new();
    LOG.get_or_init(TimingLog::default)
}

/// Record the round trip of an applied refresh.
pub fn record_latency(view: &str, elapsed: Duration) {
    timings().with_view(view, |t| t.push(elapsed));
}

pub fn increment_discarded(view: &str) {
    timings().with_view(view, |t| t.discarded += 1);
}

pub fn increment_failed(view: &str) {
    timings().with_view(view, |t| t.failed += 1);
}

pub fn get_rollups() -> LatencyRollupsPayload {
    timings().rollups()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_nearest_rank() {
        assert_eq!(nearest_rank(&[], 95), 0);
        assert_eq!(nearest_rank(&[10, 20, 30], 50), 20);
        assert_eq!(nearest_rank(&[10, 20, 30], 95), 30);
        assert_eq!(nearest_rank(&[7], 50), 7);
    }

    #[test]
    fn test_window_keeps_most_recent_samples() {
        let mut timings = ViewTimings::default();
        for n in 1..=300 {
            timings.push(ms(n));
        }
        let rollup = timings.rollup("ConversationsView");
        assert_eq!(rollup.samples, SAMPLE_WINDOW);
        assert_eq!(rollup.max_ms, 300);
        // Samples 45..=300 remain.
        assert_eq!(rollup.p50_ms, 172);
    }

    #[test]
    fn test_over_budget_counts_only_slower_refreshes() {
        let mut timings = ViewTimings::default();
        for n in [100, 750, 751, 2_000] {
            timings.push(ms(n));
        }
        assert_eq!(timings.rollup("DashboardView").over_budget, 2);
    }

    #[test]
    fn test_counters_and_ordering() {
        let log = TimingLog::default();
        log.with_view("MeetingsView", |t| t.push(ms(5)));
        log.with_view("AnalysesView", |t| t.discarded += 1);
        log.with_view("AnalysesView", |t| t.discarded += 1);
        log.with_view("AnalysesView", |t| t.failed += 1);

        let payload = log.rollups();
        assert_eq!(payload.budget_ms, 750);
        let names: Vec<&str> = payload.views.iter().map(|v| v.view.as_str()).collect();
        assert_eq!(names, vec!["AnalysesView", "MeetingsView"]);

        let analyses = &payload.views[0];
        assert_eq!(analyses.discarded, 2);
        assert_eq!(analyses.failed, 1);
        assert_eq!(analyses.samples, 0);
        assert_eq!(analyses.p95_ms, 0);
    }
}
