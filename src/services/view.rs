//! Generic view controller: filter state, query dispatch, stale-result guard.
//!
//! Every refresh takes the next generation number before the store call is
//! issued. When the store answers, the result is applied only if no newer
//! refresh has started in the meantime; otherwise it is dropped. The
//! published `ViewModel` therefore always reflects the latest filter the user
//! set, regardless of the order responses arrive in.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::StoreError;
use crate::expansion::ExpansionTracker;
use crate::latency;
use crate::queries::window::Zone;
use crate::queries::QueryContext;
use crate::signals::DerivedStats;
use crate::store::{Query, RecordStore};
use crate::types::{DashboardConfig, FilterEdit, FilterState};

/// Source of "now" for window computation.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// What a concrete view contributes: its query, its row shape, and whether
/// it publishes rollup statistics.
pub trait ViewKind: Send + Sync + 'static {
    type Entry: Serialize + Clone + Send + Sync + 'static;

    /// Used as the log prefix and the latency rollup key.
    fn name(&self) -> &'static str;

    fn build_query(&self, filter: &FilterState, ctx: &QueryContext) -> Query;

    fn decode(&self, rows: Vec<Value>, ctx: &QueryContext) -> Result<Vec<Self::Entry>, StoreError>;

    /// Key the detail expansion tracks.
    fn entry_id(entry: &Self::Entry) -> i64;

    /// Secondary query run alongside the main one; only its row count is
    /// kept, and it is handed to `summarize`.
    fn count_query(&self, _filter: &FilterState, _ctx: &QueryContext) -> Option<Query> {
        None
    }

    fn summarize(
        &self,
        _entries: &[Self::Entry],
        _counted: usize,
        _top_k: usize,
    ) -> Option<DerivedStats> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewPhase {
    Loading,
    Failed,
    Empty,
    Ready,
}

/// What the presentation layer renders for one view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewModel<E> {
    pub records: Vec<E>,
    pub stats: Option<DerivedStats>,
    pub loading: bool,
    pub error: Option<String>,
    pub expanded: Option<i64>,
}

impl<E> Default for ViewModel<E> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            stats: None,
            loading: false,
            error: None,
            expanded: None,
        }
    }
}

impl<E> ViewModel<E> {
    pub fn phase(&self) -> ViewPhase {
        if self.loading {
            ViewPhase::Loading
        } else if self.error.is_some() {
            ViewPhase::Failed
        } else if self.records.is_empty() {
            ViewPhase::Empty
        } else {
            ViewPhase::Ready
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied,
    /// A newer refresh started before this one finished.
    Superseded,
}

/// Per-view settings taken from `DashboardConfig`.
#[derive(Debug, Clone, Copy)]
pub struct ViewSettings {
    pub zone: Zone,
    pub recent_limit: usize,
    pub top_k: usize,
}

impl ViewSettings {
    pub fn from_config(config: &DashboardConfig, zone: Zone) -> Self {
        Self {
            zone,
            recent_limit: config.recent_limit,
            top_k: config.top_k,
        }
    }
}

/// A refresh that has been numbered and built but not yet sent.
pub struct PendingRefresh {
    generation: u64,
    query: Query,
    count_query: Option<Query>,
    ctx: QueryContext,
}

struct ViewInner<E> {
    filter: FilterState,
    generation: u64,
    model: ViewModel<E>,
    expansion: ExpansionTracker,
}

pub struct ViewController<V: ViewKind> {
    kind: V,
    store: Arc<dyn RecordStore>,
    clock: Clock,
    settings: ViewSettings,
    inner: Mutex<ViewInner<V::Entry>>,
}

impl<V: ViewKind> ViewController<V> {
    pub fn new(kind: V, store: Arc<dyn RecordStore>, settings: ViewSettings) -> Self {
        Self {
            kind,
            store,
            clock: Arc::new(Utc::now),
            settings,
            inner: Mutex::new(ViewInner {
                filter: FilterState::default(),
                generation: 0,
                model: ViewModel::default(),
                expansion: ExpansionTracker::new(),
            }),
        }
    }

    /// Replace the wall clock, e.g. to pin "now" in tests.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn filter(&self) -> FilterState {
        self.inner.lock().filter.clone()
    }

    pub fn snapshot(&self) -> ViewModel<V::Entry> {
        self.inner.lock().model.clone()
    }

    /// Returns false when the edit left the filter unchanged.
    pub fn apply_edit(&self, edit: &FilterEdit) -> bool {
        self.inner.lock().filter.apply(edit)
    }

    pub fn toggle_expanded(&self, id: i64) -> Option<i64> {
        let mut inner = self.inner.lock();
        let expanded = inner.expansion.toggle(id);
        inner.model.expanded = expanded;
        expanded
    }

    fn context(&self) -> QueryContext {
        QueryContext {
            zone: self.settings.zone,
            now: (self.clock)(),
            recent_limit: self.settings.recent_limit,
        }
    }

    /// Number a new refresh, build its query, and put the view in the
    /// loading state.
    pub fn begin(&self) -> PendingRefresh {
        let ctx = self.context();
        let mut inner = self.inner.lock();
        inner.generation += 1;
        let query = self.kind.build_query(&inner.filter, &ctx);
        let count_query = self.kind.count_query(&inner.filter, &ctx);
        // The tracker keeps the selection; it is republished if the row
        // survives the refresh.
        inner.model.records.clear();
        inner.model.stats = None;
        inner.model.error = None;
        inner.model.expanded = None;
        inner.model.loading = true;
        log::debug!(
            "{}: refresh #{} dispatched ({} predicates)",
            self.name(),
            inner.generation,
            query.predicates.len()
        );
        PendingRefresh {
            generation: inner.generation,
            query,
            count_query,
            ctx,
        }
    }

    async fn fetch(&self, pending: &PendingRefresh) -> Result<(Vec<V::Entry>, usize), StoreError> {
        let rows = self.store.execute(&pending.query).await?;
        let entries = self.kind.decode(rows, &pending.ctx)?;
        let counted = match &pending.count_query {
            Some(query) => self.store.execute(query).await?.len(),
            None => 0,
        };
        Ok((entries, counted))
    }

    /// Run a numbered refresh against the store and publish its result if
    /// it is still the latest.
    pub async fn complete(&self, pending: PendingRefresh) -> RefreshOutcome {
        let started = Instant::now();
        let result = self.fetch(&pending).await;
        let elapsed = started.elapsed();

        let mut inner = self.inner.lock();
        if inner.generation != pending.generation {
            log::debug!(
                "{}: discarding result #{} (latest is #{})",
                self.name(),
                pending.generation,
                inner.generation
            );
            latency::increment_discarded(self.name());
            return RefreshOutcome::Superseded;
        }
        latency::record_latency(self.name(), elapsed);

        match result {
            Ok((entries, counted)) => {
                let stats = self.kind.summarize(&entries, counted, self.settings.top_k);
                inner.expansion.reconcile(entries.iter().map(V::entry_id));
                let expanded = inner.expansion.expanded();
                log::debug!(
                    "{}: refresh #{} applied, {} records in {}ms",
                    self.name(),
                    pending.generation,
                    entries.len(),
                    elapsed.as_millis()
                );
                inner.model = ViewModel {
                    records: entries,
                    stats,
                    loading: false,
                    error: None,
                    expanded,
                };
            }
            Err(e) => {
                log::warn!("{}: refresh #{} failed: {}", self.name(), pending.generation, e);
                latency::increment_failed(self.name());
                inner.expansion.clear();
                inner.model = ViewModel {
                    records: Vec::new(),
                    stats: None,
                    loading: false,
                    error: Some(e.user_message()),
                    expanded: None,
                };
            }
        }
        RefreshOutcome::Applied
    }

    pub async fn refresh(&self) -> RefreshOutcome {
        let pending = self.begin();
        self.complete(pending).await
    }

    /// Number the refresh now, run it in the background.
    pub fn spawn_refresh(self: &Arc<Self>) -> JoinHandle<RefreshOutcome> {
        let pending = self.begin();
        let this = Arc::clone(self);
        tokio::spawn(async move { this.complete(pending).await })
    }

    /// Drive the view from a stream of settled filter edits until the
    /// stream closes. Loads once up front.
    pub async fn run(self: Arc<Self>, mut edits: mpsc::UnboundedReceiver<FilterEdit>) {
        self.spawn_refresh();
        while let Some(edit) = edits.recv().await {
            if self.apply_edit(&edit) {
                self.spawn_refresh();
            }
        }
        log::debug!("{}: filter input closed", self.name());
    }
}

/// Decode one store row into `T`.
pub(crate) fn decode_row<T: DeserializeOwned>(row: Value) -> Result<T, StoreError> {
    serde_json::from_value(row).map_err(StoreError::from)
}

/// Detach the related row nested under `key`; `null` or absent yields `None`.
pub(crate) fn take_embedded<T: DeserializeOwned>(
    row: &mut Value,
    key: &str,
) -> Result<Option<T>, StoreError> {
    let embedded = row
        .as_object_mut()
        .and_then(|object| object.remove(key))
        .unwrap_or(Value::Null);
    serde_json::from_value(embedded).map_err(StoreError::from)
}
