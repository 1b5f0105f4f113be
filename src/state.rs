use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::db::SqliteRecordStore;
use crate::debounce::FilterInput;
use crate::error::{ConfigError, StoreError};
use crate::queries::window::Zone;
use crate::services::{
    AnalysesView, ConversationsView, MeetingsView, StatsView, ViewController, ViewSettings,
    ViewKind,
};
use crate::store::RecordStore;
use crate::types::DashboardConfig;

/// Everything the presentation layer talks to: one controller per view,
/// all sharing one record store.
pub struct AppState {
    pub config: DashboardConfig,
    pub conversations: Arc<ViewController<ConversationsView>>,
    pub analyses: Arc<ViewController<AnalysesView>>,
    pub meetings: Arc<ViewController<MeetingsView>>,
    pub dashboard: Arc<ViewController<StatsView>>,
    pub analytics: Arc<ViewController<StatsView>>,
}

/// Errors opening the application state.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AppState {
    /// Open the SQLite store named by `config` and build every view.
    pub fn open(config: DashboardConfig) -> Result<Self, StartupError> {
        let path = SqliteRecordStore::resolve_path(config.database_path.as_deref())?;
        log::info!("AppState: opening record store at {}", path.display());
        let store = SqliteRecordStore::open_at(path)?;
        Self::with_store(config, Arc::new(store))
    }

    /// Build every view over an existing store.
    pub fn with_store(
        config: DashboardConfig,
        store: Arc<dyn RecordStore>,
    ) -> Result<Self, StartupError> {
        let zone = Zone::from_config(config.timezone.as_deref())?;
        let settings = ViewSettings::from_config(&config, zone);
        fn build<V: ViewKind>(
            kind: V,
            store: &Arc<dyn RecordStore>,
            settings: ViewSettings,
        ) -> Arc<ViewController<V>> {
            Arc::new(ViewController::new(kind, Arc::clone(store), settings))
        }

        Ok(Self {
            conversations: build(ConversationsView, &store, settings),
            analyses: build(AnalysesView, &store, settings),
            meetings: build(MeetingsView, &store, settings),
            dashboard: build(StatsView::dashboard(), &store, settings),
            analytics: build(StatsView::analytics(), &store, settings),
            config,
        })
    }

    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.config.debounce_ms)
    }

    /// Start a view's driver loop and hand back the input handle that feeds
    /// it. Dropping the handle cancels pending edits and ends the loop.
    ///
    /// Must be called from within a tokio runtime.
    pub fn attach<V: ViewKind>(
        &self,
        view: &Arc<ViewController<V>>,
    ) -> (FilterInput, JoinHandle<()>) {
        let (input, edits) = FilterInput::new(self.quiet_period());
        let handle = tokio::spawn(Arc::clone(view).run(edits));
        log::debug!("AppState: attached {}", view.name());
        (input, handle)
    }
}

/// `~/.callboard/config.json`
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::HomeDirNotFound)?;
    Ok(home.join(".callboard").join("config.json"))
}

/// Load the config from its default location. A missing file is not an
/// error; every field has a default.
pub fn load_config() -> Result<DashboardConfig, ConfigError> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(path: &Path) -> Result<DashboardConfig, ConfigError> {
    if !path.exists() {
        log::info!("No config at {}, using defaults", path.display());
        return Ok(DashboardConfig::default());
    }

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: DashboardConfig = serde_json::from_str(&content)?;

    // Reject a bad zone at load time rather than on the first query.
    Zone::from_config(config.timezone.as_deref())?;

    Ok(config)
}
