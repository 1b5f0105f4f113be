//! Print one statistics view as JSON.
//!
//! Usage: `callboard [dashboard|analytics] [today|7d|30d|90d|all]`

use std::process::ExitCode;
use std::sync::Arc;

use callboard_lib::services::{StatsView, ViewController, ViewPhase};
use callboard_lib::state::{load_config, AppState};
use callboard_lib::types::{FilterEdit, FilterField};

#[tokio::main]
async fn main() -> ExitCode {
    callboard_lib::init_logging();

    let mut args = std::env::args().skip(1);
    let view = args.next().unwrap_or_else(|| "dashboard".to_string());
    let range = args.next().unwrap_or_default();

    let state = match load_config().map_err(|e| e.to_string()).and_then(|config| {
        AppState::open(config).map_err(|e| e.to_string())
    }) {
        Ok(state) => state,
        Err(e) => {
            log::error!("Failed to start: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let controller: Arc<ViewController<StatsView>> = match view.as_str() {
        "dashboard" => Arc::clone(&state.dashboard),
        "analytics" => Arc::clone(&state.analytics),
        other => {
            eprintln!("unknown view {other:?}; expected dashboard or analytics");
            return ExitCode::FAILURE;
        }
    };

    controller.apply_edit(&FilterEdit::new(FilterField::Range, range));
    controller.refresh().await;
    let model = controller.snapshot();
    let phase = model.phase();

    let output = serde_json::json!({
        "view": controller.name(),
        "phase": phase,
        "error": model.error,
        "stats": model.stats,
        "latency": callboard_lib::latency::get_rollups(),
    });
    match serde_json::to_string_pretty(&output) {
        Ok(text) => println!("{text}"),
        Err(e) => {
            log::error!("Failed to serialize output: {}", e);
            return ExitCode::FAILURE;
        }
    }

    if phase == ViewPhase::Failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
