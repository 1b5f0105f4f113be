pub mod db;
pub mod debounce;
pub mod error;
pub mod expansion;
pub mod latency;
mod migrations;
pub mod queries;
pub mod services;
pub mod signals;
pub mod state;
pub mod store;
pub mod types;

/// Install the `env_logger` backend. Defaults to `info`; `RUST_LOG`
/// overrides. Safe to call more than once.
pub fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("info");
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::debug!("Logger already initialized");
    }
}
