//! Debounced filter input.
//!
//! Typed filter fields (search box, call id box) produce one edit per
//! keystroke. `Debouncer` holds back the latest value until the field has
//! been quiet for the configured window, so the store sees one query per
//! pause in typing rather than one per key. Each debounced field owns its own
//! timer; edits to one field never delay another.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::types::{FilterEdit, FilterField};

/// Longest quiet period honored. Larger configured values are clamped so
/// the timer deadline stays representable.
pub const MAX_QUIET_PERIOD: Duration = Duration::from_secs(60);

/// Single-field debouncer. Emits into a shared channel.
///
/// Dropping the debouncer cancels any pending emission.
pub struct Debouncer<T: Send + 'static> {
    quiet: Duration,
    pending: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<T>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new(quiet: Duration, tx: mpsc::UnboundedSender<T>) -> Self {
        Self {
            quiet: quiet.min(MAX_QUIET_PERIOD),
            pending: None,
            tx,
        }
    }

    /// Convenience constructor that owns its own output channel.
    pub fn channel(quiet: Duration) -> (Self, mpsc::UnboundedReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(quiet, tx), rx)
    }

    /// Record a new raw value, restarting the quiet period.
    ///
    /// Must be called from within a tokio runtime.
    pub fn push(&mut self, value: T) {
        self.cancel();
        // Deadline is fixed at edit time, not at the timer task's first poll.
        let deadline = Instant::now() + self.quiet;
        let tx = self.tx.clone();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let _ = tx.send(value);
        }));
    }

    /// Drop the pending value, if any, without emitting it.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl<T: Send + 'static> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Presentation-side handle for one view's filter controls.
///
/// Debounced fields go through their own `Debouncer`; all other fields are
/// forwarded immediately. The paired receiver yields stable edits in the
/// order they settle. Dropping the handle tears down every pending timer and
/// closes the stream once in-flight emissions are gone.
pub struct FilterInput {
    quiet: Duration,
    tx: mpsc::UnboundedSender<FilterEdit>,
    timers: HashMap<FilterField, Debouncer<FilterEdit>>,
}

impl FilterInput {
    pub fn new(quiet: Duration) -> (Self, mpsc::UnboundedReceiver<FilterEdit>) {
        if quiet > MAX_QUIET_PERIOD {
            log::warn!(
                "FilterInput: quiet period {}ms clamped to {}ms",
                quiet.as_millis(),
                MAX_QUIET_PERIOD.as_millis()
            );
        }
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                quiet,
                tx,
                timers: HashMap::new(),
            },
            rx,
        )
    }

    pub fn edit(&mut self, field: FilterField, value: impl Into<String>) {
        let edit = FilterEdit::new(field, value);
        if !field.is_debounced() {
            let _ = self.tx.send(edit);
            return;
        }
        let quiet = self.quiet;
        let tx = &self.tx;
        self.timers
            .entry(field)
            .or_insert_with(|| Debouncer::new(quiet, tx.clone()))
            .push(edit);
    }
}
