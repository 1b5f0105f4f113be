//! "One row expanded at a time" selection state.

/// Tracks which result row, if any, is showing its detail panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpansionTracker {
    expanded: Option<i64>,
}

impl ExpansionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expanded(&self) -> Option<i64> {
        self.expanded
    }

    /// Select a row: collapses it if it is already open, otherwise opens it
    /// and closes whichever row was open before.
    pub fn toggle(&mut self, id: i64) -> Option<i64> {
        self.expanded = if self.expanded == Some(id) {
            None
        } else {
            Some(id)
        };
        self.expanded
    }

    /// Reset when the expanded row is no longer among `visible`.
    pub fn reconcile<I>(&mut self, visible: I)
    where
        I: IntoIterator<Item = i64>,
    {
        if let Some(current) = self.expanded {
            if !visible.into_iter().any(|id| id == current) {
                log::debug!("ExpansionTracker: row {} left the result set", current);
                self.expanded = None;
            }
        }
    }

    pub fn clear(&mut self) {
        self.expanded = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_same_row_collapses() {
        let mut tracker = ExpansionTracker::new();
        assert_eq!(tracker.toggle(5), Some(5));
        assert_eq!(tracker.toggle(5), None);
        assert_eq!(tracker.expanded(), None);
    }

    #[test]
    fn test_selecting_other_row_replaces() {
        let mut tracker = ExpansionTracker::new();
        tracker.toggle(5);
        assert_eq!(tracker.toggle(7), Some(7));
        assert_eq!(tracker.expanded(), Some(7));
    }

    #[test]
    fn test_reconcile_resets_when_row_disappears() {
        let mut tracker = ExpansionTracker::new();
        tracker.toggle(5);
        tracker.reconcile([4, 5, 6]);
        assert_eq!(tracker.expanded(), Some(5));
        tracker.reconcile([4, 6]);
        assert_eq!(tracker.expanded(), None);
    }

    #[test]
    fn test_reconcile_with_nothing_expanded_is_noop() {
        let mut tracker = ExpansionTracker::new();
        tracker.reconcile(std::iter::empty());
        assert_eq!(tracker.expanded(), None);
    }
}
