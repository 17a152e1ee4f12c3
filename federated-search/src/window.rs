//! Per-provider buffer of fetched-but-not-yet-emitted hits.

use crate::types::Hit;

/// Accumulated hits of one provider plus its pagination cursor.
///
/// `last_seen` is the index of the last hit fetched so far in the provider's
/// full result list (`-1` before the first page). It never exceeds
/// `total - 1` once a total has been reported.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultWindow {
    /// Buffered hits not yet emitted, in provider order.
    pub hits: Vec<Hit>,
    /// Index of the last fetched hit, `-1` when nothing was fetched.
    pub last_seen: i64,
    /// Latest total reported by the provider.
    pub total: u64,
}

impl Default for ResultWindow {
    fn default() -> Self {
        Self {
            hits: Vec::new(),
            last_seen: -1,
            total: 0,
        }
    }
}

impl ResultWindow {
    /// Restore the empty state of a new query lineage.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Offset of the next page to request.
    pub fn next_offset(&self) -> usize {
        usize::try_from(self.last_seen + 1).unwrap_or(0)
    }

    /// Returns `true` once every hit the provider reported has been fetched.
    pub fn is_exhausted(&self) -> bool {
        self.last_seen + 1 >= i64::try_from(self.total).unwrap_or(i64::MAX)
    }

    /// Append a newly fetched page and adopt the provider's latest total.
    pub fn extend(&mut self, page: Vec<Hit>, total: u64) {
        let added = i64::try_from(page.len()).unwrap_or(i64::MAX);
        self.hits.extend(page);
        self.total = total;
        let ceiling = i64::try_from(total).unwrap_or(i64::MAX) - 1;
        self.last_seen = (self.last_seen + added).min(ceiling.max(-1));
    }

    /// Remove and return every buffered hit.
    pub fn drain(&mut self) -> Vec<Hit> {
        std::mem::take(&mut self.hits)
    }

    /// Keep buffered hits matching `keep`, dropping the rest permanently.
    pub fn retain(&mut self, keep: impl FnMut(&Hit) -> bool) {
        self.hits.retain(keep);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HitSource, Provider};

    fn hits(n: usize) -> Vec<Hit> {
        (0..n)
            .map(|i| Hit {
                id: format!("hit-{i}"),
                source: HitSource::default(),
                highlight: Default::default(),
                score: -(i as f64),
                comp_date: None,
                came_from: Provider::Primary,
                duplicates: Vec::new(),
            })
            .collect()
    }

    #[test]
    fn empty_window_cursor() {
        let window = ResultWindow::default();
        assert_eq!(window.last_seen, -1);
        assert_eq!(window.next_offset(), 0);
        assert!(window.is_exhausted());
    }

    #[test]
    fn extend_appends_and_advances() {
        let mut window = ResultWindow::default();
        window.extend(hits(3), 10);
        assert_eq!(window.last_seen, 2);
        assert_eq!(window.next_offset(), 3);
        assert!(!window.is_exhausted());

        window.extend(hits(2), 10);
        assert_eq!(window.hits.len(), 5);
        assert_eq!(window.last_seen, 4);
    }

    #[test]
    fn extend_replaces_total() {
        let mut window = ResultWindow::default();
        window.extend(hits(2), 10);
        window.extend(hits(1), 3);
        assert_eq!(window.total, 3);
        assert!(window.is_exhausted());
    }

    #[test]
    fn last_seen_never_passes_total() {
        let mut window = ResultWindow::default();
        window.extend(hits(5), 3);
        assert_eq!(window.last_seen, 2);
    }

    #[test]
    fn drained_window_keeps_cursor() {
        let mut window = ResultWindow::default();
        window.extend(hits(4), 8);
        let drained = window.drain();
        assert_eq!(drained.len(), 4);
        assert!(window.hits.is_empty());
        assert_eq!(window.last_seen, 3);
    }

    #[test]
    fn reset_restores_empty_state() {
        let mut window = ResultWindow::default();
        window.extend(hits(4), 8);
        window.reset();
        assert_eq!(window, ResultWindow::default());
    }
}
