//! Linear undo/redo over timeline snapshots.

use cutline_timeline_model::TimelineSnapshot;

/// Whether any mutation has been recorded yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryState {
    /// Only the seed snapshot exists.
    Idle,
    /// At least one mutation has been committed.
    Recording,
}

/// Bounded stack of snapshots with a cursor pointing at the live state.
///
/// Entry 0 is always the oldest state that can still be restored. Recording
/// after an undo discards the redo branch.
#[derive(Debug, Clone)]
pub struct HistoryManager {
    snapshots: Vec<TimelineSnapshot>,
    cursor: usize,
    max_entries: usize,
    state: HistoryState,
}

impl HistoryManager {
    /// Seed the history with the current state. `max_entries` bounds the
    /// number of undo steps (0 disables undo entirely).
    pub fn new(initial: TimelineSnapshot, max_entries: usize) -> Self {
        Self {
            snapshots: vec![initial],
            cursor: 0,
            max_entries,
            state: HistoryState::Idle,
        }
    }

    /// Record the state after a committed mutation.
    ///
    /// Returns `false` when the snapshot equals the current one.
    pub fn record(&mut self, snapshot: TimelineSnapshot) -> bool {
        if self.snapshots[self.cursor] == snapshot {
            return false;
        }

        let discarded = self.snapshots.len() - self.cursor - 1;
        if discarded > 0 {
            tracing::debug!(discarded, "Dropping redo branch");
        }
        self.snapshots.truncate(self.cursor + 1);
        self.snapshots.push(snapshot);

        let overflow = self.snapshots.len().saturating_sub(self.max_entries + 1);
        if overflow > 0 {
            self.snapshots.drain(..overflow);
        }
        self.cursor = self.snapshots.len() - 1;
        self.state = HistoryState::Recording;
        true
    }

    /// Step back and return the state to restore.
    pub fn undo(&mut self) -> Option<&TimelineSnapshot> {
        if self.cursor == 0 {
            tracing::debug!("Nothing to undo");
            return None;
        }
        self.cursor -= 1;
        Some(&self.snapshots[self.cursor])
    }

    /// Step forward and return the state to restore.
    pub fn redo(&mut self) -> Option<&TimelineSnapshot> {
        if !self.can_redo() {
            tracing::debug!("Nothing to redo");
            return None;
        }
        self.cursor += 1;
        Some(&self.snapshots[self.cursor])
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    /// The snapshot matching the live state.
    pub fn current(&self) -> &TimelineSnapshot {
        &self.snapshots[self.cursor]
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn state(&self) -> HistoryState {
        self.state
    }

    /// Forget everything except the current state.
    pub fn clear(&mut self) {
        let current = self.snapshots.swap_remove(self.cursor);
        self.snapshots = vec![current];
        self.cursor = 0;
        self.state = HistoryState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutline_timeline_model::{Clip, ClipKind};

    fn snap(n: usize) -> TimelineSnapshot {
        let clips = (0..n)
            .map(|i| {
                Clip::new(
                    format!("c{i}").as_str(),
                    "track1",
                    ClipKind::Video,
                    "v.mp4",
                    i as f64,
                    1.0,
                )
            })
            .collect();
        TimelineSnapshot::new(clips)
    }

    #[test]
    fn test_undo_redo_walks_the_stack() {
        let mut history = HistoryManager::new(snap(0), 100);
        assert_eq!(history.state(), HistoryState::Idle);
        assert!(history.undo().is_none());

        history.record(snap(1));
        history.record(snap(2));
        assert_eq!(history.state(), HistoryState::Recording);

        assert_eq!(history.undo().unwrap(), &snap(1));
        assert_eq!(history.undo().unwrap(), &snap(0));
        assert!(history.undo().is_none());
        assert_eq!(history.redo().unwrap(), &snap(1));
        assert_eq!(history.redo().unwrap(), &snap(2));
        assert!(history.redo().is_none());
    }

    #[test]
    fn test_identical_snapshot_is_ignored() {
        let mut history = HistoryManager::new(snap(0), 100);
        assert!(!history.record(snap(0)));
        assert_eq!(history.len(), 1);
        assert_eq!(history.state(), HistoryState::Idle);
    }

    #[test]
    fn test_record_after_undo_truncates_redo_branch() {
        let mut history = HistoryManager::new(snap(0), 100);
        history.record(snap(1));
        history.record(snap(2));
        history.undo();
        history.undo();

        history.record(snap(3));
        assert!(!history.can_redo());
        assert_eq!(history.len(), 2);
        assert_eq!(history.undo().unwrap(), &snap(0));
    }

    #[test]
    fn test_depth_is_bounded() {
        let mut history = HistoryManager::new(snap(0), 3);
        for n in 1..=10 {
            history.record(snap(n));
        }
        assert_eq!(history.len(), 4);
        assert_eq!(history.current(), &snap(10));

        let mut steps = 0;
        while history.undo().is_some() {
            steps += 1;
        }
        assert_eq!(steps, 3);
        assert_eq!(history.current(), &snap(7));
    }

    #[test]
    fn test_clear_keeps_current_state() {
        let mut history = HistoryManager::new(snap(0), 10);
        history.record(snap(1));
        history.record(snap(2));
        history.undo();
        history.clear();
        assert_eq!(history.len(), 1);
        assert_eq!(history.current(), &snap(1));
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }
}
