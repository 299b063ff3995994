//! Bounded history of previously active modes.
//!
//! History remembers where the engine has been. It is independent of
//! whether a remembered mode's instance is still materialized.

use super::state::ModeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One remembered mode.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// The mode that was left
    pub mode: ModeId,
    /// When it was left
    pub left_at: DateTime<Utc>,
}

/// Bounded stack of previously active modes, most recent on top.
///
/// Pushing past capacity drops the oldest entries first.
///
/// # Example
///
/// ```rust
/// use modeset::core::{ModeHistory, ModeId};
///
/// let mut history = ModeHistory::with_capacity(2);
/// history.push(ModeId(0));
/// history.push(ModeId(1));
/// history.push(ModeId(2));
///
/// // Most recent first; mode 0 fell off the bottom.
/// assert_eq!(history.modes(), vec![ModeId(2), ModeId(1)]);
/// assert_eq!(history.pop(), Some(ModeId(2)));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModeHistory {
    // Oldest at the front, most recent at the back.
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl ModeHistory {
    /// Create an empty history holding at most `capacity` entries.
    ///
    /// A capacity of zero keeps nothing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(64)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Push a mode on top, then trim to capacity.
    pub fn push(&mut self, mode: ModeId) {
        self.entries.push_back(HistoryEntry {
            mode,
            left_at: Utc::now(),
        });
        self.trim();
    }

    pub fn pop(&mut self) -> Option<ModeId> {
        self.entries.pop_back().map(|entry| entry.mode)
    }

    pub fn peek(&self) -> Option<ModeId> {
        self.entries.back().map(|entry| entry.mode)
    }

    pub fn peek_entry(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    pub fn contains(&self, mode: ModeId) -> bool {
        self.entries.iter().any(|entry| entry.mode == mode)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries from most recent to oldest.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter().rev()
    }

    /// Mode identifiers from most recent to oldest.
    pub fn modes(&self) -> Vec<ModeId> {
        self.iter().map(|entry| entry.mode).collect()
    }

    fn trim(&mut self) {
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }
}

impl Default for ModeHistory {
    fn default() -> Self {
        Self::with_capacity(10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_history_is_empty() {
        let history = ModeHistory::with_capacity(4);
        assert!(history.is_empty());
        assert_eq!(history.peek(), None);
        assert_eq!(history.capacity(), 4);
    }

    #[test]
    fn pop_returns_most_recent() {
        let mut history = ModeHistory::with_capacity(4);
        history.push(ModeId(0));
        history.push(ModeId(1));

        assert_eq!(history.peek(), Some(ModeId(1)));
        assert_eq!(history.pop(), Some(ModeId(1)));
        assert_eq!(history.pop(), Some(ModeId(0)));
        assert_eq!(history.pop(), None);
    }

    #[test]
    fn oldest_entries_are_dropped_first() {
        let mut history = ModeHistory::with_capacity(3);
        for i in 0..6 {
            history.push(ModeId(i));
        }

        assert_eq!(history.len(), 3);
        assert_eq!(history.modes(), vec![ModeId(5), ModeId(4), ModeId(3)]);
        assert!(!history.contains(ModeId(2)));
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let mut history = ModeHistory::with_capacity(0);
        history.push(ModeId(1));
        assert!(history.is_empty());
    }

    #[test]
    fn entries_carry_timestamps_in_order() {
        let mut history = ModeHistory::with_capacity(4);
        history.push(ModeId(0));
        history.push(ModeId(1));

        let entries: Vec<_> = history.iter().collect();
        assert!(entries[0].left_at >= entries[1].left_at);
    }

    #[test]
    fn history_serializes_correctly() {
        let mut history = ModeHistory::with_capacity(2);
        history.push(ModeId(3));

        let json = serde_json::to_string(&history).unwrap();
        let restored: ModeHistory = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.modes(), vec![ModeId(3)]);
        assert_eq!(restored.capacity(), 2);
    }
}
