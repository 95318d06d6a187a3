//! Global record tracker and bounded buffer of record-breaking walkers.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::genome::Genome;

/// Immutable snapshot of a walker at the moment it was archived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: u64,
    pub name: String,
    pub score: f64,
    pub mean_head_height: f64,
    pub mean_forward_velocity: f64,
    pub max_torso_position: f64,
    pub genome: Genome,
}

/// Observer notified whenever the history stores an entry.
///
/// The engine is fully functional with zero observers attached; telemetry
/// and UI layers subscribe here instead of being called from archive code.
pub trait RecordObserver: Send {
    /// Called after `entry` has been accepted; `new_record` reports whether
    /// the global record score advanced.
    fn on_entry(&mut self, entry: &HistoryEntry, new_record: bool);
}

/// No-op observer.
#[derive(Debug, Default)]
pub struct NullObserver;

impl RecordObserver for NullObserver {
    fn on_entry(&mut self, _entry: &HistoryEntry, _new_record: bool) {}
}

/// Running global record score plus a bounded recency buffer of the entries
/// that reached it. Oldest entries are evicted first.
pub struct History {
    capacity: usize,
    record_score: f64,
    entries: VecDeque<HistoryEntry>,
    observer: Box<dyn RecordObserver>,
}

impl fmt::Debug for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("History")
            .field("capacity", &self.capacity)
            .field("record_score", &self.record_score)
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl History {
    /// New history with the given capacity and no observer.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::with_observer(capacity, Box::new(NullObserver))
    }

    /// New history with an attached observer.
    #[must_use]
    pub fn with_observer(capacity: usize, observer: Box<dyn RecordObserver>) -> Self {
        Self {
            capacity,
            record_score: 0.0,
            entries: VecDeque::new(),
            observer,
        }
    }

    /// Highest score observed so far; non-decreasing across a run.
    #[must_use]
    pub fn record_score(&self) -> f64 {
        self.record_score
    }

    /// Stored entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the buffer holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stores `entry` iff its score strictly exceeds the current record.
    ///
    /// Ties do not replace the record and are not stored. Returns whether
    /// the entry was accepted.
    pub fn add_record(&mut self, entry: HistoryEntry) -> bool {
        if entry.score <= self.record_score {
            return false;
        }
        self.record_score = entry.score;
        self.push(entry, true);
        true
    }

    /// Stores `entry` unconditionally (audit/leaderboard insertion).
    ///
    /// Per-bin record holders land here even when they trail the global
    /// record. Returns whether the global record advanced.
    pub fn add_allowing_non_record(&mut self, entry: HistoryEntry) -> bool {
        let new_record = entry.score > self.record_score;
        if new_record {
            self.record_score = entry.score;
        }
        self.push(entry, new_record);
        new_record
    }

    fn push(&mut self, entry: HistoryEntry, new_record: bool) {
        self.observer.on_entry(&entry, new_record);
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Replaces the capacity, trimming oldest entries immediately.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Replaces the attached observer.
    pub fn set_observer(&mut self, observer: Box<dyn RecordObserver>) {
        self.observer = observer;
    }
}
