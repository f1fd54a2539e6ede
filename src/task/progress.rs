//! Per-Player Task Progress
//!
//! Completion set and progress map for a single task instance. Both are
//! ordered by player id so serialised documents come out deterministic.
//!
//! The store has no internal locking: it is mutated only from the game loop
//! and read for persistence under the quest book's lock.

use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Stable player identity
pub type PlayerId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressStore<P> {
    completed: BTreeSet<PlayerId>,
    progress: BTreeMap<PlayerId, P>,
}

impl<P> Default for ProgressStore<P> {
    fn default() -> Self {
        Self {
            completed: BTreeSet::new(),
            progress: BTreeMap::new(),
        }
    }
}

impl<P: Clone + Default> ProgressStore<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_complete(&self, player: PlayerId) -> bool {
        self.completed.contains(&player)
    }

    /// Idempotent
    pub fn set_complete(&mut self, player: PlayerId) {
        self.completed.insert(player);
    }

    /// Stored progress, or the default (zero) when the player has none
    pub fn progress(&self, player: PlayerId) -> P {
        self.progress.get(&player).cloned().unwrap_or_default()
    }

    /// Stored progress without the zero default
    pub fn get(&self, player: PlayerId) -> Option<&P> {
        self.progress.get(&player)
    }

    pub fn set_progress(&mut self, player: PlayerId, value: P) {
        self.progress.insert(player, value);
    }

    /// `None` clears every player; `Some` clears only that player's entries
    pub fn reset(&mut self, player: Option<PlayerId>) {
        match player {
            None => {
                self.completed.clear();
                self.progress.clear();
            }
            Some(player) => {
                self.completed.remove(&player);
                self.progress.remove(&player);
            }
        }
    }

    pub fn has_progress(&self, player: PlayerId) -> bool {
        self.progress.contains_key(&player)
    }

    pub fn completed(&self) -> impl Iterator<Item = &PlayerId> {
        self.completed.iter()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&PlayerId, &P)> {
        self.progress.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.completed.is_empty() && self.progress.is_empty()
    }
}
