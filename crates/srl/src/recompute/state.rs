use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::runs::LeaderboardKey;

/// The recomputation state of a single leaderboard.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyState {
    /// Standings are up to date.
    #[default]
    Clean,

    /// Standings are stale and the leaderboard is queued for recomputation.
    Dirty,

    /// A recomputation is in progress.
    Recomputing,

    /// A recomputation is in progress, but the leaderboard changed after it started.
    RecomputingDirty,
}

/// Per-leaderboard state machine.
///
/// Only leaderboards that are not [`KeyState::Clean`] are stored.
#[derive(Debug, Default)]
pub(crate) struct KeyStates {
    states: Mutex<HashMap<LeaderboardKey, KeyState>>,
}

impl KeyStates {
    fn lock(&self) -> MutexGuard<'_, HashMap<LeaderboardKey, KeyState>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn get(&self, key: &LeaderboardKey) -> KeyState {
        self.lock().get(key).copied().unwrap_or_default()
    }

    /// Records that `key` has changed.
    ///
    /// Returns `true` if the caller has to enqueue `key`.
    pub(crate) fn mark_dirty(&self, key: &LeaderboardKey) -> bool {
        let mut states = self.lock();

        match states.get_mut(key) {
            None => {
                states.insert(key.clone(), KeyState::Dirty);
                true
            },
            Some(state @ KeyState::Recomputing) => {
                *state = KeyState::RecomputingDirty;
                false
            },
            Some(KeyState::Clean | KeyState::Dirty | KeyState::RecomputingDirty) => false,
        }
    }

    /// Starts a queued recomputation.
    ///
    /// Returns `false` if `key` is not [`KeyState::Dirty`], in which case there is nothing to do.
    pub(crate) fn begin(&self, key: &LeaderboardKey) -> bool {
        match self.lock().get_mut(key) {
            Some(state @ KeyState::Dirty) => {
                *state = KeyState::Recomputing;
                true
            },
            _ => false,
        }
    }

    /// Starts a recomputation outside of the queue.
    ///
    /// Returns `false` if a recomputation of `key` is already in progress; that recomputation
    /// will then be repeated once it finishes.
    pub(crate) fn begin_now(&self, key: &LeaderboardKey) -> bool {
        let mut states = self.lock();

        match states.entry(key.clone()) {
            Entry::Vacant(entry) => {
                entry.insert(KeyState::Recomputing);
                true
            },
            Entry::Occupied(mut entry) => match *entry.get() {
                KeyState::Clean | KeyState::Dirty => {
                    entry.insert(KeyState::Recomputing);
                    true
                },
                KeyState::Recomputing | KeyState::RecomputingDirty => {
                    entry.insert(KeyState::RecomputingDirty);
                    false
                },
            },
        }
    }

    /// Whether `key` changed since its current recomputation started.
    pub(crate) fn is_dirtied(&self, key: &LeaderboardKey) -> bool {
        self.get(key) == KeyState::RecomputingDirty
    }

    /// Ends a recomputation.
    ///
    /// Returns `true` if `key` changed in the meantime and has to be enqueued again.
    pub(crate) fn finish(&self, key: &LeaderboardKey) -> bool {
        let mut states = self.lock();

        match states.get_mut(key) {
            Some(state @ KeyState::RecomputingDirty) => {
                *state = KeyState::Dirty;
                true
            },
            Some(KeyState::Recomputing) => {
                states.remove(key);
                false
            },
            Some(state) => {
                warn!(%key, ?state, "finished recomputation that was never started");
                false
            },
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> LeaderboardKey {
        LeaderboardKey {
            game: "thug".parse().unwrap(),
            category: "story".parse().unwrap(),
            level: None,
            subcategory: String::new(),
        }
    }

    #[test]
    fn serializes_as_kebab_case() {
        assert_eq!(serde_json::to_value(KeyState::Clean).unwrap(), "clean");
        assert_eq!(serde_json::to_value(KeyState::RecomputingDirty).unwrap(), "recomputing-dirty");
    }

    #[test]
    fn clean_to_dirty_enqueues_once() {
        let states = KeyStates::default();

        assert!(states.mark_dirty(&key()));
        assert!(!states.mark_dirty(&key()));
        assert_eq!(states.get(&key()), KeyState::Dirty);
    }

    #[test]
    fn full_cycle() {
        let states = KeyStates::default();

        assert!(states.mark_dirty(&key()));
        assert!(states.begin(&key()));
        assert_eq!(states.get(&key()), KeyState::Recomputing);
        assert!(!states.is_dirtied(&key()));
        assert!(!states.finish(&key()));
        assert_eq!(states.get(&key()), KeyState::Clean);
    }

    #[test]
    fn change_during_recomputation_requeues() {
        let states = KeyStates::default();

        states.mark_dirty(&key());
        states.begin(&key());

        assert!(!states.mark_dirty(&key()));
        assert!(states.is_dirtied(&key()));
        assert!(states.finish(&key()));
        assert_eq!(states.get(&key()), KeyState::Dirty);
        assert!(states.begin(&key()));
    }

    #[test]
    fn stale_queue_entries_are_ignored() {
        let states = KeyStates::default();

        assert!(!states.begin(&key()));

        states.mark_dirty(&key());
        states.begin(&key());

        assert!(!states.begin(&key()));
    }

    #[test]
    fn immediate_recomputation_waits_for_running_one() {
        let states = KeyStates::default();

        assert!(states.begin_now(&key()));
        assert!(!states.begin_now(&key()));
        assert!(states.finish(&key()));
        assert_eq!(states.get(&key()), KeyState::Dirty);
    }
}
