use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{LeaderboardKey, RepositoryError, Run, RunId, RunRepository, RunStanding};
use crate::timing::TimingRules;

/// A [`RunRepository`] that keeps everything in memory.
///
/// Failures and latency can be injected, which makes it useful for exercising the recomputation
/// machinery without a database.
#[derive(Debug, Default)]
pub struct InMemoryRuns {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    runs: BTreeMap<RunId, Run>,
    timing_rules: HashMap<LeaderboardKey, TimingRules>,
    failures: u32,
    latency: Duration,
    writes: u64,
}

impl InMemoryRuns {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts or replaces a run.
    pub fn insert(&self, run: Run) -> Option<Run> {
        self.lock().runs.insert(run.id.clone(), run)
    }

    pub fn remove(&self, run_id: &RunId) -> Option<Run> {
        self.lock().runs.remove(run_id)
    }

    pub fn get(&self, run_id: &RunId) -> Option<Run> {
        self.lock().runs.get(run_id).cloned()
    }

    /// Applies `update` to a run, returning whether it exists.
    pub fn update(&self, run_id: &RunId, update: impl FnOnce(&mut Run)) -> bool {
        self.lock().runs.get_mut(run_id).map(update).is_some()
    }

    pub fn set_timing_rules(&self, key: LeaderboardKey, rules: TimingRules) {
        self.lock().timing_rules.insert(key, rules);
    }

    /// Makes the next `count` calls fail with [`RepositoryError::Unavailable`].
    pub fn fail_next(&self, count: u32) {
        self.lock().failures = count;
    }

    /// Delays every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    /// How many times results have been written.
    pub fn write_count(&self) -> u64 {
        self.lock().writes
    }

    async fn enter(&self) -> Result<(), RepositoryError> {
        let latency = {
            let mut inner = self.lock();

            if inner.failures > 0 {
                inner.failures -= 1;
                return Err(RepositoryError::Unavailable);
            }

            inner.latency
        };

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        Ok(())
    }
}

impl RunRepository for InMemoryRuns {
    async fn fetch_runs(&self, key: &LeaderboardKey) -> Result<Vec<Run>, RepositoryError> {
        self.enter().await?;

        Ok(self
            .lock()
            .runs
            .values()
            .filter(|run| run.key == *key)
            .cloned()
            .collect())
    }

    async fn fetch_timing_rules(&self, key: &LeaderboardKey) -> Result<TimingRules, RepositoryError> {
        self.enter().await?;

        Ok(self
            .lock()
            .timing_rules
            .get(key)
            .copied()
            .unwrap_or_default())
    }

    async fn write_results(
        &self,
        _key: &LeaderboardKey,
        standings: &[RunStanding],
        newly_obsolete: &[RunId],
    ) -> Result<(), RepositoryError> {
        self.enter().await?;

        let mut inner = self.lock();

        for run_id in newly_obsolete {
            if let Some(run) = inner.runs.get_mut(run_id) {
                run.obsolete = true;
            }
        }

        for standing in standings {
            if let Some(run) = inner.runs.get_mut(&standing.run_id) {
                run.place = standing.place;
                run.points = standing.points;
                run.streak_bonus = standing.streak_bonus;
            }
        }

        inner.writes += 1;

        Ok(())
    }

    async fn fetch_key(&self, run_id: &RunId) -> Result<Option<LeaderboardKey>, RepositoryError> {
        self.enter().await?;

        Ok(self.lock().runs.get(run_id).map(|run| run.key.clone()))
    }
}
