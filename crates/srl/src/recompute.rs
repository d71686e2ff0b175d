//! Keeping leaderboard standings up to date.
//!
//! Changes to runs are reported through a [`RecomputeHandle`]. Each report marks the affected
//! leaderboard as dirty and queues it; [`Recomputer::run()`] works through the queue with a
//! bounded number of concurrent workers. A leaderboard is never recomputed by two workers at the
//! same time, and a leaderboard that changes while it is being recomputed is simply recomputed
//! again afterwards.

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::{PointsConfig, RecomputeConfig};
use crate::events::{self, Event};
use crate::leaderboards::{self, ComputeLeaderboardError, Computed};
use crate::points::FormulaDomainError;
use crate::runs::{LeaderboardKey, RunId, RunRepository};
use crate::time::Timestamp;
use crate::timing::DataIntegrityError;

mod state;
pub use state::KeyState;
use state::KeyStates;

mod retry;
pub use retry::{AttemptError, RepositoryUnavailableError};
use retry::with_retries;

#[derive(Debug, Display, Error)]
#[display("leaderboard {key} changed while it was being recomputed")]
pub struct ConcurrentMutationError {
    pub key: LeaderboardKey,
}

#[derive(Debug, Display, Error, From)]
pub enum RecomputeError {
    #[display("{_0}")]
    DataIntegrity(DataIntegrityError),

    #[display("{_0}")]
    FormulaDomain(FormulaDomainError),

    #[display("{_0}")]
    ConcurrentMutation(ConcurrentMutationError),

    #[display("{_0}")]
    RepositoryUnavailable(RepositoryUnavailableError),
}

impl From<ComputeLeaderboardError> for RecomputeError {
    fn from(error: ComputeLeaderboardError) -> Self {
        match error {
            ComputeLeaderboardError::DataIntegrity(error) => Self::DataIntegrity(error),
            ComputeLeaderboardError::FormulaDomain(error) => Self::FormulaDomain(error),
        }
    }
}

/// Recomputes dirty leaderboards.
#[derive(Debug)]
pub struct Recomputer<R> {
    shared: Arc<Shared<R>>,
    queue: mpsc::UnboundedReceiver<LeaderboardKey>,
}

/// Used to report changes to a [`Recomputer`].
#[derive(Debug, Clone)]
pub struct RecomputeHandle {
    states: Arc<KeyStates>,
    queue: mpsc::UnboundedSender<LeaderboardKey>,
}

#[derive(Debug)]
struct Shared<R> {
    repository: Arc<R>,
    points: PointsConfig,
    config: RecomputeConfig,
    handle: RecomputeHandle,
}

impl<R: RunRepository> Recomputer<R> {
    pub fn new(repository: Arc<R>, points: PointsConfig, config: RecomputeConfig) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let handle = RecomputeHandle { states: Arc::default(), queue: queue_tx };

        Self {
            shared: Arc::new(Shared { repository, points, config, handle }),
            queue: queue_rx,
        }
    }

    pub fn handle(&self) -> RecomputeHandle {
        self.shared.handle.clone()
    }

    /// Recomputes a leaderboard right away, bypassing the queue.
    ///
    /// If the leaderboard is already being recomputed, this returns
    /// [`RecomputeError::ConcurrentMutation`] and the running recomputation is repeated once it
    /// has finished.
    #[tracing::instrument(skip(self), fields(%key), err(level = "debug"))]
    pub async fn recompute_now(&self, key: &LeaderboardKey) -> Result<Computed, RecomputeError> {
        if !self.shared.handle.states.begin_now(key) {
            return Err(ConcurrentMutationError { key: key.clone() }.into());
        }

        let result = self.shared.recompute(key).await;

        if self.shared.handle.states.finish(key) {
            self.shared.handle.enqueue(key.clone());
        }

        result
    }

    /// Processes queued leaderboards until `cancellation_token` is cancelled.
    ///
    /// In-flight recomputations are allowed to finish before this returns.
    #[tracing::instrument(skip_all)]
    pub async fn run(mut self, cancellation_token: CancellationToken) {
        let permits = Arc::new(Semaphore::new(self.shared.config.workers.get()));
        let tasks = TaskTracker::new();

        loop {
            let key = select! {
                () = cancellation_token.cancelled() => {
                    debug!("cancelled");
                    break;
                },

                Some(key) = self.queue.recv() => key,

                else => break,
            };

            let permit = select! {
                () = cancellation_token.cancelled() => {
                    debug!("cancelled");
                    break;
                },

                permit = Arc::clone(&permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let shared = Arc::clone(&self.shared);
            let cancellation_token = cancellation_token.child_token();

            tasks.spawn(async move {
                let retry = shared.process(key).await;

                drop(permit);

                if let Some(key) = retry {
                    select! {
                        () = cancellation_token.cancelled() => {},
                        () = sleep(shared.config.retry.max_backoff) => {
                            shared.handle.mark_changed(&key);
                        },
                    }
                }
            });
        }

        tasks.close();
        tasks.wait().await;
    }
}

impl<R: RunRepository> Shared<R> {
    /// Runs a queued recomputation.
    ///
    /// Returns the key back if it should be retried later.
    #[tracing::instrument(level = "debug", skip(self), fields(%key))]
    async fn process(&self, key: LeaderboardKey) -> Option<LeaderboardKey> {
        if !self.handle.states.begin(&key) {
            trace!("leaderboard is not dirty anymore");
            return None;
        }

        let result = self.recompute(&key).await;

        if self.handle.states.finish(&key) {
            debug!("leaderboard changed during recomputation; queueing again");
            self.handle.enqueue(key.clone());
        }

        match result {
            Ok(_) | Err(RecomputeError::ConcurrentMutation(_)) => None,
            Err(error @ RecomputeError::RepositoryUnavailable(_)) => {
                warn!(%error, "failed to recompute leaderboard; will try again later");
                events::dispatch(Event::RecomputationFailed {
                    key: key.clone(),
                    reason: error.to_string(),
                });
                Some(key)
            },
            Err(error) => {
                error!(%error, "aborted recomputation; previous standings are kept");
                events::dispatch(Event::RecomputationFailed { key, reason: error.to_string() });
                None
            },
        }
    }

    /// Fetches, computes, and persists a leaderboard's standings.
    async fn recompute(&self, key: &LeaderboardKey) -> Result<Computed, RecomputeError> {
        let policy = &self.config.retry;
        let repository = &*self.repository;

        let runs = with_retries(policy, "fetching runs", || repository.fetch_runs(key)).await?;
        let rules =
            with_retries(policy, "fetching timing rules", || repository.fetch_timing_rules(key))
                .await?;

        let as_of = Timestamp::now().date();
        let computed = leaderboards::compute(key, &runs, &rules, &self.points, as_of)?;

        if self.handle.states.is_dirtied(key) {
            return Err(ConcurrentMutationError { key: key.clone() }.into());
        }

        with_retries(policy, "writing standings", || {
            repository.write_results(key, &computed.standings, &computed.newly_obsolete)
        })
        .await?;

        info!(
            %key,
            runs = runs.len(),
            newly_obsolete = computed.newly_obsolete.len(),
            record_time = ?computed.record_time,
            "recomputed leaderboard",
        );

        events::dispatch(Event::LeaderboardUpdated {
            key: key.clone(),
            ranked: computed
                .standings
                .iter()
                .filter(|standing| standing.place.is_some())
                .count(),
            newly_obsolete: computed.newly_obsolete.clone().into_boxed_slice(),
            record_time: computed.record_time,
        });

        Ok(computed)
    }
}

impl RecomputeHandle {
    /// Reports that a run was created, edited, approved, or deleted.
    ///
    /// For edits that move a run to another leaderboard, report both the old and the new key.
    #[tracing::instrument(level = "debug", skip(self), fields(%run_id, %key))]
    pub fn run_changed(&self, run_id: RunId, key: LeaderboardKey) {
        self.mark_changed(&key);
        events::dispatch(Event::RunChanged { run_id, key });
    }

    /// Marks a leaderboard as dirty, queueing it if necessary.
    pub fn mark_changed(&self, key: &LeaderboardKey) {
        if self.states.mark_dirty(key) {
            self.enqueue(key.clone());
        }
    }

    /// The current state of a leaderboard.
    pub fn state(&self, key: &LeaderboardKey) -> KeyState {
        self.states.get(key)
    }

    fn enqueue(&self, key: LeaderboardKey) {
        if let Err(error) = self.queue.send(key) {
            warn!(key = %error.0, "recomputation queue is closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZero;
    use std::time::Duration;

    use futures_util::StreamExt;
    use time::macros::datetime;
    use time::PrimitiveDateTime;
    use tokio::time::timeout;

    use super::*;
    use crate::config::RetryPolicy;
    use crate::runs::{InMemoryRuns, PlayerId, Run, Times};
    use crate::time::Seconds;

    fn key(category: &str) -> LeaderboardKey {
        LeaderboardKey {
            game: "thps2".parse().unwrap(),
            category: category.parse().unwrap(),
            level: None,
            subcategory: String::new(),
        }
    }

    fn run(id: &str, key: &LeaderboardKey, player: &str, realtime: f64, approved_at: PrimitiveDateTime) -> Run {
        let mut run = crate::timing::tests::run(
            id,
            Times { realtime: Seconds::new(realtime), ..Default::default() },
        );
        run.key = key.clone();
        run.players = vec![PlayerId::new(player)];
        run.approved_at = Timestamp::from(approved_at.assume_utc());
        run
    }

    fn recompute_config() -> RecomputeConfig {
        RecomputeConfig {
            workers: NonZero::new(2).unwrap(),
            retry: RetryPolicy {
                attempts: NonZero::new(3).unwrap(),
                initial_backoff: Duration::from_millis(1),
                max_backoff: Duration::from_millis(5),
                timeout: Duration::from_secs(1),
            },
        }
    }

    fn recomputer(repository: &Arc<InMemoryRuns>) -> Recomputer<InMemoryRuns> {
        Recomputer::new(Arc::clone(repository), PointsConfig::default(), recompute_config())
    }

    #[tokio::test]
    async fn writes_standings() {
        let key = key("all-goals");
        let repository = Arc::new(InMemoryRuns::new());

        repository.insert(run("a", &key, "alice", 100.0, datetime!(2020-01-01 12:00)));
        repository.insert(run("b", &key, "bob", 80.0, datetime!(2020-02-01 12:00)));

        recomputer(&repository).recompute_now(&key).await.unwrap();

        let a = repository.get(&RunId::new("a")).unwrap();
        let b = repository.get(&RunId::new("b")).unwrap();

        assert_eq!(b.place, Some(1));
        assert_eq!(b.points, 1500.0);
        assert_eq!(b.streak_bonus, 500.0);
        assert_eq!(a.place, Some(2));
        assert_eq!(a.points, 380.0);
        assert_eq!(repository.write_count(), 1);
    }

    #[tokio::test]
    async fn recomputing_is_idempotent() {
        let key = key("any");
        let repository = Arc::new(InMemoryRuns::new());

        repository.insert(run("a", &key, "alice", 100.0, datetime!(2020-01-01 12:00)));
        repository.insert(run("b", &key, "bob", 100.0, datetime!(2020-01-02 12:00)));
        repository.insert(run("c", &key, "alice", 120.0, datetime!(2019-12-01 12:00)));

        let recomputer = recomputer(&repository);
        let first = recomputer.recompute_now(&key).await.unwrap();
        let second = recomputer.recompute_now(&key).await.unwrap();

        assert_eq!(first.standings, second.standings);
        assert_eq!(first.newly_obsolete, [RunId::new("c")]);
        assert!(second.newly_obsolete.is_empty());
        assert!(repository.get(&RunId::new("c")).unwrap().obsolete);
    }

    #[tokio::test]
    async fn integrity_errors_keep_previous_standings() {
        let key = key("any");
        let repository = Arc::new(InMemoryRuns::new());

        repository.insert(run("a", &key, "alice", 100.0, datetime!(2020-01-01 12:00)));

        let recomputer = recomputer(&repository);
        recomputer.recompute_now(&key).await.unwrap();

        repository.insert(run("broken", &key, "bob", 0.0, datetime!(2020-01-03 12:00)));

        let error = recomputer.recompute_now(&key).await.unwrap_err();

        assert!(matches!(error, RecomputeError::DataIntegrity(_)));
        assert_eq!(repository.write_count(), 1);
        assert_eq!(repository.get(&RunId::new("a")).unwrap().place, Some(1));
        assert_eq!(repository.get(&RunId::new("broken")).unwrap().place, None);
        assert_eq!(recomputer.handle().state(&key), KeyState::Clean);
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let key = key("any");
        let repository = Arc::new(InMemoryRuns::new());

        repository.insert(run("a", &key, "alice", 100.0, datetime!(2020-01-01 12:00)));
        repository.fail_next(2);

        recomputer(&repository).recompute_now(&key).await.unwrap();

        assert_eq!(repository.get(&RunId::new("a")).unwrap().place, Some(1));
    }

    #[tokio::test]
    async fn persistent_failures_give_up() {
        let key = key("any");
        let repository = Arc::new(InMemoryRuns::new());

        repository.insert(run("a", &key, "alice", 100.0, datetime!(2020-01-01 12:00)));
        repository.fail_next(3);

        let error = recomputer(&repository).recompute_now(&key).await.unwrap_err();

        assert!(matches!(
            error,
            RecomputeError::RepositoryUnavailable(RepositoryUnavailableError { attempts: 3, .. }),
        ));
        assert_eq!(repository.write_count(), 0);
    }

    #[tokio::test]
    async fn queued_changes_are_processed() {
        let any = key("queued-any");
        let glitchless = key("queued-glitchless");
        let repository = Arc::new(InMemoryRuns::new());

        repository.insert(run("a", &any, "alice", 100.0, datetime!(2020-01-01 12:00)));
        repository.insert(run("b", &glitchless, "bob", 200.0, datetime!(2020-01-01 12:00)));

        let recomputer = recomputer(&repository);
        let handle = recomputer.handle();
        let cancellation_token = CancellationToken::new();
        let watched = [any.clone(), glitchless.clone()];
        let mut events = Box::pin(events::subscribe().filter(move |event| {
            let relevant = watched.contains(event.key());
            async move { relevant }
        }));

        let task = tokio::spawn(recomputer.run(cancellation_token.clone()));

        handle.run_changed(RunId::new("a"), any.clone());
        handle.run_changed(RunId::new("b"), glitchless.clone());

        let mut updated = Vec::new();

        while updated.len() < 2 {
            let event = timeout(Duration::from_secs(5), events.next())
                .await
                .unwrap()
                .unwrap();

            if let Event::LeaderboardUpdated { ref key, .. } = *event {
                if !updated.contains(key) {
                    updated.push(key.clone());
                }
            }
        }

        cancellation_token.cancel();
        task.await.unwrap();

        assert_eq!(repository.get(&RunId::new("a")).unwrap().place, Some(1));
        assert_eq!(repository.get(&RunId::new("b")).unwrap().place, Some(1));
        assert_eq!(handle.state(&any), KeyState::Clean);
        assert_eq!(handle.state(&glitchless), KeyState::Clean);
    }

    #[tokio::test]
    async fn changes_only_rewrite_their_own_leaderboard() {
        let changed = key("isolated-any");
        let untouched = key("isolated-glitchless");
        let repository = Arc::new(InMemoryRuns::new());

        repository.insert(run("a", &changed, "alice", 100.0, datetime!(2020-01-01 12:00)));
        repository.insert(run("b", &untouched, "bob", 200.0, datetime!(2020-01-01 12:00)));

        let recomputer = recomputer(&repository);
        let handle = recomputer.handle();
        let cancellation_token = CancellationToken::new();
        let watched = changed.clone();
        let mut events = Box::pin(events::subscribe().filter(move |event| {
            let relevant = *event.key() == watched;
            async move { relevant }
        }));

        let task = tokio::spawn(recomputer.run(cancellation_token.clone()));

        handle.run_changed(RunId::new("a"), changed.clone());

        loop {
            let event = timeout(Duration::from_secs(5), events.next())
                .await
                .unwrap()
                .unwrap();

            if matches!(*event, Event::LeaderboardUpdated { .. }) {
                break;
            }
        }

        cancellation_token.cancel();
        task.await.unwrap();

        let b = repository.get(&RunId::new("b")).unwrap();

        assert_eq!(repository.get(&RunId::new("a")).unwrap().place, Some(1));
        assert_eq!(b.place, None);
        assert_eq!(b.points, 0.0);
        assert_eq!(repository.write_count(), 1);
        assert_eq!(handle.state(&untouched), KeyState::Clean);
    }

    #[tokio::test]
    async fn changes_during_recomputation_trigger_another_pass() {
        let key = key("low-percent");
        let repository = Arc::new(InMemoryRuns::new());

        repository.insert(run("a", &key, "alice", 100.0, datetime!(2020-01-01 12:00)));
        repository.set_latency(Duration::from_millis(50));

        let recomputer = recomputer(&repository);
        let handle = recomputer.handle();
        let cancellation_token = CancellationToken::new();
        let task = tokio::spawn(recomputer.run(cancellation_token.clone()));

        handle.run_changed(RunId::new("a"), key.clone());

        while handle.state(&key) != KeyState::Recomputing {
            sleep(Duration::from_millis(1)).await;
        }

        repository.insert(run("b", &key, "bob", 90.0, datetime!(2020-03-01 12:00)));
        handle.run_changed(RunId::new("b"), key.clone());

        assert_eq!(handle.state(&key), KeyState::RecomputingDirty);

        timeout(Duration::from_secs(5), async {
            while handle.state(&key) != KeyState::Clean {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        cancellation_token.cancel();
        task.await.unwrap();

        assert_eq!(repository.get(&RunId::new("b")).unwrap().place, Some(1));
        assert_eq!(repository.get(&RunId::new("a")).unwrap().place, Some(2));
    }
}
