//! Computing a leaderboard's standings from its runs.
//!
//! [`compute()`] is pure: given the same runs, timing rules, configuration, and `as_of` date it
//! always produces the same standings. Persisting them is the job of [`crate::recompute`].

use std::collections::{HashMap, HashSet};

use time::Date;

use crate::config::PointsConfig;
use crate::points::{self, streaks, FormulaDomainError};
use crate::ranking::{self, Timed};
use crate::runs::{LeaderboardKey, PlayerId, RepositoryError, Run, RunId, RunRepository, RunStanding};
use crate::time::Seconds;
use crate::timing::{self, DataIntegrityError, TimingRules};

#[derive(Debug, Display, Error, From)]
pub enum ComputeLeaderboardError {
    #[display("{_0}")]
    DataIntegrity(DataIntegrityError),

    #[display("{_0}")]
    FormulaDomain(FormulaDomainError),
}

/// The result of [`compute()`].
#[derive(Debug, Clone, PartialEq)]
pub struct Computed {
    /// One entry per run: ranked runs in leaderboard order, then obsolete runs by ID.
    pub standings: Vec<RunStanding>,

    /// Runs that were not obsolete before, but are now.
    pub newly_obsolete: Vec<RunId>,

    pub record_time: Option<Seconds>,
}

/// Computes standings for every run on a leaderboard.
#[tracing::instrument(level = "debug", skip(runs, rules, config), fields(runs = runs.len()), err)]
pub fn compute(
    key: &LeaderboardKey,
    runs: &[Run],
    rules: &TimingRules,
    config: &PointsConfig,
    as_of: Date,
) -> Result<Computed, ComputeLeaderboardError> {
    let timed = runs
        .iter()
        .map(|run| timing::resolve_comparison_time(run, rules).map(|time| Timed { run, time }))
        .collect::<Result<Vec<_>, _>>()?;

    let newly_obsolete = if config.supersede_slower_runs {
        superseded(&timed)
    } else {
        HashSet::new()
    };

    let ranked = ranking::rank(
        timed
            .iter()
            .copied()
            .filter(|timed| !newly_obsolete.contains(&timed.run.id)),
    );

    let record_time = ranked.first().map(|ranked| ranked.time);
    let streaks = streaks::replay(timed.iter().copied());
    let mut standings = Vec::with_capacity(runs.len());

    if let Some(record_time) = record_time {
        for ranked in &ranked {
            let base = points::calculate(record_time, ranked.time, ranked.run.classification, config)?;
            let streak_bonus = if ranked.place == 1 {
                streaks::bonus_for_run(&streaks, ranked.run, as_of, &config.streak)
            } else {
                0.0
            };

            standings.push(RunStanding {
                run_id: ranked.run.id.clone(),
                place: Some(ranked.place),
                points: base + streak_bonus,
                streak_bonus,
            });
        }
    }

    let mut obsolete = runs
        .iter()
        .filter(|run| run.obsolete || newly_obsolete.contains(&run.id))
        .map(|run| run.id.clone())
        .collect::<Vec<_>>();

    obsolete.sort_unstable();
    standings.extend(obsolete.into_iter().map(RunStanding::obsolete));

    let mut newly_obsolete = newly_obsolete.into_iter().cloned().collect::<Vec<_>>();
    newly_obsolete.sort_unstable();

    debug!(%key, ranked = ranked.len(), newly_obsolete = newly_obsolete.len(), "computed standings");

    Ok(Computed { standings, newly_obsolete, record_time })
}

/// Returns the runs that are slower than another non-obsolete run of the same player.
///
/// Each player keeps only their fastest run, with ties going to the earlier approval. Anonymous
/// runs are never superseded, and neither is a run that is the best run of any of its players.
pub fn superseded<'r>(timed: &[Timed<'r>]) -> HashSet<&'r RunId> {
    let mut best = HashMap::<&'r PlayerId, Timed<'r>>::new();

    for &candidate in timed.iter().filter(|timed| !timed.run.obsolete) {
        for player in &candidate.run.players {
            best.entry(player)
                .and_modify(|current| {
                    if ranking::leaderboard_order(&candidate, current).is_lt() {
                        *current = candidate;
                    }
                })
                .or_insert(candidate);
        }
    }

    let keep = best
        .values()
        .map(|timed| timed.run)
        .map(|run| &run.id)
        .collect::<HashSet<&'r RunId>>();

    timed
        .iter()
        .map(|timed| timed.run)
        .filter(|run| !run.obsolete && !run.players.is_empty())
        .map(|run| &run.id)
        .filter(|id| !keep.contains(id))
        .collect()
}

/// A persisted run with its place and comparison time.
#[derive(Debug, Clone)]
pub struct RankedRun {
    pub run: Run,
    pub place: u32,

    /// `None` if the run has no usable time anymore; it will lose its place on the next
    /// recomputation.
    pub time: Option<Seconds>,
}

/// Returns the currently persisted ranking of a leaderboard, in leaderboard order.
///
/// Obsolete runs and runs that were never ranked are excluded.
#[tracing::instrument(level = "debug", skip(repository), err)]
pub async fn get_ranked<R>(
    repository: &R,
    key: &LeaderboardKey,
) -> Result<Vec<RankedRun>, RepositoryError>
where
    R: RunRepository,
{
    let rules = repository.fetch_timing_rules(key).await?;
    let mut ranked = repository
        .fetch_runs(key)
        .await?
        .into_iter()
        .filter(|run| !run.obsolete)
        .filter_map(|run| {
            let place = run.place?;
            let time = timing::resolve_comparison_time(&run, &rules)
                .inspect_err(|error| warn!(%error, "ranked run has no usable time"))
                .ok();

            Some(RankedRun { run, place, time })
        })
        .collect::<Vec<_>>();

    ranked.sort_by(|a, b| {
        a.place
            .cmp(&b.place)
            .then_with(|| a.run.approved_at.cmp(&b.run.approved_at))
            .then_with(|| a.run.id.cmp(&b.run.id))
    });

    Ok(ranked)
}
