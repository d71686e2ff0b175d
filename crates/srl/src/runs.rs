//! Runs and the leaderboards they belong to.

use std::future::Future;

use crate::database;
use crate::time::{Seconds, Timestamp};
use crate::timing::{TimingMethod, TimingRules};

mod memory;
pub use memory::InMemoryRuns;

mod mysql;

define_id_type! {
    /// A unique identifier for runs.
    pub struct RunId;
}

define_id_type! {
    /// A unique identifier for players.
    pub struct PlayerId;
}

define_id_type! {
    /// A unique identifier for games.
    pub struct GameId;
}

define_id_type! {
    /// A unique identifier for categories.
    pub struct CategoryId;
}

define_id_type! {
    /// A unique identifier for individual levels.
    pub struct LevelId;
}

/// The set of attributes that determines which runs compete with each other.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct LeaderboardKey {
    pub game: GameId,
    pub category: CategoryId,

    /// Only set for individual-level leaderboards.
    #[serde(default)]
    pub level: Option<LevelId>,

    /// Sub-category variable values; empty if the category has none.
    #[serde(default)]
    pub subcategory: String,
}

impl LeaderboardKey {
    pub fn is_individual_level(&self) -> bool {
        self.level.is_some()
    }
}

impl std::fmt::Display for LeaderboardKey {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(fmt, "{}/{}", self.game, self.category)?;

        if let Some(ref level) = self.level {
            write!(fmt, "/{level}")?;
        }

        if !self.subcategory.is_empty() {
            write!(fmt, " ({})", self.subcategory)?;
        }

        Ok(())
    }
}

/// What kind of leaderboard a run belongs to; determines the points scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    FullGame,
    IndividualLevel,
    CategoryExtension,
}

/// The times a run was submitted with.
///
/// Any of these may be `0`, which means the time was not recorded.
#[derive(Debug, Default, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Times {
    pub realtime: Seconds,
    pub realtime_noloads: Seconds,
    pub ingame: Seconds,
}

impl Times {
    pub fn get(&self, method: TimingMethod) -> Seconds {
        match method {
            TimingMethod::RealTime => self.realtime,
            TimingMethod::RealTimeNoLoads => self.realtime_noloads,
            TimingMethod::InGame => self.ingame,
        }
    }
}

/// An approved run.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub id: RunId,
    pub key: LeaderboardKey,
    pub classification: Classification,
    pub times: Times,

    /// Empty for anonymous runs.
    pub players: Vec<PlayerId>,

    pub approved_at: Timestamp,
    pub obsolete: bool,

    /// Current standing, as last written by a recomputation.
    pub place: Option<u32>,
    pub points: f64,
    pub streak_bonus: f64,
}

impl Run {
    /// Whether this run and `players` have at least one player in common.
    pub fn shares_player_with(&self, players: &[PlayerId]) -> bool {
        self.players.iter().any(|player| players.contains(player))
    }
}

/// The outcome of a recomputation for a single run.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RunStanding {
    pub run_id: RunId,

    /// `None` for obsolete runs.
    pub place: Option<u32>,

    /// Total points, streak bonus included.
    pub points: f64,
    pub streak_bonus: f64,
}

impl RunStanding {
    pub(crate) fn obsolete(run_id: RunId) -> Self {
        Self { run_id, place: None, points: 0.0, streak_bonus: 0.0 }
    }
}

#[derive(Debug, Display, Error, From)]
pub enum RepositoryError {
    #[display("{_0}")]
    Database(database::Error),

    #[display("run repository is unavailable")]
    #[from(ignore)]
    Unavailable,
}

impl From<sqlx::Error> for RepositoryError {
    fn from(error: sqlx::Error) -> Self {
        let error = database::Error::from(error);

        if error.is_connection_failure() {
            debug!(%error, "run repository is unreachable");
            return Self::Unavailable;
        }

        Self::Database(error)
    }
}

/// Storage of runs and leaderboard metadata.
///
/// Implementations must make [`write_results()`] atomic: either every standing is written or
/// none are.
///
/// [`write_results()`]: RunRepository::write_results
pub trait RunRepository: Send + Sync + 'static {
    /// Returns every run on the given leaderboard, obsolete runs included.
    fn fetch_runs(
        &self,
        key: &LeaderboardKey,
    ) -> impl Future<Output = Result<Vec<Run>, RepositoryError>> + Send;

    /// Returns the timing rules that apply to the given leaderboard.
    fn fetch_timing_rules(
        &self,
        key: &LeaderboardKey,
    ) -> impl Future<Output = Result<TimingRules, RepositoryError>> + Send;

    /// Persists recomputed standings and marks `newly_obsolete` runs as obsolete.
    fn write_results(
        &self,
        key: &LeaderboardKey,
        standings: &[RunStanding],
        newly_obsolete: &[RunId],
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Looks up which leaderboard a run belongs to.
    fn fetch_key(
        &self,
        run_id: &RunId,
    ) -> impl Future<Output = Result<Option<LeaderboardKey>, RepositoryError>> + Send;
}
