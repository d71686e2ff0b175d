//! Picking the time a run is compared by.
//!
//! Runs can be submitted with up to three times (real time, real time without loads, and in-game
//! time). Which one counts depends on the game and category the run was submitted to.

use std::str::FromStr;

use crate::runs::{Run, RunId};
use crate::time::Seconds;

/// A method of timing a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum TimingMethod {
    #[default]
    #[serde(rename = "realtime")]
    RealTime,

    #[serde(rename = "realtime_noloads")]
    RealTimeNoLoads,

    #[serde(rename = "ingame")]
    InGame,
}

/// Order in which timing methods are tried when the configured one has no time.
pub const FALLBACK_ORDER: [TimingMethod; 3] =
    [TimingMethod::RealTime, TimingMethod::RealTimeNoLoads, TimingMethod::InGame];

impl TimingMethod {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RealTime => "realtime",
            Self::RealTimeNoLoads => "realtime_noloads",
            Self::InGame => "ingame",
        }
    }
}

#[derive(Debug, Display, Error)]
#[display("unknown timing method {_0:?}")]
pub struct UnknownTimingMethod(#[error(not(source))] pub String);

impl FromStr for TimingMethod {
    type Err = UnknownTimingMethod;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "realtime" => Ok(Self::RealTime),
            "realtime_noloads" => Ok(Self::RealTimeNoLoads),
            "ingame" => Ok(Self::InGame),
            _ => Err(UnknownTimingMethod(value.to_owned())),
        }
    }
}

/// Timing configuration for a single leaderboard.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TimingRules {
    /// The game's default for full-game runs.
    pub full_game: TimingMethod,

    /// The game's default for individual-level runs.
    pub individual_level: TimingMethod,

    /// A per-category override; takes precedence over the game's defaults.
    pub category_override: Option<TimingMethod>,
}

impl TimingRules {
    /// The game's default method for `run`, ignoring any category override.
    pub fn game_default(&self, run: &Run) -> TimingMethod {
        if run.key.is_individual_level() {
            self.individual_level
        } else {
            self.full_game
        }
    }

    /// Methods to try for `run`, most preferred first.
    ///
    /// The category override comes first, then the game's default, then [`FALLBACK_ORDER`].
    pub fn preference(&self, run: &Run) -> impl Iterator<Item = TimingMethod> {
        self.category_override
            .into_iter()
            .chain([self.game_default(run)])
            .chain(FALLBACK_ORDER)
    }
}

#[derive(Debug, Display, Error)]
#[display("run {run_id} has no valid time for any timing method")]
pub struct DataIntegrityError {
    pub run_id: RunId,
}

/// Returns the time `run` should be ranked by.
///
/// This is the run's time for the first method in [`TimingRules::preference()`] it has a valid
/// time for.
pub fn resolve_comparison_time(
    run: &Run,
    rules: &TimingRules,
) -> Result<Seconds, DataIntegrityError> {
    let mut preference = rules.preference(run).enumerate();

    preference
        .find_map(|(idx, method)| {
            let time = run.times.get(method);
            time.is_valid().then_some((idx, method, time))
        })
        .map(|(idx, method, time)| {
            if idx > 0 {
                trace!(run.id = %run.id, ?method, %time, "used fallback time");
            }

            time
        })
        .ok_or_else(|| DataIntegrityError { run_id: run.id.clone() })
}
