use serde::Deserialize;

use crate::runs::Classification;

/// Scoring parameters.
///
/// The defaults are the site's current (revised) scale.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct PointsConfig {
    /// Points awarded to a full-game world record.
    pub max_full_game: f64,

    /// Points awarded to an individual-level world record.
    pub max_individual_level: f64,

    /// Points awarded to a category-extension world record.
    pub max_category_extension: f64,

    /// Base decay constant of the points curve.
    pub decay: f64,

    /// Records shorter than this (in seconds) get a gentler decay.
    pub short_run_threshold: f64,

    /// Whether a player's slower runs are made obsolete by their fastest one.
    pub supersede_slower_runs: bool,

    pub streak: StreakConfig,
}

impl PointsConfig {
    /// The points a world record is worth on a leaderboard of the given classification.
    pub fn max_points(&self, classification: Classification) -> f64 {
        match classification {
            Classification::FullGame => self.max_full_game,
            Classification::IndividualLevel => self.max_individual_level,
            Classification::CategoryExtension => self.max_category_extension,
        }
    }
}

impl Default for PointsConfig {
    fn default() -> Self {
        Self {
            max_full_game: 1000.0,
            max_individual_level: 250.0,
            max_category_extension: 50.0,
            decay: 4.8284,
            short_run_threshold: 60.0,
            supersede_slower_runs: true,
            streak: StreakConfig::default(),
        }
    }
}

/// Bonus points for holding a world record over time.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct StreakConfig {
    /// Bonus per whole month for full-game records.
    pub bonus_full_game: f64,

    /// Bonus per whole month for individual-level records.
    pub bonus_individual_level: f64,

    /// Months beyond this don't add any more bonus.
    pub max_months: u32,
}

impl StreakConfig {
    pub fn bonus_per_month(&self, classification: Classification) -> f64 {
        match classification {
            Classification::FullGame => self.bonus_full_game,
            Classification::IndividualLevel => self.bonus_individual_level,
            Classification::CategoryExtension => 0.0,
        }
    }
}

impl Default for StreakConfig {
    fn default() -> Self {
        Self {
            bonus_full_game: 125.0,
            bonus_individual_level: 31.25,
            max_months: 4,
        }
    }
}
