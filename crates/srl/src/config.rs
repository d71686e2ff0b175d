mod database;
pub use database::DatabaseConfig;

mod points;
pub use points::{PointsConfig, StreakConfig};

mod recompute;
pub use recompute::{RecomputeConfig, RetryPolicy};

#[derive(Debug, Default, Clone, serde::Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub database: DatabaseConfig,
    pub points: PointsConfig,
    pub recompute: RecomputeConfig,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = toml::from_str::<Config>("").unwrap();

        assert_eq!(config.points.max_full_game, 1000.0);
        assert_eq!(config.points.streak.max_months, 4);
        assert!(config.points.supersede_slower_runs);
        assert_eq!(config.recompute.retry.attempts.get(), 5);
    }

    #[test]
    fn overrides() {
        let config = toml::from_str::<Config>(
            r#"
            [points]
            max-full-game = 100.0
            max-individual-level = 25.0

            [points.streak]
            bonus-full-game = 12.5

            [recompute]
            workers = 2

            [recompute.retry]
            initial-backoff-ms = 10
            timeout-ms = 1500
            "#,
        )
        .unwrap();

        assert_eq!(config.points.max_full_game, 100.0);
        assert_eq!(config.points.max_individual_level, 25.0);
        assert_eq!(config.points.max_category_extension, 50.0);
        assert_eq!(config.points.streak.bonus_full_game, 12.5);
        assert_eq!(config.recompute.workers.get(), 2);
        assert_eq!(config.recompute.retry.initial_backoff, Duration::from_millis(10));
        assert_eq!(config.recompute.retry.timeout, Duration::from_millis(1500));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(toml::from_str::<Config>("[points]\nmax-points = 1").is_err());
    }
}
