//! The points formula.
//!
//! A world record is worth the leaderboard's maximum (see [`PointsConfig::max_points()`]). Every
//! other run decays exponentially with how much slower it is than the record:
//!
//! ```text
//! points = floor(max * e^(k * (record / time - 1)))
//! ```
//!
//! For records shorter than [`PointsConfig::short_run_threshold`], `k` is scaled by
//! `sqrt(record / threshold)` so that small absolute gaps on short leaderboards aren't punished
//! as hard.

use crate::config::PointsConfig;
use crate::runs::Classification;
use crate::time::Seconds;

pub mod streaks;

#[derive(Debug, Display, Error)]
pub enum FormulaDomainError {
    #[display("record time must be a positive number (got {record_time})")]
    InvalidRecordTime { record_time: f64 },

    #[display("run time must be a positive number (got {run_time})")]
    InvalidRunTime { run_time: f64 },

    #[display("run time {run_time} is faster than the record time {record_time}")]
    FasterThanRecord { record_time: f64, run_time: f64 },
}

/// The decay constant for a leaderboard whose record is `record_time`.
pub fn decay_constant(record_time: Seconds, config: &PointsConfig) -> f64 {
    let record_time = record_time.as_f64();

    if record_time < config.short_run_threshold {
        config.decay * (record_time / config.short_run_threshold).sqrt()
    } else {
        config.decay
    }
}

/// Calculates the base points of a run, not including any streak bonus.
///
/// Only a run that ties the record is worth the maximum; every slower run is worth strictly
/// less, and never negative.
pub fn calculate(
    record_time: Seconds,
    run_time: Seconds,
    classification: Classification,
    config: &PointsConfig,
) -> Result<f64, FormulaDomainError> {
    if !record_time.is_valid() {
        return Err(FormulaDomainError::InvalidRecordTime { record_time: record_time.as_f64() });
    }

    if !run_time.is_valid() {
        return Err(FormulaDomainError::InvalidRunTime { run_time: run_time.as_f64() });
    }

    if run_time < record_time {
        return Err(FormulaDomainError::FasterThanRecord {
            record_time: record_time.as_f64(),
            run_time: run_time.as_f64(),
        });
    }

    let max = config.max_points(classification);

    if run_time == record_time {
        return Ok(max);
    }

    let k = decay_constant(record_time, config);
    let ratio = record_time.as_f64() / run_time.as_f64();
    let points = (max * (k * (ratio - 1.0)).exp()).floor();

    Ok(points.min(max - 1.0).max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calc(record: f64, run: f64, classification: Classification) -> f64 {
        calculate(
            Seconds::new(record),
            Seconds::new(run),
            classification,
            &PointsConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn record_is_worth_max() {
        assert_eq!(calc(100.0, 100.0, Classification::FullGame), 1000.0);
        assert_eq!(calc(25.0, 25.0, Classification::IndividualLevel), 250.0);
        assert_eq!(calc(300.0, 300.0, Classification::CategoryExtension), 50.0);
    }

    #[test]
    fn slower_runs_decay() {
        assert_eq!(calc(80.0, 100.0, Classification::FullGame), 380.0);
        assert_eq!(calc(100.0, 101.0, Classification::FullGame), 953.0);
    }

    #[test]
    fn short_records_decay_slower() {
        assert_eq!(calc(30.0, 40.0, Classification::IndividualLevel), 106.0);
        assert_eq!(calc(10.0, 20.0, Classification::CategoryExtension), 18.0);

        let config = PointsConfig::default();
        let corrected = decay_constant(Seconds::new(30.0), &config);

        assert!(corrected < config.decay);
        assert_eq!(decay_constant(Seconds::new(60.0), &config), config.decay);
    }

    #[test]
    fn only_the_record_is_worth_max() {
        assert_eq!(calc(100.0, 100.000_000_000_1, Classification::FullGame), 999.0);
    }

    #[test]
    fn points_never_increase_with_time() {
        let times = [100.0, 100.5, 101.0, 120.0, 200.0, 1_000.0, 100_000.0];
        let points = times.map(|time| calc(100.0, time, Classification::FullGame));

        assert!(points.windows(2).all(|pair| pair[0] >= pair[1]), "{points:?}");
        assert!(points.iter().all(|&points| points >= 0.0));
    }

    #[test]
    fn rejects_nonsense() {
        let config = PointsConfig::default();
        let calc = |record, run| {
            calculate(Seconds::new(record), Seconds::new(run), Classification::FullGame, &config)
        };

        assert!(matches!(calc(0.0, 10.0), Err(FormulaDomainError::InvalidRecordTime { .. })));
        assert!(matches!(calc(-1.0, 10.0), Err(FormulaDomainError::InvalidRecordTime { .. })));
        assert!(matches!(calc(10.0, 0.0), Err(FormulaDomainError::InvalidRunTime { .. })));
        assert!(matches!(calc(10.0, f64::NAN), Err(FormulaDomainError::InvalidRunTime { .. })));
        assert!(matches!(calc(10.0, 9.0), Err(FormulaDomainError::FasterThanRecord { .. })));
    }
}
