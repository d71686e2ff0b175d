//! World-record streaks.
//!
//! A streak starts when a player (or group of players) sets a new world record, and continues for
//! as long as every subsequent record on the same leaderboard is set by someone who already holds
//! it. Each whole month a streak has lasted is worth a bonus, up to
//! [`StreakConfig::max_months`].

use time::{Date, Month};

use crate::config::StreakConfig;
use crate::ranking::Timed;
use crate::runs::{Classification, PlayerId, Run, RunId};
use crate::time::Seconds;

#[derive(Debug, Clone, PartialEq)]
pub struct Streak {
    /// The players of the most recent record run in this streak.
    pub holders: Vec<PlayerId>,

    /// The most recent record run in this streak.
    pub record_run: RunId,
    pub record_time: Seconds,

    pub started_on: Date,

    /// The date the record was taken by someone else; `None` while the streak is live.
    pub ended_on: Option<Date>,
}

impl Streak {
    fn new(run: &Run, time: Seconds) -> Self {
        Self {
            holders: run.players.clone(),
            record_run: run.id.clone(),
            record_time: time,
            started_on: run.approved_at.date(),
            ended_on: None,
        }
    }

    pub fn is_live(&self) -> bool {
        self.ended_on.is_none()
    }

    /// Whole months held as of `as_of`, capped at `max_months`.
    pub fn months_held(&self, as_of: Date, max_months: u32) -> u32 {
        let end = self.ended_on.map_or(as_of, |ended_on| ended_on.min(as_of));

        whole_months_between(self.started_on, end).min(max_months)
    }

    pub fn bonus(&self, as_of: Date, classification: Classification, config: &StreakConfig) -> f64 {
        let months = self.months_held(as_of, config.max_months);

        (f64::from(months) * config.bonus_per_month(classification)).floor()
    }

    /// The bonus this streak was worth when it ended.
    pub fn final_bonus(&self, classification: Classification, config: &StreakConfig) -> Option<f64> {
        self.ended_on
            .map(|ended_on| self.bonus(ended_on, classification, config))
    }
}

/// Replays a leaderboard's history in approval order and returns every streak, oldest first.
///
/// All runs are considered, including obsolete ones. Only a strictly faster time takes the
/// record. At most the last returned streak is live.
pub fn replay<'r>(runs: impl IntoIterator<Item = Timed<'r>>) -> Vec<Streak> {
    let mut runs = runs.into_iter().collect::<Vec<_>>();

    runs.sort_by(|a, b| {
        a.run
            .approved_at
            .cmp(&b.run.approved_at)
            .then_with(|| a.run.id.cmp(&b.run.id))
    });

    let mut streaks = Vec::<Streak>::new();

    for Timed { run, time } in runs {
        match streaks.last_mut() {
            None => streaks.push(Streak::new(run, time)),
            Some(streak) if time.total_cmp(&streak.record_time).is_ge() => {},
            Some(streak) if run.shares_player_with(&streak.holders) => {
                trace!(run.id = %run.id, %time, "record extends streak");
                streak.holders = run.players.clone();
                streak.record_run = run.id.clone();
                streak.record_time = time;
            },
            Some(streak) => {
                trace!(run.id = %run.id, %time, "record ends streak");
                streak.ended_on = Some(run.approved_at.date());
                streaks.push(Streak::new(run, time));
            },
        }
    }

    streaks
}

fn live_streak(streaks: &[Streak]) -> Option<&Streak> {
    streaks.last().filter(|streak| streak.is_live())
}

/// The streak bonus `player` currently earns; `0` unless they hold the live streak.
pub fn bonus_for_player(
    streaks: &[Streak],
    player: &PlayerId,
    as_of: Date,
    classification: Classification,
    config: &StreakConfig,
) -> f64 {
    live_streak(streaks)
        .filter(|streak| streak.holders.contains(player))
        .map_or(0.0, |streak| streak.bonus(as_of, classification, config))
}

/// The streak bonus `run` earns; `0` unless one of its players holds the live streak.
pub fn bonus_for_run(streaks: &[Streak], run: &Run, as_of: Date, config: &StreakConfig) -> f64 {
    run.players
        .iter()
        .map(|player| bonus_for_player(streaks, player, as_of, run.classification, config))
        .fold(0.0, f64::max)
}

/// The `months`-th monthly anniversary of `start`.
///
/// Days that don't exist in the target month are clamped to its last day, so the first
/// anniversary of January 31st is the last day of February.
pub fn anniversary(start: Date, months: i32) -> Option<Date> {
    let index = start.year() * 12 + i32::from(u8::from(start.month())) - 1 + months;
    let year = index.div_euclid(12);
    let month = u8::try_from(index.rem_euclid(12) + 1)
        .ok()
        .and_then(|month| Month::try_from(month).ok())?;
    let day = start.day().min(month.length(year));

    Date::from_calendar_date(year, month, day).ok()
}

/// Number of monthly anniversaries of `start` that fall on or before `end`.
pub fn whole_months_between(start: Date, end: Date) -> u32 {
    if end <= start {
        return 0;
    }

    let mut months = (end.year() - start.year()) * 12
        + (i32::from(u8::from(end.month())) - i32::from(u8::from(start.month())));

    if anniversary(start, months).is_some_and(|anniversary| anniversary > end) {
        months -= 1;
    }

    u32::try_from(months).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};
    use time::PrimitiveDateTime;

    use super::*;
    use crate::runs::Times;
    use crate::time::Timestamp;
    use crate::timing::tests::run;

    fn approved(id: &str, players: &[&str], approved_at: PrimitiveDateTime) -> Run {
        let mut run = run(id, Times::default());
        run.players = players.iter().copied().map(PlayerId::new).collect();
        run.approved_at = Timestamp::from(approved_at.assume_utc());
        run
    }

    fn timed(runs: &[(Run, f64)]) -> Vec<Timed<'_>> {
        runs.iter()
            .map(|(run, time)| Timed { run, time: Seconds::new(*time) })
            .collect()
    }

    #[test]
    fn whole_months() {
        assert_eq!(whole_months_between(date!(2024-01-15), date!(2024-04-14)), 2);
        assert_eq!(whole_months_between(date!(2024-01-15), date!(2024-04-15)), 3);
        assert_eq!(whole_months_between(date!(2024-01-31), date!(2024-02-28)), 0);
        assert_eq!(whole_months_between(date!(2024-01-31), date!(2024-02-29)), 1);
        assert_eq!(whole_months_between(date!(2023-11-30), date!(2024-02-29)), 3);
        assert_eq!(whole_months_between(date!(2024-05-01), date!(2024-04-01)), 0);
    }

    #[test]
    fn anniversaries_clamp_to_end_of_month() {
        assert_eq!(anniversary(date!(2024-01-31), 1), Some(date!(2024-02-29)));
        assert_eq!(anniversary(date!(2023-01-31), 1), Some(date!(2023-02-28)));
        assert_eq!(anniversary(date!(2024-11-30), 3), Some(date!(2025-02-28)));
    }

    #[test]
    fn improving_your_own_record_continues_the_streak() {
        let runs = [
            (approved("a", &["alice"], datetime!(2024-01-01 12:00)), 100.0),
            (approved("b", &["alice"], datetime!(2024-03-01 12:00)), 95.0),
        ];
        let streaks = replay(timed(&runs));

        assert_eq!(streaks.len(), 1);
        assert!(streaks[0].is_live());
        assert_eq!(streaks[0].started_on, date!(2024-01-01));
        assert_eq!(streaks[0].record_run, RunId::new("b"));
    }

    #[test]
    fn someone_else_taking_the_record_ends_the_streak() {
        let runs = [
            (approved("a", &["alice"], datetime!(2024-01-01 12:00)), 100.0),
            (approved("b", &["alice"], datetime!(2024-03-01 12:00)), 95.0),
            (approved("c", &["bob"], datetime!(2024-05-10 12:00)), 90.0),
        ];
        let streaks = replay(timed(&runs));
        let config = StreakConfig::default();

        assert_eq!(streaks.len(), 2);
        assert_eq!(streaks[0].ended_on, Some(date!(2024-05-10)));
        assert_eq!(streaks[0].final_bonus(Classification::FullGame, &config), Some(500.0));
        assert!(streaks[1].is_live());

        let as_of = date!(2024-08-10);
        let alice = PlayerId::new("alice");
        let bob = PlayerId::new("bob");

        assert_eq!(bonus_for_player(&streaks, &alice, as_of, Classification::FullGame, &config), 0.0);
        assert_eq!(bonus_for_player(&streaks, &bob, as_of, Classification::FullGame, &config), 375.0);
    }

    #[test]
    fn tying_the_record_does_not_take_it() {
        let runs = [
            (approved("a", &["alice"], datetime!(2024-01-01 12:00)), 100.0),
            (approved("b", &["bob"], datetime!(2024-02-01 12:00)), 100.0),
        ];
        let streaks = replay(timed(&runs));

        assert_eq!(streaks.len(), 1);
        assert_eq!(streaks[0].holders, [PlayerId::new("alice")]);
    }

    #[test]
    fn shared_players_continue_the_streak() {
        let runs = [
            (approved("a", &["alice"], datetime!(2024-01-01 12:00)), 100.0),
            (approved("b", &["alice", "carol"], datetime!(2024-02-01 12:00)), 90.0),
            (approved("c", &["carol"], datetime!(2024-03-01 12:00)), 80.0),
        ];
        let streaks = replay(timed(&runs));

        assert_eq!(streaks.len(), 1);
        assert_eq!(streaks[0].holders, [PlayerId::new("carol")]);
        assert_eq!(streaks[0].started_on, date!(2024-01-01));
    }

    #[test]
    fn obsolete_runs_still_count() {
        let mut first = approved("a", &["alice"], datetime!(2024-01-01 12:00));
        first.obsolete = true;

        let runs = [(first, 100.0), (approved("b", &["alice"], datetime!(2024-06-01 12:00)), 99.0)];
        let streaks = replay(timed(&runs));

        assert_eq!(streaks.len(), 1);
        assert_eq!(streaks[0].started_on, date!(2024-01-01));
    }

    #[test]
    fn bonus_is_capped() {
        let runs = [(approved("a", &["alice"], datetime!(2020-01-01 12:00)), 100.0)];
        let streaks = replay(timed(&runs));
        let config = StreakConfig::default();
        let as_of = date!(2024-01-01);

        assert_eq!(streaks[0].months_held(as_of, config.max_months), 4);
        assert_eq!(bonus_for_run(&streaks, &runs[0].0, as_of, &config), 500.0);
    }

    #[test]
    fn individual_level_bonus_is_floored() {
        let runs = [(approved("a", &["alice"], datetime!(2024-01-01 12:00)), 30.0)];
        let streaks = replay(timed(&runs));
        let config = StreakConfig::default();

        let bonus = streaks[0].bonus(date!(2024-04-01), Classification::IndividualLevel, &config);

        assert_eq!(bonus, 93.0);
        assert_eq!(streaks[0].bonus(date!(2024-04-01), Classification::CategoryExtension, &config), 0.0);
    }

    #[test]
    fn individual_level_bonus_is_capped() {
        let runs = [(approved("a", &["alice"], datetime!(2020-01-01 12:00)), 30.0)];
        let streaks = replay(timed(&runs));
        let config = StreakConfig::default();

        for as_of in [date!(2020-05-01), date!(2020-12-01), date!(2024-01-01)] {
            let bonus = streaks[0].bonus(as_of, Classification::IndividualLevel, &config);
            assert_eq!(bonus, 125.0, "as of {as_of}");
        }
    }

    #[test]
    fn anonymous_records_earn_nothing() {
        let runs = [
            (approved("a", &["alice"], datetime!(2024-01-01 12:00)), 100.0),
            (approved("b", &[], datetime!(2024-02-01 12:00)), 90.0),
        ];
        let streaks = replay(timed(&runs));
        let config = StreakConfig::default();

        assert_eq!(streaks.len(), 2);
        assert!(streaks[1].holders.is_empty());
        assert_eq!(bonus_for_run(&streaks, &runs[1].0, date!(2024-09-01), &config), 0.0);
    }
}
