//! Competition ranking ("1224") of runs by their comparison time.

use std::cmp::Ordering;

use crate::runs::Run;
use crate::time::Seconds;

/// A run together with the time it is ranked by.
#[derive(Debug, Clone, Copy)]
pub struct Timed<'r> {
    pub run: &'r Run,
    pub time: Seconds,
}

/// A [`Timed`] run with its place on the leaderboard.
#[derive(Debug, Clone, Copy)]
pub struct Ranked<'r> {
    pub run: &'r Run,
    pub time: Seconds,
    pub place: u32,
}

/// The order runs are listed in: fastest first, earlier approval first, then by ID.
pub fn leaderboard_order(a: &Timed<'_>, b: &Timed<'_>) -> Ordering {
    a.time
        .total_cmp(&b.time)
        .then_with(|| a.run.approved_at.cmp(&b.run.approved_at))
        .then_with(|| a.run.id.cmp(&b.run.id))
}

/// Ranks all non-obsolete runs.
///
/// Runs with exactly equal times share a place, and the place after a tie skips by the number of
/// tied runs. Obsolete runs are not part of the result.
pub fn rank<'r>(runs: impl IntoIterator<Item = Timed<'r>>) -> Vec<Ranked<'r>> {
    let mut runs = runs
        .into_iter()
        .filter(|timed| !timed.run.obsolete)
        .collect::<Vec<_>>();

    runs.sort_by(leaderboard_order);

    let mut ranked = Vec::<Ranked<'r>>::with_capacity(runs.len());

    for (idx, Timed { run, time }) in runs.into_iter().enumerate() {
        let place = match ranked.last() {
            Some(previous) if previous.time == time => previous.place,
            _ => u32::try_from(idx + 1).unwrap_or(u32::MAX),
        };

        ranked.push(Ranked { run, time, place });
    }

    ranked
}
