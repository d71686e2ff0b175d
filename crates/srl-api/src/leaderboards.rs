use axum::extract::{FromRef, State};
use axum::routing::{self, Router};
use srl::recompute::KeyState;
use srl::runs::{CategoryId, GameId, LeaderboardKey, LevelId, PlayerId, RunId};
use srl::time::{Seconds, Timestamp};
use srl::Context;

use crate::extract::{Json, Query};
use crate::response::ErrorResponse;

pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    Context: FromRef<S>,
{
    Router::new().route("/", routing::get(get_leaderboard))
}

/// Identifies a leaderboard.
#[derive(Debug, Clone, serde::Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LeaderboardParams {
    #[param(value_type = String)]
    game: GameId,

    #[param(value_type = String)]
    category: CategoryId,

    /// Only for individual-level leaderboards.
    #[param(value_type = Option<String>)]
    level: Option<LevelId>,

    /// Sub-category variable values.
    #[serde(default)]
    subcategory: String,
}

impl LeaderboardParams {
    pub(crate) fn into_key(self) -> LeaderboardKey {
        LeaderboardKey {
            game: self.game,
            category: self.category,
            level: self.level.filter(|level| !level.as_str().is_empty()),
            subcategory: self.subcategory,
        }
    }
}

#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct Leaderboard {
    #[schema(value_type = String)]
    game: GameId,

    #[schema(value_type = String)]
    category: CategoryId,

    #[schema(value_type = Option<String>)]
    level: Option<LevelId>,

    subcategory: String,

    /// Whether the standings below are up to date.
    #[schema(value_type = String, example = "clean")]
    state: KeyState,

    /// Time of the current world record, in seconds.
    #[schema(value_type = Option<f64>)]
    record_time: Option<Seconds>,

    /// Ranked runs in leaderboard order.
    entries: Vec<LeaderboardEntry>,
}

#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct LeaderboardEntry {
    #[schema(value_type = String)]
    id: RunId,

    #[schema(minimum = 1)]
    place: u32,

    #[schema(value_type = Vec<String>)]
    players: Vec<PlayerId>,

    /// Time in seconds, according to the leaderboard's timing method.
    #[schema(value_type = Option<f64>)]
    time: Option<Seconds>,

    /// `time` in a human-readable format.
    time_formatted: Option<String>,

    /// Total points, streak bonus included.
    points: f64,
    streak_bonus: f64,

    #[schema(value_type = String, format = DateTime)]
    approved_at: Timestamp,
}

impl From<srl::leaderboards::RankedRun> for LeaderboardEntry {
    fn from(srl::leaderboards::RankedRun { run, place, time }: srl::leaderboards::RankedRun) -> Self {
        Self {
            id: run.id,
            place,
            players: run.players,
            time,
            time_formatted: time.map(|time| time.to_string()),
            points: run.points,
            streak_bonus: run.streak_bonus,
            approved_at: run.approved_at,
        }
    }
}

/// Returns the current standings of a leaderboard.
///
/// Standings are recomputed in the background whenever a run changes; `state` tells whether a
/// recomputation is still pending.
#[tracing::instrument(skip(cx))]
#[utoipa::path(
    get,
    path = "/leaderboards",
    tag = "Leaderboards",
    params(LeaderboardParams),
    responses(
        (status = 200, body = Leaderboard),
        (status = 400, description = "invalid query parameters"),
        (status = 503, description = "the database is unavailable"),
    ),
)]
async fn get_leaderboard(
    State(cx): State<Context>,
    Query(params): Query<LeaderboardParams>,
) -> Result<Json<Leaderboard>, ErrorResponse> {
    let key = params.into_key();
    let ranked = srl::leaderboards::get_ranked(cx.database(), &key).await?;
    let record_time = ranked
        .first()
        .filter(|entry| entry.place == 1)
        .and_then(|entry| entry.time);

    Ok(Json(Leaderboard {
        state: cx.recompute().state(&key),
        record_time,
        entries: ranked.into_iter().map(LeaderboardEntry::from).collect(),
        game: key.game,
        category: key.category,
        level: key.level,
        subcategory: key.subcategory,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_from_query_string() {
        let params = serde_html_form::from_str::<LeaderboardParams>(
            "game=thps4&category=any%25&subcategory=pc",
        )
        .unwrap();

        let key = params.into_key();

        assert_eq!(key.game.as_str(), "thps4");
        assert_eq!(key.category.as_str(), "any%");
        assert_eq!(key.level, None);
        assert_eq!(key.subcategory, "pc");
    }

    #[test]
    fn empty_level_is_full_game() {
        let params =
            serde_html_form::from_str::<LeaderboardParams>("game=thps4&category=any&level=")
                .unwrap();

        assert!(!params.into_key().is_individual_level());

        let params =
            serde_html_form::from_str::<LeaderboardParams>("game=thps4&category=il&level=college")
                .unwrap();

        assert!(params.into_key().is_individual_level());
    }

    #[test]
    fn missing_game_is_rejected() {
        assert!(serde_html_form::from_str::<LeaderboardParams>("category=any").is_err());
    }
}
