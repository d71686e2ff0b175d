use axum::extract::{FromRef, State};
use axum::routing::{self, Router};
use srl::recompute::KeyState;
use srl::runs::{LeaderboardKey, RunId, RunRepository};
use srl::Context;

use crate::extract::{Json, Path};
use crate::leaderboards::LeaderboardParams;
use crate::middleware::localhost::client_is_localhost;
use crate::response::{Accepted, ErrorResponse};

pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    Context: FromRef<S>,
{
    Router::new()
        .route("/{run_id}/changed", routing::post(run_changed))
        .route_layer(axum::middleware::from_fn(client_is_localhost))
}

/// Describes where a changed run lives.
#[derive(Debug, Default, serde::Deserialize, utoipa::ToSchema)]
#[serde(default, deny_unknown_fields)]
pub struct RunChange {
    /// The leaderboard the run is on now.
    ///
    /// If omitted, it is looked up in the database. Deleted runs must include it.
    #[schema(value_type = Option<Object>)]
    key: Option<LeaderboardParams>,

    /// The leaderboard the run was on before it was edited, if it moved.
    #[schema(value_type = Option<Object>)]
    previous_key: Option<LeaderboardParams>,
}

#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct RunChangeAccepted {
    #[schema(value_type = String)]
    run_id: RunId,

    /// Every leaderboard scheduled for recomputation.
    leaderboards: Vec<ScheduledLeaderboard>,
}

#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct ScheduledLeaderboard {
    #[schema(value_type = Object)]
    key: LeaderboardKey,

    #[schema(value_type = String, example = "dirty")]
    state: KeyState,
}

/// Reports that a run was created, edited, approved, or deleted.
///
/// The affected leaderboards are recomputed in the background. This endpoint is only reachable
/// from localhost.
#[tracing::instrument(skip(cx, change))]
#[utoipa::path(
    post,
    path = "/runs/{run_id}/changed",
    tag = "Runs",
    params(("run_id" = String, Path)),
    request_body(content = RunChange, description = "may be omitted for runs that still exist"),
    responses(
        (status = 202, body = RunChangeAccepted),
        (status = 404, description = "unknown run and no leaderboard given"),
        (status = 422, description = "invalid request body"),
        (status = 503, description = "the database is unavailable"),
    ),
)]
async fn run_changed(
    State(cx): State<Context>,
    Path(run_id): Path<RunId>,
    change: Option<Json<RunChange>>,
) -> Result<Accepted<RunChangeAccepted>, ErrorResponse> {
    let RunChange { key, previous_key } = change.map(|Json(change)| change).unwrap_or_default();

    let key = match key {
        Some(params) => params.into_key(),
        None => match cx.database().fetch_key(&run_id).await? {
            Some(key) => key,
            None => return Err(ErrorResponse::unknown_run(&run_id)),
        },
    };

    let previous_key = previous_key
        .map(LeaderboardParams::into_key)
        .filter(|previous_key| *previous_key != key);

    let leaderboards = std::iter::once(key)
        .chain(previous_key)
        .map(|key| {
            cx.recompute().run_changed(run_id.clone(), key.clone());
            ScheduledLeaderboard { state: cx.recompute().state(&key), key }
        })
        .collect();

    Ok(Accepted(RunChangeAccepted { run_id, leaderboards }))
}
