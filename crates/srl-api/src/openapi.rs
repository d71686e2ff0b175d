use std::sync::LazyLock;

use axum::response::{IntoResponse, Response};
use axum::{routing, Router};
use utoipa::openapi::OpenApi;

use crate::extract::Json;

static SCHEMA: LazyLock<OpenApi> = LazyLock::new(schema);

#[derive(utoipa::OpenApi)]
#[openapi(
    info(
        title = "Speedrun Leaderboards API",
        description = "Leaderboard standings with points, recomputed whenever runs change.",
        license(name = "GPL-3.0", url = "https://www.gnu.org/licenses/gpl-3.0.en.html"),
    ),
    tags(
        (name = "Leaderboards"),
        (name = "Runs", description = "change notifications from the run submission service"),
    ),
    components(
        schemas(
            crate::leaderboards::Leaderboard,
            crate::leaderboards::LeaderboardEntry,
            crate::runs::RunChange,
            crate::runs::RunChangeAccepted,
            crate::runs::ScheduledLeaderboard,
        ),
    ),
    paths(
        crate::leaderboards::get_leaderboard,
        crate::runs::run_changed,
    ),
)]
pub struct Schema;

pub fn schema() -> OpenApi {
    <Schema as utoipa::OpenApi>::openapi()
}

pub(crate) fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/openapi.json", routing::get(serve_openapi_json))
}

async fn serve_openapi_json() -> Response {
    Json(&*SCHEMA).into_response()
}
