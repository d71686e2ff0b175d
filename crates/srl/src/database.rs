//! The MySQL-backed run repository.
//!
//! The following tables are expected to exist:
//!
//! - `Games (id, default_timing, il_default_timing, is_category_extension)`
//! - `Categories (id, game_id, default_timing)`; `default_timing` is nullable
//! - `Runs (id, game_id, category_id, level_id, subcategory, run_type, time_secs, timenl_secs,
//!   timeigt_secs, approved_at, obsolete)`
//! - `RunPlayers (run_id, player_id, ordinal)`
//! - `RunStandings (run_id, place, points, streak_bonus)`, keyed by `run_id`
//!
//! Timing methods are stored as `realtime`, `realtime_noloads`, or `ingame`.

use std::num::NonZero;

use sqlx::mysql::{MySql, MySqlPoolOptions};
use url::Url;

mod error;
pub use error::{Error, Result};

pub type QueryBuilder<'args> = sqlx::QueryBuilder<'args, MySql>;

/// A handle to the database.
#[derive(Debug, AsRef, Clone)]
#[debug("{}", std::any::type_name::<Driver>())]
pub struct Database<Driver: sqlx::Database = MySql> {
    connections: sqlx::Pool<Driver>,
}

#[derive(Debug)]
pub struct DatabaseConnectionOptions<'a> {
    pub url: &'a Url,
    pub min_connections: u32,
    pub max_connections: Option<NonZero<u32>>,
}

#[derive(Debug, Display, Error, From)]
#[display("failed to establish database connection: {_0}")]
pub struct EstablishDatabaseConnectionError(sqlx::Error);

impl Database {
    #[tracing::instrument(level = "debug", fields(%url), err)]
    pub async fn connect(
        DatabaseConnectionOptions { url, min_connections, max_connections }: DatabaseConnectionOptions<'_>,
    ) -> Result<Self, EstablishDatabaseConnectionError> {
        let max_connections = max_connections.map_or_else(
            || {
                std::thread::available_parallelism()
                    .ok()
                    .and_then(|amount| u32::try_from(amount.get()).ok())
                    .unwrap_or(1)
            },
            NonZero::get,
        );

        MySqlPoolOptions::new()
            .min_connections(min_connections)
            .max_connections(max_connections)
            .connect(url.as_str())
            .await
            .map(|pool| Self { connections: pool })
            .map_err(EstablishDatabaseConnectionError)
    }
}

impl<Driver: sqlx::Database> Database<Driver> {
    pub(crate) fn pool(&self) -> &sqlx::Pool<Driver> {
        &self.connections
    }

    /// Closes the connection pool.
    ///
    /// Any queries made after this call completes will fail.
    #[tracing::instrument(level = "trace")]
    pub async fn cleanup(&self) {
        self.connections.close().await;
    }
}
