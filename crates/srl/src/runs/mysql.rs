use std::collections::HashMap;

use futures_util::TryStreamExt;

use super::{
    CategoryId,
    Classification,
    GameId,
    LeaderboardKey,
    LevelId,
    PlayerId,
    RepositoryError,
    Run,
    RunId,
    RunRepository,
    RunStanding,
    Times,
};
use crate::database::{self, Database, QueryBuilder};
use crate::time::{Seconds, Timestamp};
use crate::timing::{TimingMethod, TimingRules};

/// MySQL allows at most 65535 placeholders per statement.
const MAX_ROWS_PER_INSERT: usize = 10_000;

#[derive(sqlx::FromRow)]
struct RunRow {
    id: RunId,
    level_id: Option<LevelId>,
    is_category_extension: bool,
    time_secs: Seconds,
    timenl_secs: Seconds,
    timeigt_secs: Seconds,
    approved_at: Timestamp,
    obsolete: bool,
    place: Option<u32>,
    points: f64,
    streak_bonus: f64,
}

#[derive(sqlx::FromRow)]
struct TimingRow {
    default_timing: String,
    il_default_timing: String,
    category_timing: Option<String>,
}

#[derive(sqlx::FromRow)]
struct KeyRow {
    game_id: GameId,
    category_id: CategoryId,
    level_id: Option<LevelId>,
    subcategory: String,
}

fn parse_timing(column: &str, value: &str) -> Result<TimingMethod, RepositoryError> {
    value
        .parse::<TimingMethod>()
        .map_err(|error| database::Error::decode_column(column, error).into())
}

impl RunRepository for Database {
    #[tracing::instrument(level = "debug", skip(self), err)]
    async fn fetch_runs(&self, key: &LeaderboardKey) -> Result<Vec<Run>, RepositoryError> {
        let mut players = sqlx::query_as::<_, (RunId, PlayerId)>(
            "SELECT rp.run_id, rp.player_id
             FROM RunPlayers AS rp
             JOIN Runs AS r ON r.id = rp.run_id
             WHERE r.game_id = ?
             AND r.category_id = ?
             AND r.level_id <=> ?
             AND r.subcategory = ?
             ORDER BY rp.run_id, rp.ordinal",
        )
        .bind(&key.game)
        .bind(&key.category)
        .bind(&key.level)
        .bind(&key.subcategory)
        .fetch(self.pool())
        .try_fold(HashMap::<RunId, Vec<PlayerId>>::new(), |mut players, (run_id, player_id)| {
            players.entry(run_id).or_default().push(player_id);
            async move { Ok(players) }
        })
        .await?;

        let runs = sqlx::query_as::<_, RunRow>(
            "SELECT
               r.id,
               r.level_id,
               g.is_category_extension,
               r.time_secs,
               r.timenl_secs,
               r.timeigt_secs,
               r.approved_at,
               r.obsolete,
               s.place,
               COALESCE(s.points, 0.0) AS points,
               COALESCE(s.streak_bonus, 0.0) AS streak_bonus
             FROM Runs AS r
             JOIN Games AS g ON g.id = r.game_id
             LEFT JOIN RunStandings AS s ON s.run_id = r.id
             WHERE r.game_id = ?
             AND r.category_id = ?
             AND r.level_id <=> ?
             AND r.subcategory = ?
             ORDER BY r.id",
        )
        .bind(&key.game)
        .bind(&key.category)
        .bind(&key.level)
        .bind(&key.subcategory)
        .fetch(self.pool())
        .map_ok(|row| {
            let classification = if row.is_category_extension {
                Classification::CategoryExtension
            } else if row.level_id.is_some() {
                Classification::IndividualLevel
            } else {
                Classification::FullGame
            };

            Run {
                players: players.remove(&row.id).unwrap_or_default(),
                id: row.id,
                key: key.clone(),
                classification,
                times: Times {
                    realtime: row.time_secs,
                    realtime_noloads: row.timenl_secs,
                    ingame: row.timeigt_secs,
                },
                approved_at: row.approved_at,
                obsolete: row.obsolete,
                place: row.place,
                points: row.points,
                streak_bonus: row.streak_bonus,
            }
        })
        .try_collect::<Vec<_>>()
        .await?;

        trace!(amount = runs.len(), "fetched runs");

        Ok(runs)
    }

    #[tracing::instrument(level = "debug", skip(self), err)]
    async fn fetch_timing_rules(&self, key: &LeaderboardKey) -> Result<TimingRules, RepositoryError> {
        let Some(row) = sqlx::query_as::<_, TimingRow>(
            "SELECT
               g.default_timing,
               g.il_default_timing,
               c.default_timing AS category_timing
             FROM Categories AS c
             JOIN Games AS g ON g.id = c.game_id
             WHERE c.id = ?
             AND g.id = ?",
        )
        .bind(&key.category)
        .bind(&key.game)
        .fetch_optional(self.pool())
        .await?
        else {
            warn!(%key, "no timing configuration for leaderboard; using defaults");
            return Ok(TimingRules::default());
        };

        Ok(TimingRules {
            full_game: parse_timing("default_timing", &row.default_timing)?,
            individual_level: parse_timing("il_default_timing", &row.il_default_timing)?,
            category_override: row
                .category_timing
                .as_deref()
                .map(|value| parse_timing("category_timing", value))
                .transpose()?,
        })
    }

    #[tracing::instrument(
        level = "debug",
        skip(self, standings, newly_obsolete),
        fields(standings = standings.len(), newly_obsolete = newly_obsolete.len()),
        err
    )]
    async fn write_results(
        &self,
        key: &LeaderboardKey,
        standings: &[RunStanding],
        newly_obsolete: &[RunId],
    ) -> Result<(), RepositoryError> {
        let mut txn = self.pool().begin().await?;

        if !newly_obsolete.is_empty() {
            let mut query = QueryBuilder::new("UPDATE Runs SET obsolete = TRUE WHERE id IN (");
            let mut run_ids = query.separated(", ");

            for run_id in newly_obsolete {
                run_ids.push_bind(run_id);
            }

            run_ids.push_unseparated(")");

            query.build().persistent(false).execute(&mut *txn).await?;
        }

        for chunk in standings.chunks(MAX_ROWS_PER_INSERT) {
            let mut query = QueryBuilder::new(
                "INSERT INTO RunStandings (
                   run_id,
                   place,
                   points,
                   streak_bonus
                 )",
            );

            query.push_values(chunk, |mut query, standing| {
                query.push_bind(&standing.run_id);
                query.push_bind(standing.place);
                query.push_bind(standing.points);
                query.push_bind(standing.streak_bonus);
            });

            query.push(
                " ON DUPLICATE KEY
                 UPDATE place = VALUES(place),
                        points = VALUES(points),
                        streak_bonus = VALUES(streak_bonus)",
            );

            query.build().persistent(false).execute(&mut *txn).await?;
        }

        txn.commit().await?;

        debug!(%key, "wrote standings");

        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self), err)]
    async fn fetch_key(&self, run_id: &RunId) -> Result<Option<LeaderboardKey>, RepositoryError> {
        let key = sqlx::query_as::<_, KeyRow>(
            "SELECT game_id, category_id, level_id, subcategory
             FROM Runs
             WHERE id = ?",
        )
        .bind(run_id)
        .fetch_optional(self.pool())
        .await?
        .map(|row| LeaderboardKey {
            game: row.game_id,
            category: row.category_id,
            level: row.level_id,
            subcategory: row.subcategory,
        });

        Ok(key)
    }
}
