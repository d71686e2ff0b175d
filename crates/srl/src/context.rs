use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::Config;
use crate::database::{Database, DatabaseConnectionOptions, EstablishDatabaseConnectionError};
use crate::recompute::{RecomputeHandle, Recomputer};

mod inner {
    use super::*;

    #[derive(Debug)]
    pub(super) struct Context {
        pub(super) config: Config,
        pub(super) database: Arc<Database>,
        pub(super) shutdown_token: CancellationToken,
        pub(super) tasks: TaskTracker,
        pub(super) recompute: RecomputeHandle,
    }
}

/// The service's global state.
#[derive(Clone)]
pub struct Context(Arc<inner::Context>);

#[derive(Debug, Display, Error, From)]
pub enum InitializeContextError {
    #[display("{_0}")]
    EstablishDatabaseConnection(EstablishDatabaseConnectionError),
}

impl Context {
    /// Initializes a new [`Context`].
    pub async fn new(config: Config) -> Result<Self, InitializeContextError> {
        Self::with_shutdown_token(config, CancellationToken::new()).await
    }

    /// Initializes a new [`Context`] with the given cancellation token.
    ///
    /// The token will be cancelled by [`Context::cleanup()`] and is given to tasks spawned by the
    /// returned [`Context`], including the leaderboard recomputer.
    #[tracing::instrument(level = "debug", skip(shutdown_token), err)]
    pub async fn with_shutdown_token(
        config: Config,
        shutdown_token: CancellationToken,
    ) -> Result<Self, InitializeContextError> {
        let database = Database::connect(DatabaseConnectionOptions {
            url: &config.database.url,
            min_connections: config.database.min_connections,
            max_connections: config.database.max_connections,
        })
        .await
        .map(Arc::new)?;

        let tasks = TaskTracker::new();
        let recomputer = Recomputer::new(
            Arc::clone(&database),
            config.points.clone(),
            config.recompute.clone(),
        );
        let recompute = recomputer.handle();

        tasks.spawn(recomputer.run(shutdown_token.child_token()));

        Ok(Self(Arc::new(inner::Context {
            config,
            database,
            shutdown_token,
            tasks,
            recompute,
        })))
    }

    pub fn config(&self) -> &Config {
        &self.0.config
    }

    pub fn database(&self) -> &Database {
        &self.0.database
    }

    /// Used to report changed runs.
    pub fn recompute(&self) -> &RecomputeHandle {
        &self.0.recompute
    }

    /// Initiates cleanup.
    ///
    /// All tasks spawned by this [`Context`] will be notified and are given a few seconds to
    /// exit. Open database connections are closed gracefully.
    #[tracing::instrument(level = "debug")]
    pub async fn cleanup(self) {
        if !self.0.tasks.is_empty() {
            self.shutdown_tasks(Duration::from_secs(10)).await;
        }

        self.close_database(Duration::from_secs(5)).await;
    }

    #[tracing::instrument(level = "debug")]
    async fn shutdown_tasks(&self, timeout_after: Duration) {
        self.0.tasks.close();
        self.0.shutdown_token.cancel();

        if timeout(timeout_after, self.0.tasks.wait()).await.is_err() {
            warn!(timeout = ?timeout_after, "tasks did not shutdown within timeout");
        }
    }

    #[tracing::instrument(level = "debug")]
    async fn close_database(&self, timeout_after: Duration) {
        if timeout(timeout_after, self.database().cleanup()).await.is_err() {
            warn!(timeout = ?timeout_after, "failed to cleanup database connections within timeout");
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        <inner::Context as fmt::Debug>::fmt(&*self.0, fmt)
    }
}
