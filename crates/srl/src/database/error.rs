pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A failed query against the run database.
#[derive(Debug, Display, Error, From)]
#[debug("{_0}")]
#[display("database error: {_0}")]
pub struct Error(sqlx::Error);

impl Error {
    /// A run column held a value that doesn't map onto our types, e.g. an unknown timing
    /// method name.
    pub fn decode_column(
        column: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self(sqlx::Error::ColumnDecode {
            index: column.into(),
            source: Box::new(source),
        })
    }

    /// Whether the database could not be reached at all, as opposed to a query that ran and
    /// failed.
    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self.0,
            sqlx::Error::PoolTimedOut
                | sqlx::Error::PoolClosed
                | sqlx::Error::WorkerCrashed
                | sqlx::Error::Io(_)
                | sqlx::Error::Tls(_)
        )
    }
}
