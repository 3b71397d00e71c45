#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DatabaseError {
    #[error("Internal database error: {0}")]
    BackendError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

}

impl DatabaseError {
    /// Whether retrying the same statement may succeed.
    ///
    /// SQLite reports contention as `SQLITE_BUSY` (5), `SQLITE_LOCKED` (6) and
    /// their extended codes; pool exhaustion and I/O hiccups are treated the same.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::BackendError(err) => match err {
                sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::WorkerCrashed => {
                    true
                }
                sqlx::Error::Database(db_err) => db_err
                    .code()
                    .and_then(|code| code.parse::<i32>().ok())
                    .is_some_and(|code| matches!(code & 0xff, 5 | 6)),
                _ => false,
            },
            Self::MigrationError(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_is_transient() {
        assert!(DatabaseError::BackendError(sqlx::Error::PoolTimedOut).is_transient());
    }

    #[test]
    fn test_row_not_found_is_not_transient() {
        assert!(!DatabaseError::BackendError(sqlx::Error::RowNotFound).is_transient());
    }
}
