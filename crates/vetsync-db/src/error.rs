//! # Store Errors
//!
//! ```text
//! sqlx::Error ──► DbError ──► SyncError::Database (vetsync-sync)
//!                    │
//!                    ├── constraint kinds ─► the record fails, its savepoint
//!                    │                       is rolled back, the run goes on
//!                    └── everything else ──► the phase (or the run) stops
//! ```

use sqlx::error::ErrorKind;
use thiserror::Error;

/// Errors raised by the local store.
#[derive(Debug, Error)]
pub enum DbError {
    /// A row with the same key already exists.
    #[error("unique constraint failed on {constraint}")]
    UniqueViolation { constraint: String },

    /// The row references a customer or pet the store does not hold.
    #[error("missing parent row: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK or NOT NULL rejected the row, e.g. a date SQLite cannot read
    /// (`2024-13-40`) or a status outside the allowed set.
    #[error("row rejected by the schema: {message}")]
    CheckViolation { message: String },

    /// The store file could not be opened or created.
    #[error("cannot open store: {0}")]
    ConnectionFailed(String),

    #[error("schema migration failed: {0}")]
    MigrationFailed(String),

    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Begin, savepoint or commit failed.
    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    #[error("no store connection available")]
    PoolExhausted,

    #[error("store error: {0}")]
    Internal(String),
}

impl DbError {
    /// True for constraint failures caused by the record itself.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            DbError::UniqueViolation { .. }
                | DbError::ForeignKeyViolation { .. }
                | DbError::CheckViolation { .. }
        )
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.kind() {
                    ErrorKind::UniqueViolation => DbError::UniqueViolation {
                        constraint: message
                            .rsplit(": ")
                            .next()
                            .unwrap_or(message.as_str())
                            .to_string(),
                    },
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation { message },
                    ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
                        DbError::CheckViolation { message }
                    }
                    _ => DbError::QueryFailed(message),
                }
            }
            sqlx::Error::RowNotFound => DbError::QueryFailed("expected row is missing".into()),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("store is closed".into()),
            sqlx::Error::Io(e) => DbError::ConnectionFailed(e.to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_classification() {
        assert!(DbError::ForeignKeyViolation {
            message: "x".into()
        }
        .is_constraint_violation());
        assert!(DbError::CheckViolation {
            message: "x".into()
        }
        .is_constraint_violation());
        assert!(!DbError::PoolExhausted.is_constraint_violation());
        assert!(!DbError::ConnectionFailed("x".into()).is_constraint_violation());
    }

    #[tokio::test]
    async fn test_sqlite_errors_are_classified() {
        use sqlx::Connection;

        let mut conn = sqlx::SqliteConnection::connect("sqlite::memory:").await.unwrap();
        sqlx::query("CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT NOT NULL CHECK (v <> ''))")
            .execute(&mut conn)
            .await
            .unwrap();
        sqlx::query("INSERT INTO t (id, v) VALUES (1, 'a')")
            .execute(&mut conn)
            .await
            .unwrap();

        let duplicate: DbError = sqlx::query("INSERT INTO t (id, v) VALUES (1, 'b')")
            .execute(&mut conn)
            .await
            .unwrap_err()
            .into();
        assert!(matches!(duplicate, DbError::UniqueViolation { ref constraint } if constraint == "t.id"));

        let empty: DbError = sqlx::query("INSERT INTO t (id, v) VALUES (2, '')")
            .execute(&mut conn)
            .await
            .unwrap_err()
            .into();
        assert!(matches!(empty, DbError::CheckViolation { .. }));
    }
}
