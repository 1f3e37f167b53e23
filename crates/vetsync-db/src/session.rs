//! # Store Session
//!
//! A single connection with a long-lived transaction that is committed every
//! N applied records. Each record is written inside its own savepoint so a
//! failing record rolls back alone.
//!
//! ## Transaction Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                   ← batch transaction            │
//! │    SAVEPOINT  ─ record 1 ─ RELEASE       ✓ applied                     │
//! │    SAVEPOINT  ─ record 2 ─ ROLLBACK TO   ✗ failed, nothing left behind │
//! │    SAVEPOINT  ─ record 3 ─ RELEASE       ✓ applied                     │
//! │    ...                                                                  │
//! │  COMMIT                                  ← pending >= batch size        │
//! │  BEGIN                                                                  │
//! │    ...                                                                  │
//! │  COMMIT                                  ← finish()                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A crash between two commits loses at most one batch. Re-running the sync
//! reapplies it because every write is an upsert.

use sqlx::{Connection, Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::debug;

use crate::error::{DbError, DbResult};

/// Per-record savepoint. Commit releases it, rollback undoes it.
pub type Savepoint<'a> = Transaction<'a, Sqlite>;

/// Batched write session over one pooled connection.
pub struct StoreSession {
    pool: SqlitePool,
    tx: Option<Transaction<'static, Sqlite>>,
    pending: usize,
    committed: usize,
}

impl std::fmt::Debug for StoreSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreSession")
            .field("open", &self.tx.is_some())
            .field("pending", &self.pending)
            .field("committed", &self.committed)
            .finish()
    }
}

impl StoreSession {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        StoreSession {
            pool,
            tx: None,
            pending: 0,
            committed: 0,
        }
    }

    async fn transaction(&mut self) -> DbResult<&mut Transaction<'static, Sqlite>> {
        if self.tx.is_none() {
            let tx = self
                .pool
                .begin()
                .await
                .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
            self.tx = Some(tx);
        }

        self.tx
            .as_mut()
            .ok_or_else(|| DbError::TransactionFailed("no open transaction".to_string()))
    }

    /// Connection inside the open batch, for reads and unscoped writes.
    pub async fn conn(&mut self) -> DbResult<&mut SqliteConnection> {
        let tx = self.transaction().await?;
        Ok(&mut **tx)
    }

    /// Opens a savepoint for one record.
    pub async fn savepoint(&mut self) -> DbResult<Savepoint<'_>> {
        let tx = self.transaction().await?;
        let savepoint = Connection::begin(&mut **tx)
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        Ok(savepoint)
    }

    /// Counts one applied record towards the current batch.
    pub fn record_applied(&mut self) {
        self.pending += 1;
    }

    /// Records applied since the last commit.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Records made durable so far.
    pub fn committed(&self) -> usize {
        self.committed
    }

    /// Commits when at least `batch_size` records are pending.
    ///
    /// Returns true when a commit happened.
    pub async fn commit_if_due(&mut self, batch_size: usize) -> DbResult<bool> {
        if self.pending == 0 || self.pending < batch_size {
            return Ok(false);
        }
        self.commit().await?;
        Ok(true)
    }

    /// Commits the open batch. A new one is started lazily on the next write.
    pub async fn commit(&mut self) -> DbResult<()> {
        if let Some(tx) = self.tx.take() {
            tx.commit()
                .await
                .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

            debug!(records = self.pending, "Batch committed");
            self.committed += self.pending;
            self.pending = 0;
        }
        Ok(())
    }

    /// Commits whatever is pending and returns the connection to the pool.
    pub async fn finish(mut self) -> DbResult<usize> {
        self.commit().await?;
        Ok(self.committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    async fn count(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    async fn insert(conn: &mut SqliteConnection, id: i64) -> DbResult<()> {
        sqlx::query("INSERT INTO customers (id, name) VALUES (?1, 'x')")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_savepoint_rolls_back_alone() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("s.db")))
            .await
            .unwrap();
        let mut session = db.session();

        let mut sp = session.savepoint().await.unwrap();
        insert(&mut *sp, 1).await.unwrap();
        sp.commit().await.unwrap();
        session.record_applied();

        let mut sp = session.savepoint().await.unwrap();
        insert(&mut *sp, 2).await.unwrap();
        // duplicate primary key inside the same savepoint
        assert!(insert(&mut *sp, 2).await.is_err());
        sp.rollback().await.unwrap();

        let mut sp = session.savepoint().await.unwrap();
        insert(&mut *sp, 3).await.unwrap();
        sp.commit().await.unwrap();
        session.record_applied();

        assert_eq!(session.finish().await.unwrap(), 2);

        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM customers ORDER BY id")
            .fetch_all(db.pool())
            .await
            .unwrap();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_commit_if_due_respects_batch_size() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("b.db")))
            .await
            .unwrap();
        let mut session = db.session();

        for id in 1..=3 {
            insert(session.conn().await.unwrap(), id).await.unwrap();
            session.record_applied();
            let committed = session.commit_if_due(2).await.unwrap();
            assert_eq!(committed, id == 2);
        }

        assert_eq!(session.pending(), 1);
        assert_eq!(session.committed(), 2);
        // Committed rows are visible from another connection
        assert_eq!(count(&db).await, 2);

        session.finish().await.unwrap();
        assert_eq!(count(&db).await, 3);
    }
}
