// Transaction management
use crate::connection::DatabasePool;
use crate::error::{classify, DatabaseError, DatabaseResult};
use sqlx::{Postgres, Transaction};
use tracing::debug;

/// Begins transactions against the shared pool.
///
/// The booking path uses [`begin_serializable`](Self::begin_serializable) so
/// the capacity count and the appointment insert commit atomically; a lost
/// race surfaces as [`DatabaseError::Serialization`] and is retried by the
/// caller's policy rather than here.
pub struct TransactionManager {
    pool: DatabasePool,
}

impl TransactionManager {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Begin a transaction at the database default isolation level.
    pub async fn begin(&self) -> DatabaseResult<Transaction<'_, Postgres>> {
        debug!("beginning transaction");
        self.pool.pool().begin().await.map_err(classify)
    }

    /// Begin a serializable transaction for check-and-insert paths.
    pub async fn begin_serializable(&self) -> DatabaseResult<Transaction<'_, Postgres>> {
        debug!("beginning serializable transaction");
        let mut tx = self.pool.pool().begin().await.map_err(classify)?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(classify)?;

        Ok(tx)
    }

    /// Commit, classifying serialization failures for the retry policy.
    pub async fn commit(tx: Transaction<'_, Postgres>) -> DatabaseResult<()> {
        tx.commit().await.map_err(classify)
    }
}
