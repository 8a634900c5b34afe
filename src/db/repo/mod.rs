//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct for all database operations.
//! Methods are organized across submodules by domain:
//! - `events.rs` - Decoded event inserts
//! - `positions.rs` - Active positions, pool prices and snapshot writes

mod events;
mod positions;

use crate::domain::TimeMs;
use crate::events::DecodedEvent;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

/// Stored ingestion cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pub last_updated: TimeMs,
    pub block_number: u64,
}

/// Repository for database operations.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    // =========================================================================
    // Checkpoint operations
    // =========================================================================

    /// Get the last fully processed block, if any cycle has committed.
    ///
    /// # Errors
    /// Returns an error if the query fails or the stored block number is negative.
    pub async fn get_checkpoint(&self) -> Result<Option<Checkpoint>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT last_updated, block_number FROM ingestor_checkpointing_1 WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            let block_number: i64 = r.try_get("block_number")?;
            Ok::<_, sqlx::Error>(Checkpoint {
                last_updated: TimeMs::new(r.try_get("last_updated")?),
                block_number: u64::try_from(block_number)
                    .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            })
        })
        .transpose()
    }

    /// Persist a poll cycle: every decoded event and the checkpoint in one transaction.
    ///
    /// The checkpoint never moves backwards. Passing `None` commits the events only.
    ///
    /// # Returns
    /// Number of event rows inserted
    ///
    /// # Errors
    /// Returns an error if any insert fails, in which case nothing is written.
    pub async fn commit_cycle(
        &self,
        staged: &[(&'static str, DecodedEvent)],
        checkpoint: Option<u64>,
    ) -> Result<usize, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        for (table, event) in staged {
            events::insert_event(&mut *tx, table, event).await?;
        }

        if let Some(block_number) = checkpoint {
            upsert_checkpoint(&mut *tx, block_number).await?;
        }

        tx.commit().await?;
        Ok(staged.len())
    }

    /// Advance the checkpoint outside of a cycle.
    ///
    /// # Errors
    /// Returns an error if the upsert fails.
    pub async fn store_checkpoint(&self, block_number: u64) -> Result<(), sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        upsert_checkpoint(&mut *conn, block_number).await
    }
}

async fn upsert_checkpoint(
    conn: &mut sqlx::SqliteConnection,
    block_number: u64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO ingestor_checkpointing_1 (id, last_updated, block_number)
        VALUES (1, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            last_updated = excluded.last_updated,
            block_number = MAX(block_number, excluded.block_number)
        "#,
    )
    .bind(TimeMs::now().as_i64())
    .bind(i64::try_from(block_number).unwrap_or(i64::MAX))
    .execute(&mut *conn)
    .await?;
    Ok(())
}
