//! The polling ingestion loop.
//!
//! Each cycle reads the checkpoint, fetches the next block range, routes and
//! decodes every log, then commits the decoded events together with the new
//! checkpoint in one transaction. A decode failure aborts the cycle before
//! anything is written.

use super::heartbeat::Heartbeat;
use crate::datasource::{DataSourceError, LogSource};
use crate::db::Repository;
use crate::events::{DecodeError, DecodedEvent, RouteOutcome, TopicRouter};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error(transparent)]
    DataSource(#[from] DataSourceError),
    #[error(
        "failed to unpack log {log_index} of 0x{transaction_hash} in block {block_number}: {source}"
    )]
    Decode {
        block_number: u64,
        transaction_hash: String,
        log_index: u64,
        #[source]
        source: DecodeError,
    },
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// What a single poll cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The checkpoint is already at the chain head.
    Idle { head: u64 },
    Committed {
        from: u64,
        to: u64,
        logs: usize,
        inserted: usize,
        skipped: usize,
        checkpoint: u64,
    },
}

/// Draw the block pagination used for the lifetime of the process.
pub fn pick_pagination<R: Rng>(rng: &mut R, min: u64, max: u64) -> u64 {
    let min = min.max(1);
    rng.gen_range(min..=max.max(min))
}

pub struct Ingestor {
    source: Arc<dyn LogSource>,
    repo: Arc<Repository>,
    router: TopicRouter,
    heartbeat: Heartbeat,
    pagination: u64,
    poll_wait: Duration,
}

impl Ingestor {
    pub fn new(
        source: Arc<dyn LogSource>,
        repo: Arc<Repository>,
        router: TopicRouter,
        heartbeat: Heartbeat,
        pagination: u64,
        poll_wait: Duration,
    ) -> Self {
        Self {
            source,
            repo,
            router,
            heartbeat,
            pagination: pagination.max(1),
            poll_wait,
        }
    }

    /// Run one fetch, decode and commit cycle.
    ///
    /// The range is `[checkpoint + 1, checkpoint + pagination]`, clamped to the
    /// chain head. A missing checkpoint counts as block 0, so the first range
    /// starts at block 1. The new checkpoint is the highest block among the
    /// fetched logs, or the end of the range when there were none.
    ///
    /// # Errors
    /// Any fetch, decode or storage failure. Nothing is committed on error.
    pub async fn poll_once(&self) -> Result<CycleOutcome, IngestionError> {
        let checkpoint = self.repo.get_checkpoint().await?;
        let from = checkpoint.map_or(0, |c| c.block_number) + 1;
        let head = self.source.latest_block().await?;
        if from > head {
            debug!(from, head, "Checkpoint is at the chain head");
            return Ok(CycleOutcome::Idle { head });
        }
        let to = from.saturating_add(self.pagination - 1).min(head);

        info!(from, to, "Latest block checkpoint");

        let logs = self
            .source
            .fetch_logs(from, to, &self.router.topics())
            .await?;

        let mut staged: Vec<(&'static str, DecodedEvent)> = Vec::with_capacity(logs.len());
        let mut skipped = 0usize;
        let mut highest: Option<u64> = None;
        for log in &logs {
            let outcome = self.router.route(log).map_err(|source| IngestionError::Decode {
                block_number: log.block_number,
                transaction_hash: hex::encode(log.transaction_hash.as_bytes()),
                log_index: log.log_index,
                source,
            })?;
            match outcome {
                RouteOutcome::Decoded { table, event } => staged.push((table, event)),
                RouteOutcome::Skipped { .. } => skipped += 1,
            }
            highest = Some(highest.map_or(log.block_number, |h| h.max(log.block_number)));
        }

        let next_checkpoint = highest.unwrap_or(to);
        let inserted = self
            .repo
            .commit_cycle(&staged, Some(next_checkpoint))
            .await?;

        info!(
            logs = logs.len(),
            inserted,
            skipped,
            checkpoint = next_checkpoint,
            "Committed block range"
        );

        Ok(CycleOutcome::Committed {
            from,
            to,
            logs: logs.len(),
            inserted,
            skipped,
            checkpoint: next_checkpoint,
        })
    }

    /// Poll forever, pulsing the heartbeat and sleeping between cycles.
    ///
    /// # Errors
    /// Returns the first cycle error. Returns `Ok` once `shutdown` fires.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), IngestionError> {
        loop {
            self.poll_once().await?;

            info!(poll_seconds = self.poll_wait.as_secs(), "About to sleep before polling again");
            self.heartbeat.pulse().await;

            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested, stopping ingestion");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.poll_wait) => {}
            }
        }
    }
}
