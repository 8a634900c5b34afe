//! Position snapshot reconciliation.
//!
//! Loads every active position and the latest price of its pool, asks the AMM
//! for each position's live liquidity in one batched fan-out, converts that
//! liquidity to token amounts at the current price and stores the non-empty
//! results as one bulk write. Any RPC failure aborts the run before writing.

use crate::db::Repository;
use crate::domain::{Address, Number, Position, PositionSnapshot};
use crate::engine::{
    amounts_for_liquidity, exponentiate_decimals, format_ratio, sqrt_ratio_at_tick, truncate,
};
use crate::rpc::{encode_key, position_liquidity_calldata, BatchRpcClient, RpcError, RpcRequest};
use num_bigint::BigUint;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    #[error("positions request: {0}")]
    Rpc(#[from] RpcError),
}

/// Counters from one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotReport {
    pub positions: usize,
    pub pools: usize,
    pub results: usize,
    pub stored: usize,
    pub empty: usize,
    pub unknown: usize,
}

struct PoolPrice {
    sqrt_ratio: Option<BigUint>,
    decimals: u8,
}

pub struct SnapshotReconciler {
    repo: Arc<Repository>,
    client: BatchRpcClient,
    seawater: Address,
    fusdc_decimals: u32,
}

impl SnapshotReconciler {
    pub fn new(
        repo: Arc<Repository>,
        client: BatchRpcClient,
        seawater: Address,
        fusdc_decimals: u32,
    ) -> Self {
        Self {
            repo,
            client,
            seawater,
            fusdc_decimals,
        }
    }

    /// Reconcile once, giving up when `timeout` elapses.
    ///
    /// # Errors
    /// See [`SnapshotReconciler::reconcile`].
    pub async fn run(&self, timeout: Duration) -> Result<SnapshotReport, SnapshotError> {
        let cancel = CancellationToken::new();
        let deadline = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                cancel.cancel();
            })
        };

        let result = self.reconcile(&cancel).await;
        deadline.abort();
        result
    }

    /// Compute and store the token composition of every active position.
    ///
    /// Amounts are truncated toward zero. Positions whose pool has no known
    /// price, or whose ticks are out of range, compute as empty and are skipped.
    ///
    /// # Errors
    /// Storage failures, or any batch RPC failure including cancellation. No
    /// snapshot rows are written on error.
    pub async fn reconcile(
        &self,
        cancel: &CancellationToken,
    ) -> Result<SnapshotReport, SnapshotError> {
        let (positions, pool_details) =
            tokio::try_join!(self.repo.active_positions(), self.repo.pool_details())?;
        debug!(
            positions = positions.len(),
            pools = pool_details.len(),
            "Loaded positions and pools to scan"
        );

        let prices: HashMap<&Address, PoolPrice> = pool_details
            .iter()
            .map(|p| {
                let sqrt_ratio = sqrt_ratio_at_tick(p.final_tick)
                    .map_err(|e| warn!(pool = %p.pool, error = %e, "Pool tick out of range"))
                    .ok();
                (
                    &p.pool,
                    PoolPrice {
                        sqrt_ratio,
                        decimals: p.decimals,
                    },
                )
            })
            .collect();

        let by_key: HashMap<String, &Position> = positions
            .iter()
            .map(|p| (encode_key(&p.pool, p.id), p))
            .collect();

        let requests = by_key
            .iter()
            .map(|(key, p)| {
                Ok(RpcRequest::eth_call(
                    key.clone(),
                    &self.seawater,
                    position_liquidity_calldata(&p.pool, p.id)?,
                ))
            })
            .collect::<Result<Vec<_>, RpcError>>()?;

        let results = self.client.execute(requests, cancel).await?;

        let mut report = SnapshotReport {
            positions: positions.len(),
            pools: pool_details.len(),
            results: results.len(),
            ..SnapshotReport::default()
        };
        let mut pools = Vec::with_capacity(results.len());
        let mut ids = Vec::with_capacity(results.len());
        let mut amount0s = Vec::with_capacity(results.len());
        let mut amount1s = Vec::with_capacity(results.len());

        for result in results {
            let Some(position) = by_key.get(&result.key) else {
                info!(key = %result.key, "Result for an unknown position");
                report.unknown += 1;
                continue;
            };

            let price = prices.get(&position.pool);
            let current = price.and_then(|p| p.sqrt_ratio.as_ref());
            let token1_decimals = price.map_or(0, |p| u32::from(p.decimals));
            let lower = sqrt_ratio_at_tick(position.lower).ok();
            let upper = sqrt_ratio_at_tick(position.upper).ok();
            let liquidity = result.value.to_biguint();

            let (amount0_rat, amount1_rat) = amounts_for_liquidity(
                current,
                lower.as_ref(),
                upper.as_ref(),
                liquidity.as_ref(),
            );
            let snapshot = PositionSnapshot {
                pool: position.pool.clone(),
                id: position.id,
                amount0: Number::new(truncate(&amount0_rat)),
                amount1: Number::new(truncate(&amount1_rat)),
            };

            debug!(
                pool = %snapshot.pool,
                id = snapshot.id,
                amount0 = %format_ratio(&(&amount0_rat / exponentiate_decimals(self.fusdc_decimals)), 10),
                amount1 = %format_ratio(&(&amount1_rat / exponentiate_decimals(token1_decimals)), 10),
                truncated0 = %snapshot.amount0.scale_str(self.fusdc_decimals),
                truncated1 = %snapshot.amount1.scale_str(token1_decimals),
                delta = %result.value,
                "Price data"
            );

            if snapshot.is_empty() {
                report.empty += 1;
                continue;
            }
            pools.push(snapshot.pool);
            ids.push(snapshot.id);
            amount0s.push(snapshot.amount0);
            amount1s.push(snapshot.amount1);
        }

        if ids.is_empty() {
            info!("No positions found");
            return Ok(report);
        }

        report.stored = self
            .repo
            .insert_snapshots(&pools, &ids, &amount0s, &amount1s)
            .await?;

        info!(
            positions = report.positions,
            stored = report.stored,
            empty = report.empty,
            unknown = report.unknown,
            "Stored position snapshots"
        );
        Ok(report)
    }
}
