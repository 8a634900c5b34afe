mod common;

use common::*;
use seawater_indexer::datasource::MockLogSource;
use seawater_indexer::orchestration::{Heartbeat, Ingestor, SnapshotError};
use seawater_indexer::rpc::{encode_key, BatchConfig, BatchRpcClient, MockTransport, RpcError};
use seawater_indexer::{Number, Repository, SnapshotReconciler};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

async fn ingest(repo: Arc<Repository>) {
    let source = MockLogSource::new(100).with_logs(vec![
        new_pool_log(1, POOL, 6),
        mint_position_log(2, 1, POOL, 39122, 50108),
        mint_position_log(3, 2, POOL, 39122, 43000),
        mint_position_log(4, 3, POOL, 50000, 60000),
        swap1_log(5, POOL, 43518),
    ]);
    Ingestor::new(
        Arc::new(source),
        repo,
        router(),
        Heartbeat::disabled(),
        1_000,
        Duration::from_millis(10),
    )
    .poll_once()
    .await
    .unwrap();
}

fn reconciler(repo: Arc<Repository>, transport: MockTransport) -> SnapshotReconciler {
    let client = BatchRpcClient::new(
        Arc::new(transport),
        BatchConfig {
            min_batch: 2,
            max_batch: 2,
            min_workers: 4,
            drain_timeout: Duration::from_secs(1),
        },
    );
    SnapshotReconciler::new(repo, client, addr(SEAWATER), 6)
}

#[tokio::test]
async fn test_snapshot_from_ingested_events() {
    let (repo, _temp) = setup_repo().await;
    ingest(repo.clone()).await;

    let transport = MockTransport::new()
        .with_result(encode_key(&addr(POOL), 1), "0x091c2e55")
        .with_result(encode_key(&addr(POOL), 2), "0x091c2e55")
        .with_result(encode_key(&addr(POOL), 3), "0x091c2e55");

    let report = reconciler(repo.clone(), transport)
        .reconcile(&CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.positions, 3);
    assert_eq!(report.results, 3);
    assert_eq!(report.stored, 3);

    let mut rows = repo.query_snapshots().await.unwrap();
    rows.sort_by_key(|r| r.id);
    assert_eq!(rows[0].pool, addr(POOL));
    assert_eq!(
        (rows[0].id, &rows[0].amount0, &rows[0].amount1),
        (1, &Number::from(4870325), &Number::from(265662032))
    );

    // Below the current price the position holds only token1.
    assert_eq!(rows[1].id, 2);
    assert!(rows[1].amount0.is_zero());
    assert!(!rows[1].amount1.is_zero());

    // Above the current price it holds only token0.
    assert_eq!(rows[2].id, 3);
    assert!(!rows[2].amount0.is_zero());
    assert!(rows[2].amount1.is_zero());
}

#[tokio::test]
async fn test_snapshot_aborts_on_single_rpc_error() {
    let (repo, _temp) = setup_repo().await;
    ingest(repo.clone()).await;

    let transport = MockTransport::new()
        .with_result(encode_key(&addr(POOL), 1), "0x091c2e55")
        .with_remote_error(encode_key(&addr(POOL), 2))
        .with_result(encode_key(&addr(POOL), 3), "0x091c2e55");

    let result = reconciler(repo.clone(), transport)
        .reconcile(&CancellationToken::new())
        .await;
    assert!(matches!(result, Err(SnapshotError::Rpc(RpcError::Remote { .. }))));
    assert!(repo.query_snapshots().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_snapshot_with_no_positions() {
    let (repo, _temp) = setup_repo().await;
    let transport = MockTransport::new();
    let report = reconciler(repo.clone(), transport)
        .reconcile(&CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.positions, 0);
    assert_eq!(report.stored, 0);
}
