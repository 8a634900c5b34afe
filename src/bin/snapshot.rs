use seawater_indexer::config::Config;
use seawater_indexer::rpc::{BatchRpcClient, HttpTransport};
use seawater_indexer::{init_db, AppError, Repository, SnapshotReconciler};
use std::sync::Arc;
use tracing_subscriber::filter::LevelFilter;

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let level = if config.debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Snapshot failed");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), AppError> {
    let pool = init_db(&config.database_path).await?;
    let repo = Arc::new(Repository::new(pool));

    let transport = HttpTransport::new(config.geth_url.clone(), config.rpc_timeout)?;
    let client = BatchRpcClient::new(Arc::new(transport), config.batch_config());

    let reconciler = SnapshotReconciler::new(
        repo,
        client,
        config.seawater_addr.clone(),
        config.fusdc_decimals,
    );
    let report = reconciler.run(config.rpc_timeout).await?;
    tracing::info!(
        positions = report.positions,
        stored = report.stored,
        "Snapshot complete"
    );
    Ok(())
}
