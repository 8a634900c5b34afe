use rand::thread_rng;
use seawater_indexer::config::Config;
use seawater_indexer::orchestration::{pick_pagination, Heartbeat, Ingestor};
use seawater_indexer::{
    init_db, AppError, EthereumLogSource, EventAbis, LogSource, Repository, TopicRouter,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
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
        tracing::error!(error = %e, "Ingestor stopped");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), AppError> {
    // Fail fast on a broken ABI before touching the network or the database
    let abis = EventAbis::load()?;
    let router = TopicRouter::new(abis, &config.tracked_contracts()?);

    let pool = init_db(&config.database_path).await?;
    let repo = Arc::new(Repository::new(pool));
    let source: Arc<dyn LogSource> = Arc::new(EthereumLogSource::new(
        config.geth_url.clone(),
        config.rpc_timeout,
    )?);

    let pagination = pick_pagination(
        &mut thread_rng(),
        config.pagination_min,
        config.pagination_max,
    );
    tracing::info!(
        pagination,
        poll_seconds = config.poll_wait.as_secs(),
        topics = router.topics().len(),
        "Polling configuration"
    );

    let ingestor = Ingestor::new(
        source,
        repo,
        router,
        Heartbeat::new(config.heartbeat_url.clone()),
        pagination,
        config.poll_wait,
    );

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    ingestor.run(shutdown).await?;
    Ok(())
}
