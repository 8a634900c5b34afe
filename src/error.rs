use crate::config::ConfigError;
use crate::datasource::DataSourceError;
use crate::events::DecodeError;
use crate::orchestration::{IngestionError, SnapshotError};
use crate::rpc::RpcError;
use thiserror::Error;

/// Top-level failure of either binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Failed to load event ABIs: {0}")]
    Abi(#[from] DecodeError),
    #[error("Failed to initialize database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("Failed to set up log source: {0}")]
    DataSource(#[from] DataSourceError),
    #[error("Failed to set up RPC client: {0}")]
    Rpc(#[from] RpcError),
    #[error("Ingestion failed: {0}")]
    Ingestion(#[from] IngestionError),
    #[error("Snapshot failed: {0}")]
    Snapshot(#[from] SnapshotError),
}
