pub mod config;
pub mod datasource;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod events;
pub mod orchestration;
pub mod rpc;

pub use config::Config;
pub use datasource::{DataSourceError, EthereumLogSource, LogSource, MockLogSource, RawLog};
pub use db::{init_db, Repository};
pub use domain::{Address, Hash, Number, PoolDetail, Position, TimeMs};
pub use error::AppError;
pub use events::{DecodedEvent, EventAbis, TopicRouter, TrackedContracts};
pub use orchestration::{Heartbeat, Ingestor, SnapshotReconciler};
pub use rpc::{BatchRpcClient, HttpTransport};
