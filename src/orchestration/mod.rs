//! Long-running processes: the ingestion loop and the position snapshot.

pub mod heartbeat;
pub mod ingestor;
pub mod snapshot;

pub use heartbeat::Heartbeat;
pub use ingestor::{pick_pagination, CycleOutcome, IngestionError, Ingestor};
pub use snapshot::{SnapshotError, SnapshotReconciler, SnapshotReport};
