//! Fan-out/fan-in execution of many independent calls.

use super::{CallResult, RpcError, RpcRequest, RpcTransport};
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

type RequestQueue = Arc<Mutex<mpsc::Receiver<Vec<RpcRequest>>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Smallest batch size to draw.
    pub min_batch: usize,
    /// Largest batch size to draw.
    pub max_batch: usize,
    /// Workers spawned even when there are fewer batches.
    pub min_workers: usize,
    /// How long teardown waits for workers to exit before aborting them.
    pub drain_timeout: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            min_batch: 100,
            max_batch: 200,
            min_workers: 100,
            drain_timeout: Duration::from_secs(5),
        }
    }
}

/// Issues every request through a worker pool and collects all results or the first error.
///
/// Requests are chunked with a batch size drawn uniformly from
/// `[min_batch, max_batch]` on each call so the remote sees no fixed pattern.
/// Results arrive in completion order and are correlated only by key.
#[derive(Debug, Clone)]
pub struct BatchRpcClient {
    transport: Arc<dyn RpcTransport>,
    config: BatchConfig,
}

impl BatchRpcClient {
    pub fn new(transport: Arc<dyn RpcTransport>, config: BatchConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Draw a batch size for one execution.
    pub fn pick_batch_size<R: Rng>(&self, rng: &mut R) -> usize {
        let min = self.config.min_batch.max(1);
        let max = self.config.max_batch.max(min);
        rng.gen_range(min..=max)
    }

    /// Execute `requests`, returning exactly one result per request key.
    ///
    /// # Errors
    /// The first transport failure, remote error or malformed result aborts the
    /// whole call, as does a result whose key was not requested or was already
    /// answered. Cancelling `cancel` returns `RpcError::Cancelled`.
    pub async fn execute(
        &self,
        requests: Vec<RpcRequest>,
        cancel: &CancellationToken,
    ) -> Result<Vec<CallResult>, RpcError> {
        let batch_size = self.pick_batch_size(&mut rand::thread_rng());
        self.execute_with_batch_size(requests, batch_size, cancel)
            .await
    }

    /// Execute `requests` chunked into batches of `batch_size`.
    pub async fn execute_with_batch_size(
        &self,
        requests: Vec<RpcRequest>,
        batch_size: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<CallResult>, RpcError> {
        let mut outstanding: HashSet<String> = requests.iter().map(|r| r.id.clone()).collect();
        let expected = outstanding.len();
        if expected == 0 {
            return Ok(Vec::new());
        }

        let batches = chunk(requests, batch_size.max(1));
        let worker_count = batches.len().max(self.config.min_workers).max(1);
        info!(
            batch_size,
            batches = batches.len(),
            workers = worker_count,
            requests = expected,
            "Sending requests using a randomly chosen batch size"
        );

        let (request_tx, request_rx) = mpsc::channel(batches.len());
        for batch in batches {
            // Capacity equals the number of batches and the receiver is alive.
            if request_tx.send(batch).await.is_err() {
                return Err(RpcError::MissingResults {
                    received: 0,
                    expected,
                });
            }
        }
        drop(request_tx);

        let queue: RequestQueue = Arc::new(Mutex::new(request_rx));
        let (result_tx, mut result_rx) = mpsc::channel(expected);
        let stop = cancel.child_token();

        let mut workers = JoinSet::new();
        for _ in 0..worker_count {
            workers.spawn(run_worker(
                Arc::clone(&self.transport),
                Arc::clone(&queue),
                result_tx.clone(),
                stop.clone(),
            ));
        }
        drop(result_tx);

        let mut collected = Vec::with_capacity(expected);
        let outcome = loop {
            if outstanding.is_empty() {
                break Ok(());
            }
            tokio::select! {
                _ = cancel.cancelled() => break Err(RpcError::Cancelled),
                item = result_rx.recv() => match item {
                    Some(Ok(result)) => {
                        if !outstanding.remove(&result.key) {
                            break Err(RpcError::UnexpectedKey { key: result.key });
                        }
                        collected.push(result);
                    }
                    Some(Err(err)) => break Err(err),
                    None => break Err(RpcError::MissingResults {
                        received: collected.len(),
                        expected,
                    }),
                },
            }
        };

        stop.cancel();
        let drained = tokio::time::timeout(self.config.drain_timeout, async {
            while workers.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(
                remaining = workers.len(),
                "Workers did not stop in time, aborting"
            );
            workers.abort_all();
        }

        outcome.map(|()| collected)
    }
}

fn chunk(requests: Vec<RpcRequest>, size: usize) -> Vec<Vec<RpcRequest>> {
    let mut batches = Vec::with_capacity(requests.len() / size + 1);
    let mut current = Vec::with_capacity(size);
    for request in requests {
        current.push(request);
        if current.len() == size {
            batches.push(std::mem::replace(&mut current, Vec::with_capacity(size)));
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

/// Pull batches until the queue is empty, an error is sent, or `stop` fires.
async fn run_worker(
    transport: Arc<dyn RpcTransport>,
    queue: RequestQueue,
    results: mpsc::Sender<Result<CallResult, RpcError>>,
    stop: CancellationToken,
) {
    loop {
        let batch = tokio::select! {
            _ = stop.cancelled() => return,
            batch = async { queue.lock().await.recv().await } => batch,
        };
        let Some(batch) = batch else {
            return;
        };

        let responses = tokio::select! {
            _ = stop.cancelled() => return,
            responses = transport.send_batch(&batch) => responses,
        };
        let responses = match responses {
            Ok(responses) => responses,
            Err(err) => {
                debug!(error = %err, "Batch request failed");
                tokio::select! {
                    _ = stop.cancelled() => {}
                    _ = results.send(Err(err)) => {}
                }
                return;
            }
        };

        for response in responses {
            let item = response.into_result();
            let failed = item.is_err();
            tokio::select! {
                _ = stop.cancelled() => return,
                sent = results.send(item) => {
                    if sent.is_err() {
                        return;
                    }
                }
            }
            if failed {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Number;
    use crate::rpc::{MockTransport, RpcResponse};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn request(key: &str) -> RpcRequest {
        RpcRequest {
            jsonrpc: "2.0".to_string(),
            id: key.to_string(),
            method: "eth_call".to_string(),
            params: serde_json::json!([]),
        }
    }

    fn requests(n: usize) -> Vec<RpcRequest> {
        (0..n).map(|i| request(&format!("key-{}", i))).collect()
    }

    fn client(transport: MockTransport) -> (BatchRpcClient, Arc<MockTransport>) {
        let transport = Arc::new(transport);
        let config = BatchConfig {
            min_batch: 3,
            max_batch: 7,
            min_workers: 2,
            drain_timeout: Duration::from_secs(1),
        };
        (BatchRpcClient::new(transport.clone(), config), transport)
    }

    #[test]
    fn test_chunk_sizes() {
        let sizes: Vec<usize> = chunk(requests(10), 4).iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
        let sizes: Vec<usize> = chunk(requests(8), 4).iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![4, 4]);
    }

    #[test]
    fn test_pick_batch_size_within_bounds() {
        let (client, _) = client(MockTransport::new());
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let size = client.pick_batch_size(&mut rng);
            assert!((3..=7).contains(&size));
        }
    }

    #[tokio::test]
    async fn test_every_key_returned_once() {
        let (client, transport) = client(MockTransport::new().with_result("key-3", "0x2a"));
        let cancel = CancellationToken::new();

        let results = client
            .execute_with_batch_size(requests(25), 4, &cancel)
            .await
            .unwrap();

        assert_eq!(results.len(), 25);
        let keys: HashSet<&str> = results.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys.len(), 25);
        let forty_two = results.iter().find(|r| r.key == "key-3").unwrap();
        assert_eq!(forty_two.value, Number::from(42));

        let mut sizes = transport.batch_sizes();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![1, 4, 4, 4, 4, 4, 4]);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let (client, transport) = client(MockTransport::new());
        let results = client
            .execute(Vec::new(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(results.is_empty());
        assert!(transport.batch_sizes().is_empty());
    }

    #[tokio::test]
    async fn test_remote_error_fails_whole_call() {
        let (client, _) = client(MockTransport::new().with_remote_error("key-11"));
        let result = client
            .execute(requests(30), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(RpcError::Remote { key, .. }) if key == "key-11"));
    }

    #[tokio::test]
    async fn test_malformed_result_fails_whole_call() {
        let (client, _) = client(MockTransport::new().with_result("key-0", "0x"));
        let result = client
            .execute(requests(5), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(RpcError::MalformedResult { .. })));
    }

    #[tokio::test]
    async fn test_transport_error_fails_whole_call() {
        let (client, _) = client(
            MockTransport::new().with_transport_error(RpcError::Transport("refused".to_string())),
        );
        let result = client
            .execute(requests(5), &CancellationToken::new())
            .await;
        assert_eq!(result, Err(RpcError::Transport("refused".to_string())));
    }

    /// Echoes each batch but answers the first key twice instead of the second.
    #[derive(Debug)]
    struct DuplicatingTransport;

    #[async_trait::async_trait]
    impl RpcTransport for DuplicatingTransport {
        async fn send_batch(&self, batch: &[RpcRequest]) -> Result<Vec<RpcResponse>, RpcError> {
            let mut responses: Vec<RpcResponse> = batch
                .iter()
                .map(|r| RpcResponse {
                    id: r.id.clone(),
                    result: Some("0x1".to_string()),
                    error: None,
                })
                .collect();
            if responses.len() > 1 {
                responses[1].id = responses[0].id.clone();
            }
            Ok(responses)
        }
    }

    #[tokio::test]
    async fn test_duplicated_key_fails_whole_call() {
        let client = BatchRpcClient::new(
            Arc::new(DuplicatingTransport),
            BatchConfig {
                min_batch: 4,
                max_batch: 4,
                min_workers: 1,
                drain_timeout: Duration::from_secs(1),
            },
        );
        let result = client
            .execute_with_batch_size(requests(4), 4, &CancellationToken::new())
            .await;
        assert_eq!(
            result,
            Err(RpcError::UnexpectedKey {
                key: "key-0".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_stalled_workers() {
        let (client, _) = client(MockTransport::new().stalled());
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            client.execute(requests(10), &cancel),
        )
        .await
        .expect("cancellation should return promptly");
        assert_eq!(result, Err(RpcError::Cancelled));
    }
}
