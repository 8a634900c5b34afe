//! Liveness pulses to an upstream monitor.

use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, info};

/// Sends `GET` to the configured URL after every poll cycle.
///
/// Failures are logged and otherwise ignored.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    client: Client,
    url: Option<String>,
}

impl Heartbeat {
    pub fn new(url: Option<String>) -> Self {
        if url.is_none() {
            info!("Heartbeat URL not configured, pulses disabled");
        }
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            url,
        }
    }

    pub fn disabled() -> Self {
        Self {
            client: Client::new(),
            url: None,
        }
    }

    /// Report that we're alive. Returns whether the monitor acknowledged it.
    pub async fn pulse(&self) -> bool {
        let Some(url) = &self.url else {
            debug!("Skipping heartbeat, no URL configured");
            return false;
        };

        debug!("Sending heartbeat");
        match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                error!(status = %response.status(), "Heartbeat rejected");
                false
            }
            Err(e) => {
                error!(error = %e, "Error reporting to heartbeat");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_disabled_pulse_is_noop() {
        assert!(!Heartbeat::disabled().pulse().await);
        assert!(!Heartbeat::new(None).pulse().await);
    }

    #[tokio::test]
    async fn test_pulse_hits_url() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 1024];
            let n = socket.read(&mut buf).await.unwrap();
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                .await
                .unwrap();
            String::from_utf8_lossy(&buf[..n]).to_string()
        });

        let heartbeat = Heartbeat::new(Some(format!("http://{}/ping", addr)));
        assert!(heartbeat.pulse().await);

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /ping"));
    }

    #[tokio::test]
    async fn test_pulse_failure_is_not_fatal() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let heartbeat = Heartbeat::new(Some(format!("http://{}/ping", addr)));
        assert!(!heartbeat.pulse().await);
    }
}
