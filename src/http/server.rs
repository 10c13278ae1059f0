//! HTTP server implementation.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::service::router;
use crate::error::Result;
use crate::ratelimit::RateLimiterManager;

/// HTTP server for the rate limit API.
pub struct HttpServer {
    /// Address to bind to
    addr: SocketAddr,
    /// The shared manager
    manager: Arc<RateLimiterManager>,
}

impl HttpServer {
    /// Create a new HTTP server around `manager`.
    pub fn new(addr: SocketAddr, manager: Arc<RateLimiterManager>) -> Self {
        Self { addr, manager }
    }

    /// Start the HTTP server with graceful shutdown.
    ///
    /// The server will shut down when the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr).await?;
        info!(
            addr = %listener.local_addr()?,
            "HTTP server listening"
        );

        axum::serve(listener, router(self.manager))
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP server failed");
                e.into()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::{ManualClock, Policy};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    #[test]
    fn test_server_creation() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let manager = Arc::new(RateLimiterManager::default());
        let _server = HttpServer::new(addr, manager);
    }

    #[tokio::test]
    async fn test_serves_until_shutdown() {
        // Reserve a free port, then hand it to the server
        let addr = TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap()
            .local_addr()
            .unwrap();

        let manager = Arc::new(RateLimiterManager::with_clock(Arc::new(ManualClock::new(0))));
        manager
            .configure(&Policy::new("fixed_window").with_limit(1).with_window_secs(60))
            .unwrap();

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(HttpServer::new(addr, manager).serve_with_shutdown(async move {
            let _ = rx.await;
        }));

        let mut stream = loop {
            match TcpStream::connect(addr).await {
                Ok(stream) => break stream,
                Err(_) => tokio::task::yield_now().await,
            }
        };
        stream
            .write_all(b"POST /request?clientId=alice HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"), "unexpected response: {}", response);

        tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
