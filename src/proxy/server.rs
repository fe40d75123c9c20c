//! Proxy server wiring: framed TCP listener, request queue, worker, router.
//!
//! Per request the path is decode → queue → worker → encode → fire-and-forget
//! write back to the originating connection. Undecodable frames are logged
//! and dropped; the connection stays open.

use crate::config::ProxyConfig;
use crate::error::{Error, Result};
use crate::network::rpc::{decode_message, RoutingRequest};
use crate::network::server::{FrameHandler, NetworkServer, ReplySender};
use crate::proxy::router::ProxyRouter;
use crate::proxy::worker::{QueuedRequest, RequestQueue, Worker};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Receive path: decode and enqueue, nothing more.
struct ProxyFrameHandler {
    queue: RequestQueue,
}

impl FrameHandler for ProxyFrameHandler {
    fn on_frame(&self, conn_id: u64, frame: Vec<u8>, replies: &ReplySender) {
        match decode_message::<RoutingRequest>(&frame) {
            Ok(request) => self.queue.push(QueuedRequest {
                request,
                replies: replies.clone(),
            }),
            Err(e) => {
                warn!(conn_id, error = %e, "dropping undecodable routing frame");
            }
        }
    }
}

/// The sharding proxy: listens for routing requests and resolves each to the
/// owning data node via the consistent-hash ring.
pub struct ProxyServer {
    router: Arc<ProxyRouter>,
    worker: Worker,
    shutdown_tx: mpsc::Sender<()>,
    server_task: JoinHandle<()>,
    local_addr: SocketAddr,
}

impl ProxyServer {
    /// Validate the configuration and start listening.
    pub async fn launch(config: ProxyConfig) -> Result<ProxyServer> {
        if config.nodes.is_empty() {
            return Err(Error::Config("no data nodes configured".to_string()));
        }

        let router = Arc::new(ProxyRouter::new(&config.nodes, config.virtual_factor)?);
        let (queue, queue_rx) = RequestQueue::new();
        let worker = Worker::spawn(router.clone(), queue_rx, config.worker_poll_interval);

        let handler = Arc::new(ProxyFrameHandler { queue });
        let (server, shutdown_tx) = NetworkServer::bind(config.bind_addr, handler).await?;
        let local_addr = server.local_addr()?;

        let server_task = tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!(error = %e, "proxy server loop failed");
            }
        });

        info!(
            addr = %local_addr,
            nodes = config.nodes.len(),
            virtual_factor = config.virtual_factor,
            "proxy server started"
        );

        Ok(ProxyServer {
            router,
            worker,
            shutdown_tx,
            server_task,
            local_addr,
        })
    }

    /// Actual bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The routing core, exposed for runtime node add/remove.
    pub fn router(&self) -> &Arc<ProxyRouter> {
        &self.router
    }

    /// Stop accepting, stop the worker, wait for both.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
        self.worker.stop();
        self.worker.join().await;
        self.server_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxyConfig;

    fn config_with_nodes(nodes: Vec<String>) -> ProxyConfig {
        ProxyConfig::new("127.0.0.1:0".parse().unwrap()).with_nodes(nodes)
    }

    #[tokio::test]
    async fn test_launch_rejects_empty_node_list() {
        let result = ProxyServer::launch(config_with_nodes(vec![])).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_launch_rejects_zero_virtual_factor() {
        let config =
            config_with_nodes(vec!["a:1".to_string()]).with_virtual_factor(0);
        let result = ProxyServer::launch(config).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_launch_and_shutdown() {
        let config = config_with_nodes(vec!["a:1".to_string(), "b:1".to_string()]);
        let proxy = ProxyServer::launch(config).await.unwrap();
        assert_ne!(proxy.local_addr().port(), 0);
        assert_eq!(proxy.router().node_count(), 2);

        tokio::time::timeout(std::time::Duration::from_secs(3), proxy.shutdown())
            .await
            .expect("shutdown must be prompt");
    }
}
