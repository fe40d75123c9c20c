//! In-memory data node.
//!
//! Serves the data protocol (PUT/GET/DELETE/GET_META) over the framed TCP
//! server. Values live in a concurrent map keyed by key hash; this stands in
//! for the persistent-memory engine at the same wire boundary, which is all
//! the proxy and client ever see.

use crate::config::NodeConfig;
use crate::error::Result;
use crate::network::rpc::{
    decode_message, frame_message, DataOp, DataReply, DataRequest,
};
use crate::network::server::{FrameHandler, NetworkServer, ReplySender};
use crate::types::{BlockMeta, KeyHash};
use bytes::Bytes;
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// One stored value and its block descriptor.
#[derive(Debug, Clone)]
struct StoredValue {
    payload: Bytes,
    address: u64,
}

/// Request handling for one data node.
struct DataFrameHandler {
    store: Arc<DashMap<KeyHash, StoredValue>>,
}

impl DataFrameHandler {
    fn handle(&self, request: DataRequest) -> DataReply {
        match request.op {
            DataOp::Put => {
                // Address assignment is the storage engine's business; the
                // in-memory node derives a stable one from the key hash.
                let address = request.key;
                let size = request.payload.len() as u64;
                self.store.insert(
                    request.key,
                    StoredValue {
                        payload: request.payload,
                        address,
                    },
                );
                DataReply::ack(DataOp::Put, request.rid, request.key, size)
            }
            DataOp::Get => match self.store.get(&request.key) {
                Some(entry) => DataReply::value(
                    request.rid,
                    request.key,
                    entry.address,
                    entry.payload.clone(),
                ),
                None => DataReply::failure(DataOp::Get, request.rid, request.key),
            },
            DataOp::Delete => {
                self.store.remove(&request.key);
                DataReply::ack(DataOp::Delete, request.rid, request.key, 0)
            }
            DataOp::GetMeta => match self.store.get(&request.key) {
                Some(entry) => DataReply::meta(
                    request.rid,
                    request.key,
                    vec![BlockMeta {
                        address: entry.address,
                        size: entry.payload.len() as u64,
                    }],
                ),
                None => DataReply::failure(DataOp::GetMeta, request.rid, request.key),
            },
        }
    }
}

impl FrameHandler for DataFrameHandler {
    fn on_frame(&self, conn_id: u64, frame: Vec<u8>, replies: &ReplySender) {
        let request = match decode_message::<DataRequest>(&frame) {
            Ok(request) => request,
            Err(e) => {
                warn!(conn_id, error = %e, "dropping undecodable data frame");
                return;
            }
        };

        let reply = self.handle(request);
        match frame_message(&reply) {
            Ok(frame) => replies.send(frame),
            Err(e) => error!(rid = reply.rid, error = %e, "failed to encode data reply"),
        }
    }
}

/// A running data node.
pub struct DataNode {
    store: Arc<DashMap<KeyHash, StoredValue>>,
    shutdown_tx: mpsc::Sender<()>,
    server_task: JoinHandle<()>,
    local_addr: SocketAddr,
}

impl DataNode {
    /// Bind the data service and start serving.
    pub async fn launch(config: NodeConfig) -> Result<DataNode> {
        let store = Arc::new(DashMap::new());
        let handler = Arc::new(DataFrameHandler {
            store: store.clone(),
        });

        let (server, shutdown_tx) = NetworkServer::bind(config.bind_addr, handler).await?;
        let local_addr = server.local_addr()?;
        let server_task = tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!(error = %e, "data node server loop failed");
            }
        });

        info!(addr = %local_addr, "data node started");
        Ok(DataNode {
            store,
            shutdown_tx,
            server_task,
            local_addr,
        })
    }

    /// Actual bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of keys currently stored.
    pub fn key_count(&self) -> usize {
        self.store.len()
    }

    /// Stop serving.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
        self.server_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> DataFrameHandler {
        DataFrameHandler {
            store: Arc::new(DashMap::new()),
        }
    }

    #[test]
    fn test_put_then_get() {
        let handler = handler();
        let put = handler.handle(DataRequest::put(1, 42, Bytes::from_static(b"value")));
        assert!(put.success);
        assert_eq!(put.size, 5);

        let get = handler.handle(DataRequest::get(2, 42));
        assert!(get.success);
        assert_eq!(get.payload, Bytes::from_static(b"value"));
    }

    #[test]
    fn test_get_missing_fails() {
        let handler = handler();
        let get = handler.handle(DataRequest::get(1, 42));
        assert!(!get.success);
        assert_eq!(get.rid, 1);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let handler = handler();
        handler.handle(DataRequest::put(1, 42, Bytes::from_static(b"v")));
        assert!(handler.handle(DataRequest::delete(2, 42)).success);
        assert!(handler.handle(DataRequest::delete(3, 42)).success);
        assert!(!handler.handle(DataRequest::get(4, 42)).success);
    }

    #[test]
    fn test_get_meta_describes_stored_block() {
        let handler = handler();
        handler.handle(DataRequest::put(1, 7, Bytes::from_static(b"abcdefgh")));

        let meta = handler.handle(DataRequest::get_meta(2, 7));
        assert!(meta.success);
        assert_eq!(meta.blocks.len(), 1);
        assert_eq!(meta.blocks[0].size, 8);

        let missing = handler.handle(DataRequest::get_meta(3, 8));
        assert!(!missing.success);
    }
}
