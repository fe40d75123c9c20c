//! Client library.
//!
//! Every data operation is two independent round trips: a GET_HOSTS routing
//! exchange with the proxy resolves the owning node, then the operation runs
//! on that node's channel. Replies are matched by request id, so concurrent
//! callers on one channel never see each other's results.

pub mod channel;
pub mod correlator;

use crate::client::channel::{Channel, ChannelRegistry};
use crate::config::ClientConfig;
use crate::error::{Error, Result, RoutingError};
use crate::network::rpc::{DataRequest, RoutingReply, RoutingRequest};
use crate::types::{hash_key, BlockMeta, KeyHash, NodeAddr, RequestId};
use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

pub use channel::ReplyMessage;
pub use correlator::RequestCorrelator;

/// Client handle for the distributed store.
///
/// Cheap operations, no internal retry: a failed operation surfaces to the
/// caller, whose retry policy applies.
pub struct KvClient {
    proxy: Channel<RoutingReply>,
    registry: ChannelRegistry,
    next_rid: AtomicU64,
}

impl KvClient {
    /// Connect to the proxy and initialize the channel registry.
    pub async fn connect(config: ClientConfig) -> Result<KvClient> {
        let proxy = Channel::open(
            0,
            &config.proxy_addr,
            config.connect_timeout,
            config.request_timeout,
        )
        .await?;
        info!(proxy = %config.proxy_addr, "client connected to proxy");

        Ok(KvClient {
            proxy,
            registry: ChannelRegistry::new(config.connect_timeout, config.request_timeout),
            next_rid: AtomicU64::new(1),
        })
    }

    /// Store `value` under `key`.
    pub async fn put(&self, key: &str, value: impl Into<Bytes>) -> Result<()> {
        let key_hash = hash_key(key);
        let rid = self.next_rid();
        let node = self.resolve_node(rid, key_hash).await?;

        let channel = self.registry.get_channel(&node).await?;
        let reply = channel
            .call(rid, &DataRequest::put(rid, key_hash, value.into()))
            .await?;
        if reply.success {
            Ok(())
        } else {
            Err(Error::Remote(format!("put rejected for key {key:?}")))
        }
    }

    /// Fetch the value stored under `key`.
    pub async fn get(&self, key: &str) -> Result<Bytes> {
        let key_hash = hash_key(key);
        let rid = self.next_rid();
        let node = self.resolve_node(rid, key_hash).await?;

        let channel = self.registry.get_channel(&node).await?;
        let reply = channel.call(rid, &DataRequest::get(rid, key_hash)).await?;
        if reply.success {
            Ok(reply.payload)
        } else {
            Err(Error::Remote(format!("key {key:?} not found")))
        }
    }

    /// Block descriptors for the value stored under `key`.
    pub async fn get_meta(&self, key: &str) -> Result<Vec<BlockMeta>> {
        let key_hash = hash_key(key);
        let rid = self.next_rid();
        let node = self.resolve_node(rid, key_hash).await?;

        let channel = self.registry.get_channel(&node).await?;
        let reply = channel
            .call(rid, &DataRequest::get_meta(rid, key_hash))
            .await?;
        if reply.success {
            Ok(reply.blocks)
        } else {
            Err(Error::Remote(format!("key {key:?} not found")))
        }
    }

    /// Delete the value stored under `key`. Succeeds whether or not the key
    /// existed.
    pub async fn del(&self, key: &str) -> Result<()> {
        let key_hash = hash_key(key);
        let rid = self.next_rid();
        let node = self.resolve_node(rid, key_hash).await?;

        let channel = self.registry.get_channel(&node).await?;
        let reply = channel
            .call(rid, &DataRequest::delete(rid, key_hash))
            .await?;
        if reply.success {
            Ok(())
        } else {
            Err(Error::Remote(format!("delete rejected for key {key:?}")))
        }
    }

    /// Resolve the node owning `key` without touching it. One routing round
    /// trip to the proxy.
    pub async fn locate(&self, key: &str) -> Result<NodeAddr> {
        let key_hash = hash_key(key);
        let rid = self.next_rid();
        self.resolve_node(rid, key_hash).await
    }

    /// Tear down the proxy channel and every cached data channel.
    pub async fn shutdown(&self) {
        self.registry.shutdown().await;
        self.proxy.shutdown();
        info!("client shut down");
    }

    /// Routing round trip: GET_HOSTS for `key_hash`.
    async fn resolve_node(&self, rid: RequestId, key_hash: KeyHash) -> Result<NodeAddr> {
        let reply = self
            .proxy
            .call(rid, &RoutingRequest::get_hosts(rid, key_hash))
            .await?;
        if reply.success {
            Ok(reply.host)
        } else {
            Err(RoutingError::NoNode(key_hash).into())
        }
    }

    /// Next request id. Per-client-instance counter; both round trips of one
    /// logical operation share an id, as the correlators are per-channel.
    fn next_rid(&self) -> RequestId {
        self.next_rid.fetch_add(1, Ordering::Relaxed)
    }
}
