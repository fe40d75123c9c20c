//! Distributed key-value store with consistent-hash routing.
//!
//! This crate provides the three roles of a sharded store:
//!
//! - **Proxy** ([`ProxyServer`]): owns the consistent-hash ring and answers
//!   GET_HOSTS routing requests, mapping each 64-bit key hash to the data
//!   node owning it.
//! - **Client** ([`KvClient`]): hashes keys, resolves the owning node
//!   through the proxy, then runs PUT/GET/DELETE/GET_META on a cached
//!   per-node channel. Replies are correlated to callers by request id.
//! - **Data node** ([`DataNode`]): serves the data protocol from an
//!   in-memory store, standing in for a persistent-memory engine at the
//!   same wire boundary.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐  GET_HOSTS   ┌───────────┐
//! │ KvClient │─────────────▶│ProxyServer│  ring: key hash → node
//! │          │◀─────────────│ (worker)  │
//! └──────────┘   host       └───────────┘
//!      │
//!      │ PUT/GET/DELETE/GET_META  (channel per node)
//!      ▼
//! ┌──────────┐   ┌──────────┐   ┌──────────┐
//! │ DataNode │   │ DataNode │   │ DataNode │
//! └──────────┘   └──────────┘   └──────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use ringkv::{ClientConfig, KvClient};
//!
//! #[tokio::main]
//! async fn main() -> ringkv::Result<()> {
//!     let client = KvClient::connect(ClientConfig::new("127.0.0.1:9700")).await?;
//!
//!     client.put("user:42", &b"alice"[..]).await?;
//!     let value = client.get("user:42").await?;
//!     assert_eq!(&value[..], b"alice");
//!
//!     client.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod network;
pub mod node;
pub mod proxy;
pub mod replication;
pub mod ring;
pub mod types;

#[cfg(test)]
mod testing;

pub use client::KvClient;
pub use config::{ClientConfig, NodeConfig, ProxyConfig, DEFAULT_VIRTUAL_FACTOR};
pub use error::{Error, NetworkError, Result, RoutingError};
pub use node::DataNode;
pub use proxy::{ProxyRouter, ProxyServer};
pub use replication::{ReplicaOp, ReplicaReply, ReplicaRequest};
pub use ring::HashRing;
pub use types::{hash_key, BlockMeta, KeyHash, NodeAddr, RequestId};
