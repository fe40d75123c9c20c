//! Configuration types for the proxy, client and data nodes.

use crate::types::NodeAddr;
use std::net::SocketAddr;
use std::time::Duration;

/// Default number of virtual nodes per physical node.
pub const DEFAULT_VIRTUAL_FACTOR: usize = 5;

/// Configuration for the sharding proxy.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Address to bind the routing service to.
    pub bind_addr: SocketAddr,

    /// Data nodes that make up the ring, supplied at startup.
    pub nodes: Vec<NodeAddr>,

    /// Number of virtual nodes per physical node.
    pub virtual_factor: usize,

    /// How long the worker waits on the queue before re-checking the
    /// stop flag. Liveness knob only, not a protocol deadline.
    pub worker_poll_interval: Duration,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9700".parse().unwrap(),
            nodes: Vec::new(),
            virtual_factor: DEFAULT_VIRTUAL_FACTOR,
            worker_poll_interval: Duration::from_secs(1),
        }
    }
}

impl ProxyConfig {
    /// Create a new proxy configuration for the given bind address.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Default::default()
        }
    }

    /// Set the data nodes that make up the ring.
    pub fn with_nodes(mut self, nodes: Vec<NodeAddr>) -> Self {
        self.nodes = nodes;
        self
    }

    /// Set the number of virtual nodes per physical node.
    pub fn with_virtual_factor(mut self, factor: usize) -> Self {
        self.virtual_factor = factor;
        self
    }

    /// Set the worker queue poll interval.
    pub fn with_worker_poll_interval(mut self, interval: Duration) -> Self {
        self.worker_poll_interval = interval;
        self
    }
}

/// Configuration for the client library.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Address of the sharding proxy.
    pub proxy_addr: String,

    /// How long a caller waits for a reply before giving up.
    ///
    /// `None` waits until the connection itself fails; the default bounds
    /// the wait so a lost reply surfaces as [`crate::Error::Timeout`]
    /// instead of blocking the caller indefinitely.
    pub request_timeout: Option<Duration>,

    /// Connection establishment timeout.
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            proxy_addr: "127.0.0.1:9700".to_string(),
            request_timeout: Some(Duration::from_secs(5)),
            connect_timeout: Duration::from_secs(2),
        }
    }
}

impl ClientConfig {
    /// Create a new client configuration pointing at the given proxy.
    pub fn new(proxy_addr: impl Into<String>) -> Self {
        Self {
            proxy_addr: proxy_addr.into(),
            ..Default::default()
        }
    }

    /// Set the per-request reply timeout. `None` waits forever.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the connection establishment timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Configuration for a data node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Address to bind the data service to.
    pub bind_addr: SocketAddr,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9800".parse().unwrap(),
        }
    }
}

impl NodeConfig {
    /// Create a new data node configuration.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self { bind_addr }
    }
}
