//! Routing core of the proxy: resolves key hashes to data nodes.

use crate::error::Result;
use crate::network::rpc::{RoutingReply, RoutingRequest};
use crate::ring::HashRing;
use crate::types::NodeAddr;
use parking_lot::RwLock;
use tracing::{debug, warn};

/// Owns the hash ring and answers routing requests.
///
/// Lookups take the read lock; node add/remove takes the write lock for the
/// whole insert loop, so readers never observe a node with only some of its
/// virtual positions present.
#[derive(Debug)]
pub struct ProxyRouter {
    ring: RwLock<HashRing>,
    virtual_factor: usize,
}

impl ProxyRouter {
    /// Build a router over the given nodes.
    pub fn new(nodes: &[NodeAddr], virtual_factor: usize) -> Result<Self> {
        let mut ring = HashRing::new();
        for node in nodes {
            ring.add_node(node, virtual_factor)?;
        }
        Ok(Self {
            ring: RwLock::new(ring),
            virtual_factor,
        })
    }

    /// Add a node to the ring at runtime.
    pub fn add_node(&self, node: &str) -> Result<()> {
        self.ring.write().add_node(node, self.virtual_factor)
    }

    /// Remove a node from the ring at runtime. No-op if absent.
    pub fn remove_node(&self, node: &str) {
        self.ring.write().remove_node(node);
    }

    /// Number of physical nodes currently on the ring.
    pub fn node_count(&self) -> usize {
        self.ring.read().node_count()
    }

    /// Answer one routing request.
    ///
    /// An empty ring yields `success = false`; the caller treats that as
    /// "no node available" rather than a fault.
    pub fn handle_routing_request(&self, request: &RoutingRequest) -> RoutingReply {
        match self.ring.read().get_node(request.key) {
            Ok(node) => {
                debug!(rid = request.rid, key = request.key, node, "resolved node");
                RoutingReply::resolved(request.rid, node.to_string())
            }
            Err(e) => {
                warn!(rid = request.rid, key = request.key, error = %e, "routing failed");
                RoutingReply::no_node(request.rid)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::hash_key;

    #[test]
    fn test_resolves_to_ring_owner() {
        let nodes: Vec<NodeAddr> = vec!["a:1".into(), "b:1".into(), "c:1".into()];
        let router = ProxyRouter::new(&nodes, 5).unwrap();

        let key = hash_key("foo");
        let reply = router.handle_routing_request(&RoutingRequest::get_hosts(1, key));

        assert!(reply.success);
        assert_eq!(reply.rid, 1);

        // Must agree with a direct ring lookup.
        let mut ring = HashRing::new();
        for node in &nodes {
            ring.add_node(node, 5).unwrap();
        }
        assert_eq!(reply.host, ring.get_node(key).unwrap());
    }

    #[test]
    fn test_empty_ring_reports_failure() {
        let router = ProxyRouter::new(&[], 5).unwrap();
        let reply = router.handle_routing_request(&RoutingRequest::get_hosts(9, 1234));

        assert!(!reply.success);
        assert_eq!(reply.rid, 9);
        assert!(reply.host.is_empty());
    }

    #[test]
    fn test_runtime_membership_changes() {
        let router = ProxyRouter::new(&["a:1".into()], 5).unwrap();
        router.add_node("b:1").unwrap();
        assert_eq!(router.node_count(), 2);

        router.remove_node("a:1");
        router.remove_node("a:1"); // no-op
        assert_eq!(router.node_count(), 1);

        let reply = router.handle_routing_request(&RoutingRequest::get_hosts(1, 42));
        assert!(reply.success);
        assert_eq!(reply.host, "b:1");
    }
}
