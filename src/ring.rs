//! Consistent hashing ring with virtual nodes.
//!
//! Maps a 64-bit key hash to one physical node. Each physical node occupies
//! a configurable number of virtual positions on the ring so that keys spread
//! evenly and a node join/leave only moves the keys adjacent to its positions.

use crate::error::{Error, Result, RoutingError};
use crate::types::{hash_key, KeyHash, NodeAddr};
use std::collections::{BTreeMap, HashMap};

/// A consistent hash ring mapping key hashes to physical nodes.
///
/// The ring itself is a plain value; callers that share it across tasks wrap
/// it in a lock (see [`crate::proxy::ProxyRouter`]) so that all virtual
/// positions of a node become visible to readers atomically.
#[derive(Debug, Clone, Default)]
pub struct HashRing {
    /// Virtual positions mapped to their owning physical node.
    positions: BTreeMap<u64, NodeAddr>,

    /// Physical nodes and the virtual factor each was added with.
    nodes: HashMap<NodeAddr, usize>,
}

impl HashRing {
    /// Create a new empty ring.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of physical nodes on the ring.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the ring has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether the given node is on the ring.
    pub fn contains_node(&self, node: &str) -> bool {
        self.nodes.contains_key(node)
    }

    /// Add a physical node with `virtual_factor` virtual positions.
    ///
    /// Positions are derived deterministically from `hash("{node}:{index}")`.
    /// If two virtual positions collide, the first inserted keeps the slot;
    /// a rare degenerate case that costs one virtual position, not extra
    /// hashing. Adding an already-present node is a no-op.
    pub fn add_node(&mut self, node: &str, virtual_factor: usize) -> Result<()> {
        if virtual_factor == 0 {
            return Err(Error::Config(format!(
                "virtual factor must be positive, got 0 for node {node}"
            )));
        }
        if self.nodes.contains_key(node) {
            return Ok(());
        }

        self.nodes.insert(node.to_string(), virtual_factor);
        for index in 0..virtual_factor {
            let position = Self::position_hash(node, index);
            self.positions
                .entry(position)
                .or_insert_with(|| node.to_string());
        }
        Ok(())
    }

    /// Remove a physical node and all of its virtual positions.
    ///
    /// No-op if the node is absent. Only positions that still map to this
    /// node are erased, so a node that lost a collision never evicts the
    /// winner's position.
    pub fn remove_node(&mut self, node: &str) {
        let Some(virtual_factor) = self.nodes.remove(node) else {
            return;
        };
        for index in 0..virtual_factor {
            let position = Self::position_hash(node, index);
            if self.positions.get(&position).map(String::as_str) == Some(node) {
                self.positions.remove(&position);
            }
        }
    }

    /// Resolve the node owning `key_hash`.
    ///
    /// Returns the node at the smallest position at or after the hash,
    /// wrapping to the smallest position on the ring. Deterministic and
    /// side-effect free; fails only if the ring is empty.
    pub fn get_node(&self, key_hash: KeyHash) -> std::result::Result<&str, RoutingError> {
        match self
            .positions
            .range(key_hash..)
            .next()
            .or_else(|| self.positions.iter().next())
        {
            Some((_, node)) => Ok(node.as_str()),
            None => Err(RoutingError::EmptyRing),
        }
    }

    /// Position of one virtual node on the ring.
    fn position_hash(node: &str, index: usize) -> u64 {
        hash_key(&format!("{node}:{index}"))
    }
}
