//! Node-to-node replication protocol schema.
//!
//! Message contract only; the replicated store itself is external. The
//! exchange between a writing node and a replica holder is:
//!
//! ```text
//! replica ── Register { key range } ──▶ peer      (announce once)
//! writer  ── Replicate { value }    ──▶ replica   (per written value)
//! peer    ── ReplicaReply { rid }   ──▶ sender    (per Register/Replicate)
//! ```
//!
//! Replica selection, replication-factor enforcement and conflict
//! resolution are out of scope here.

use crate::types::{KeyHash, NodeAddr, RequestId};
use serde::{Deserialize, Serialize};

/// Replication opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplicaOp {
    /// A node announces itself as replica holder for a key range.
    Register,
    /// Propagate a written value to a replica.
    Replicate,
    /// Acknowledge a Register or Replicate, carrying its rid.
    ReplicaReply,
}

/// Replica request, sent for Register and Replicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaRequest {
    pub op: ReplicaOp,
    pub rid: RequestId,
    pub key: KeyHash,
    /// Identity of the node this message is about.
    pub node: NodeAddr,
    /// Source buffer descriptor for the value being replicated.
    pub src_address: u64,
}

impl ReplicaRequest {
    pub fn register(rid: RequestId, key: KeyHash, node: NodeAddr) -> Self {
        Self {
            op: ReplicaOp::Register,
            rid,
            key,
            node,
            src_address: 0,
        }
    }

    pub fn replicate(rid: RequestId, key: KeyHash, node: NodeAddr, src_address: u64) -> Self {
        Self {
            op: ReplicaOp::Replicate,
            rid,
            key,
            node,
            src_address,
        }
    }
}

/// Replica reply, acknowledging a [`ReplicaRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaReply {
    pub op: ReplicaOp,
    pub success: bool,
    pub rid: RequestId,
    pub key: KeyHash,
    pub node: NodeAddr,
    pub src_address: u64,
}

impl ReplicaReply {
    /// Acknowledge `request` with the given status.
    pub fn ack(request: &ReplicaRequest, success: bool) -> Self {
        Self {
            op: ReplicaOp::ReplicaReply,
            success,
            rid: request.rid,
            key: request.key,
            node: request.node.clone(),
            src_address: request.src_address,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::rpc::{decode_message, encode_message};

    #[test]
    fn test_replica_request_round_trip() {
        let request = ReplicaRequest::replicate(11, u64::MAX, "10.0.0.3:9800".to_string(), 0x4000);
        let decoded: ReplicaRequest =
            decode_message(&encode_message(&request).unwrap()).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_replica_reply_correlates_to_request() {
        let request = ReplicaRequest::register(3, 99, "n1:9800".to_string());
        let reply = ReplicaReply::ack(&request, true);
        assert_eq!(reply.rid, request.rid);
        assert_eq!(reply.op, ReplicaOp::ReplicaReply);

        let decoded: ReplicaReply = decode_message(&encode_message(&reply).unwrap()).unwrap();
        assert_eq!(decoded, reply);
    }

    #[test]
    fn test_replica_empty_node_round_trip() {
        let request = ReplicaRequest::register(1, 0, String::new());
        let decoded: ReplicaRequest =
            decode_message(&encode_message(&request).unwrap()).unwrap();
        assert_eq!(decoded, request);
    }
}
