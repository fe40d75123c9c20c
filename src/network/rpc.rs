//! Wire message types and their codecs.
//!
//! Every message family is a serde struct encoded with bincode, so the wire
//! field order is exactly the declaration order. Frames carry a 4-byte
//! big-endian length prefix. This is a trusted internal protocol: decoding
//! rejects empty or truncated input but makes no attempt to survive
//! adversarial bytes.

use crate::error::NetworkError;
use crate::types::{BlockMeta, KeyHash, NodeAddr, RequestId};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Maximum accepted frame body size.
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Routing operations understood by the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutingOp {
    /// Resolve the node owning a key hash.
    GetHosts,
}

/// Data operations understood by a data node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataOp {
    Put,
    Get,
    Delete,
    GetMeta,
}

/// Routing request sent from a client to the proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingRequest {
    pub op: RoutingOp,
    pub rid: RequestId,
    pub key: KeyHash,
}

impl RoutingRequest {
    pub fn get_hosts(rid: RequestId, key: KeyHash) -> Self {
        Self {
            op: RoutingOp::GetHosts,
            rid,
            key,
        }
    }
}

/// Routing reply from the proxy, carrying the resolved node address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingReply {
    pub op: RoutingOp,
    pub success: bool,
    pub rid: RequestId,
    pub host: NodeAddr,
}

impl RoutingReply {
    /// Reply for a successfully resolved node.
    pub fn resolved(rid: RequestId, host: NodeAddr) -> Self {
        Self {
            op: RoutingOp::GetHosts,
            success: true,
            rid,
            host,
        }
    }

    /// Reply when no node could be resolved (empty ring).
    pub fn no_node(rid: RequestId) -> Self {
        Self {
            op: RoutingOp::GetHosts,
            success: false,
            rid,
            host: NodeAddr::new(),
        }
    }
}

/// Data request sent from a client to a data node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRequest {
    pub op: DataOp,
    pub rid: RequestId,
    pub key: KeyHash,
    /// Payload size in bytes; zero for GET/DELETE/GET_META.
    pub size: u64,
    /// Block address within the owning node's pool; zero lets the node pick.
    pub address: u64,
    /// Value bytes for PUT; empty otherwise.
    pub payload: Bytes,
}

impl DataRequest {
    pub fn put(rid: RequestId, key: KeyHash, payload: Bytes) -> Self {
        Self {
            op: DataOp::Put,
            rid,
            key,
            size: payload.len() as u64,
            address: 0,
            payload,
        }
    }

    pub fn get(rid: RequestId, key: KeyHash) -> Self {
        Self {
            op: DataOp::Get,
            rid,
            key,
            size: 0,
            address: 0,
            payload: Bytes::new(),
        }
    }

    pub fn delete(rid: RequestId, key: KeyHash) -> Self {
        Self {
            op: DataOp::Delete,
            rid,
            key,
            size: 0,
            address: 0,
            payload: Bytes::new(),
        }
    }

    pub fn get_meta(rid: RequestId, key: KeyHash) -> Self {
        Self {
            op: DataOp::GetMeta,
            rid,
            key,
            size: 0,
            address: 0,
            payload: Bytes::new(),
        }
    }
}

/// Data reply from a data node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataReply {
    pub op: DataOp,
    pub success: bool,
    pub rid: RequestId,
    pub key: KeyHash,
    pub size: u64,
    pub address: u64,
    /// Value bytes for GET; empty otherwise.
    pub payload: Bytes,
    /// Block descriptors for GET_META; empty otherwise.
    pub blocks: Vec<BlockMeta>,
}

impl DataReply {
    /// Acknowledgment without a payload (PUT/DELETE).
    pub fn ack(op: DataOp, rid: RequestId, key: KeyHash, size: u64) -> Self {
        Self {
            op,
            success: true,
            rid,
            key,
            size,
            address: 0,
            payload: Bytes::new(),
            blocks: Vec::new(),
        }
    }

    /// Successful GET reply carrying the value.
    pub fn value(rid: RequestId, key: KeyHash, address: u64, payload: Bytes) -> Self {
        Self {
            op: DataOp::Get,
            success: true,
            rid,
            key,
            size: payload.len() as u64,
            address,
            payload,
            blocks: Vec::new(),
        }
    }

    /// Successful GET_META reply carrying block descriptors.
    pub fn meta(rid: RequestId, key: KeyHash, blocks: Vec<BlockMeta>) -> Self {
        Self {
            op: DataOp::GetMeta,
            success: true,
            rid,
            key,
            size: 0,
            address: 0,
            payload: Bytes::new(),
            blocks,
        }
    }

    /// Failure reply for any data operation.
    pub fn failure(op: DataOp, rid: RequestId, key: KeyHash) -> Self {
        Self {
            op,
            success: false,
            rid,
            key,
            size: 0,
            address: 0,
            payload: Bytes::new(),
            blocks: Vec::new(),
        }
    }
}

/// Encode a message to its wire bytes. Total for every valid message.
pub fn encode_message<T: Serialize>(msg: &T) -> Result<Vec<u8>, NetworkError> {
    bincode::serialize(msg).map_err(|e| NetworkError::Serialization(e.to_string()))
}

/// Decode a message from wire bytes.
///
/// Fails with [`NetworkError::Decode`] on empty or truncated input.
pub fn decode_message<T: DeserializeOwned>(data: &[u8]) -> Result<T, NetworkError> {
    if data.is_empty() {
        return Err(NetworkError::Decode("empty frame".to_string()));
    }
    bincode::deserialize(data).map_err(|e| NetworkError::Decode(e.to_string()))
}

/// Frame a message with a u32 big-endian length prefix for transmission.
pub fn frame_message<T: Serialize>(msg: &T) -> Result<Vec<u8>, NetworkError> {
    let data = encode_message(msg)?;
    let len = data.len() as u32;

    let mut framed = Vec::with_capacity(4 + data.len());
    framed.extend_from_slice(&len.to_be_bytes());
    framed.extend_from_slice(&data);

    Ok(framed)
}
