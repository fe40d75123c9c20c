//! Core types shared by the proxy, client and data nodes.

use serde::{Deserialize, Serialize};
use std::hash::Hasher;
use twox_hash::XxHash64;

/// Address of a physical data node (host:port).
pub type NodeAddr = String;

/// Correlation id for an outstanding request.
///
/// Unique per outstanding request within one client instance; replies are
/// matched strictly by this id, so processing order does not matter.
pub type RequestId = u64;

/// 64-bit digest of a user key, computed once on the client and carried
/// through every wire message.
pub type KeyHash = u64;

/// Hash a user key to its 64-bit wire representation.
pub fn hash_key(key: &str) -> KeyHash {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(key.as_bytes());
    hasher.finish()
}

/// Descriptor of one stored block, as returned by GET_META.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockMeta {
    /// Address of the block inside the owning node's pool.
    pub address: u64,
    /// Block size in bytes.
    pub size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_key_deterministic() {
        assert_eq!(hash_key("foo"), hash_key("foo"));
        assert_ne!(hash_key("foo"), hash_key("bar"));
    }

    #[test]
    fn test_hash_key_empty() {
        // Empty keys are legal, they just hash like any other input.
        assert_eq!(hash_key(""), hash_key(""));
    }
}
