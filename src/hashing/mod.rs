use sha2::{Digest, Sha256};

use crate::blockchain::Block;

/// Lowercase hex SHA-256 of the given bytes.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Hash of a block's canonical JSON encoding. The canonical form serializes
/// its keys in sorted order, so two logically equal blocks hash identically
/// no matter how they were constructed. This digest is the sole integrity
/// link between consecutive blocks.
pub fn hash_block(block: &Block) -> String {
    let encoded = serde_json::to_string(&block.canonical()).expect("canonical block serializes");
    hash_bytes(encoded.as_bytes())
}
