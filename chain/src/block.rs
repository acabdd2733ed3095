// Copyright (c) 2024 The Palisade Project

//! Block types.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::transaction::{Transaction, TxHash};

/// Block hash.
pub type BlockHash = [u8; 32];

/// The all-zero hash, returned by lookups that miss.
pub const NULL_HASH: BlockHash = [0u8; 32];

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Hard-fork era this block was produced under.
    pub major_version: u8,
    pub prev_hash: BlockHash,
    pub height: u64,
    pub timestamp: u64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    /// The coinbase transaction paying the block producer, the service-node
    /// winner, and governance.
    pub miner_tx: Transaction,
    /// Hashes of the non-coinbase transactions in block order.
    pub tx_hashes: Vec<TxHash>,
}

impl Block {
    pub fn height(&self) -> u64 {
        self.header.height
    }

    /// Content hash over the serialized block.
    pub fn hash(&self) -> BlockHash {
        let bytes = bincode::serialize(self).expect("block serialization is infallible");
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        hasher.finalize().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_hash_depends_on_height() {
        let mut a = Block::default();
        let mut b = Block::default();
        a.header.height = 1;
        b.header.height = 2;
        assert_ne!(a.hash(), b.hash());
    }
}
