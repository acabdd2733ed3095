// Copyright (c) 2024 The Palisade Project

//! Read-only interface onto the chain store.
//!
//! Consensus components that react to chain events (the service-node
//! registry in particular) hold a shared handle to an implementation of
//! [`ChainStore`] and never mutate it. The node's ledger provides the real
//! implementation; tests provide mocks.

use thiserror::Error;

use crate::block::{Block, BlockHash};
use crate::transaction::{Transaction, TxHash};

#[derive(Debug, Error)]
pub enum ChainStoreError {
    /// No block is stored at the requested height
    #[error("no block stored at height {0}")]
    BlockNotFound(u64),

    /// The underlying store failed
    #[error("chain store failure: {0}")]
    Storage(String),
}

/// Read-only chain access.
pub trait ChainStore: Send + Sync {
    /// Current blockchain height (the height the next block will have).
    fn current_height(&self) -> u64;

    /// Hard-fork version in force at `height`.
    fn hard_fork_version(&self, height: u64) -> u8;

    /// Minimum total stake required of a registration at `height`.
    fn staking_requirement(&self, height: u64) -> u64;

    /// Blocks from `start`, at most `count`, as (blob, block) pairs in
    /// ascending height order. Fewer than `count` are returned at the tip.
    fn get_blocks(&self, start: u64, count: u64)
        -> Result<Vec<(Vec<u8>, Block)>, ChainStoreError>;

    /// Look up transactions by hash. Returns the transactions found and the
    /// hashes that were missed, preserving order within each list.
    fn get_transactions(&self, hashes: &[TxHash]) -> (Vec<Transaction>, Vec<TxHash>);

    /// Canonical block hash at `height`, or `None` off the end of the chain.
    fn block_id_by_height(&self, height: u64) -> Option<BlockHash>;
}
