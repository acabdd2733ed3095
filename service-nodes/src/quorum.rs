// Copyright (c) 2024 The Palisade Project

//! Per-block testing quorums.
//!
//! Each block pseudo-randomly partitions the active set into a small quorum
//! of voters and a set of nodes the quorum tests for liveness. The draw must
//! be byte-identical on every node: the generator is MT19937-64 seeded from
//! the block hash, and the shuffle is a Fisher-Yates with rejection-sampled
//! bounded draws so no platform- or library-defined distribution sneaks into
//! consensus.

use rand_mt::Mt64;
use serde::{Deserialize, Serialize};

use psd_chain::{BlockHash, PublicKey};

use crate::constants::{MIN_TEST, NTH_TO_TEST, QUORUM_SIZE};

/// The quorum derived at one block height.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuorumState {
    /// Nodes voting on liveness at this height.
    pub quorum_nodes: Vec<PublicKey>,
    /// Nodes under test at this height. Deregistrations reference positions
    /// in this vector.
    pub nodes_to_test: Vec<PublicKey>,
}

impl QuorumState {
    /// Derive the quorum for a block with hash `block_hash` from the active
    /// node keys, which must already be in sorted key order.
    pub fn derive(block_hash: &BlockHash, keys: &[PublicKey]) -> Self {
        let seed = u64::from_le_bytes(
            block_hash[0..8].try_into().expect("hash is 32 bytes"),
        );

        let mut indexes: Vec<usize> = (0..keys.len()).collect();
        deterministic_shuffle(&mut indexes, seed);

        let quorum_len = keys.len().min(QUORUM_SIZE);
        let quorum_nodes: Vec<PublicKey> =
            indexes[..quorum_len].iter().map(|&i| keys[i]).collect();

        let remaining = keys.len() - quorum_len;
        let test_len = (remaining / NTH_TO_TEST).max(MIN_TEST.min(remaining));
        let nodes_to_test: Vec<PublicKey> = indexes[quorum_len..quorum_len + test_len]
            .iter()
            .map(|&i| keys[i])
            .collect();

        Self {
            quorum_nodes,
            nodes_to_test,
        }
    }
}

/// Shuffle `items` in place, deterministically for a given seed.
///
/// Fisher-Yates over an MT19937-64 stream. The bounded draw uses rejection
/// sampling on the raw 64-bit output so the result depends only on the
/// generator, never on a library's uniform-distribution implementation.
pub fn deterministic_shuffle<T>(items: &mut [T], seed: u64) {
    let mut rng = Mt64::new(seed);
    for i in (1..items.len()).rev() {
        let j = bounded_draw(&mut rng, (i + 1) as u64) as usize;
        items.swap(i, j);
    }
}

fn bounded_draw(rng: &mut Mt64, n: u64) -> u64 {
    debug_assert!(n > 0);
    let usable_max = u64::MAX - u64::MAX % n;
    loop {
        let v = rng.next_u64();
        if v < usable_max {
            return v / (usable_max / n);
        }
    }
}
