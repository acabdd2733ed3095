// Copyright (c) 2024 The Palisade Project

//! Shared test fixtures: an in-memory chain store and transaction builders.
//!
//! Not every integration binary uses every helper.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use curve25519_dalek::scalar::Scalar;
use rand::rngs::OsRng;

use psd_chain::extra::{DeregistrationData, ExtraField, RegistrationData, TxExtra};
use psd_chain::keys::{
    derivation_to_scalar, derive_public_key, deterministic_keypair, generate_key_derivation,
    SecretKey,
};
use psd_chain::ringct::{encode_amount, RctSignatures, RctType};
use psd_chain::{
    Block, BlockHash, ChainStore, ChainStoreError, PublicAddress, PublicKey, Transaction, TxHash,
    TxOutput, TxVersion,
};
use psd_service_nodes::constants::STAKE_LOCK_BLOCKS;

/// Default staking requirement enforced by [`MockChain`].
pub const STAKE_REQUIREMENT: u64 = 1_000_000_000;

pub fn random_key() -> PublicKey {
    SecretKey::from_scalar(Scalar::random(&mut OsRng)).public_key()
}

pub fn random_address() -> PublicAddress {
    PublicAddress::new(random_key(), random_key())
}

#[derive(Default)]
struct ChainData {
    blocks: BTreeMap<u64, Block>,
    txs: HashMap<TxHash, Transaction>,
}

/// An in-memory chain store. Blocks are appended with [`MockChain::push_block`]
/// and the store hands them back through the read-only [`ChainStore`] trait.
pub struct MockChain {
    data: RwLock<ChainData>,
    hard_fork_version: u8,
    staking_requirement: u64,
    start_height: u64,
}

impl MockChain {
    /// A chain whose first pushed block lands at height 0.
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// A chain whose first pushed block lands at `start_height`, as though
    /// all earlier history existed but is irrelevant.
    pub fn starting_at(start_height: u64) -> Self {
        Self {
            data: RwLock::new(ChainData::default()),
            hard_fork_version: 9,
            staking_requirement: STAKE_REQUIREMENT,
            start_height,
        }
    }

    /// Append a block carrying `txs`, with `winner` named in the miner tx.
    /// Returns the block and its transactions for feeding to the registry.
    pub fn push_block(
        &self,
        txs: Vec<Transaction>,
        winner: PublicKey,
    ) -> (Block, Vec<Transaction>) {
        let mut data = self.data.write().unwrap();

        let height = data
            .blocks
            .last_key_value()
            .map(|(h, _)| h + 1)
            .unwrap_or(self.start_height);
        let prev_hash = data
            .blocks
            .last_key_value()
            .map(|(_, b)| b.hash())
            .unwrap_or([0u8; 32]);

        let mut miner_tx = Transaction::default();
        miner_tx.extra.push(ExtraField::ServiceNodeWinner(winner));

        let mut block = Block::default();
        block.header.major_version = self.hard_fork_version;
        block.header.height = height;
        block.header.prev_hash = prev_hash;
        block.miner_tx = miner_tx;
        block.tx_hashes = txs.iter().map(|tx| tx.hash()).collect();

        for tx in &txs {
            data.txs.insert(tx.hash(), tx.clone());
        }
        data.blocks.insert(height, block.clone());

        (block, txs)
    }

    /// Append an empty block.
    pub fn push_empty_block(&self) -> (Block, Vec<Transaction>) {
        self.push_block(Vec::new(), PublicKey::NULL)
    }

    /// Drop every block at or above `height`, as a reorg would.
    pub fn truncate(&self, height: u64) {
        let mut data = self.data.write().unwrap();
        let _ = data.blocks.split_off(&height);
    }
}

impl ChainStore for MockChain {
    fn current_height(&self) -> u64 {
        let data = self.data.read().unwrap();
        data.blocks
            .last_key_value()
            .map(|(h, _)| h + 1)
            .unwrap_or(self.start_height)
    }

    fn hard_fork_version(&self, _height: u64) -> u8 {
        self.hard_fork_version
    }

    fn staking_requirement(&self, _height: u64) -> u64 {
        self.staking_requirement
    }

    fn get_blocks(
        &self,
        start: u64,
        count: u64,
    ) -> Result<Vec<(Vec<u8>, Block)>, ChainStoreError> {
        let data = self.data.read().unwrap();
        Ok(data
            .blocks
            .range(start..start.saturating_add(count))
            .map(|(_, block)| {
                let blob = bincode::serialize(block).unwrap_or_default();
                (blob, block.clone())
            })
            .collect())
    }

    fn get_transactions(&self, hashes: &[TxHash]) -> (Vec<Transaction>, Vec<TxHash>) {
        let data = self.data.read().unwrap();
        let mut found = Vec::new();
        let mut missed = Vec::new();
        for hash in hashes {
            match data.txs.get(hash) {
                Some(tx) => found.push(tx.clone()),
                None => missed.push(*hash),
            }
        }
        (found, missed)
    }

    fn block_id_by_height(&self, height: u64) -> Option<BlockHash> {
        let data = self.data.read().unwrap();
        data.blocks.get(&height).map(|b| b.hash())
    }
}

/// Build a registration transaction for `service_node_key` at `block_height`.
///
/// `recipients` pairs each beneficiary address with its share;
/// `stake_amounts` is the confidential amount staked into the matching
/// output, decodable with the fixed governance key.
pub fn registration_tx(
    block_height: u64,
    service_node_key: PublicKey,
    recipients: &[(PublicAddress, u64)],
    stake_amounts: &[u64],
) -> Transaction {
    assert_eq!(recipients.len(), stake_amounts.len());

    let (_gov_pub, gov_sec) = deterministic_keypair(1);

    let mut outputs = Vec::new();
    let mut rct = RctSignatures {
        rct_type: RctType::Simple,
        ..Default::default()
    };
    for (i, ((address, _share), amount)) in recipients.iter().zip(stake_amounts).enumerate() {
        let derivation =
            generate_key_derivation(&address.view, &gov_sec).expect("valid view key");
        let shared_scalar = derivation_to_scalar(&derivation, i as u64);
        let (ecdh, commitment) = encode_amount(*amount, &shared_scalar);
        rct.ecdh_info.push(ecdh);
        rct.commitments.push(commitment);

        let one_time = derive_public_key(&derivation, i as u64, &address.spend)
            .expect("valid spend key");
        outputs.push(TxOutput::to_key(0, one_time));
    }

    let mut extra = TxExtra::default();
    extra.push(ExtraField::TxPublicKey(random_key()));
    extra.push(ExtraField::Registration(RegistrationData {
        spend_keys: recipients.iter().map(|(a, _)| a.spend).collect(),
        view_keys: recipients.iter().map(|(a, _)| a.view).collect(),
        shares: recipients.iter().map(|(_, s)| *s).collect(),
        service_node_key,
    }));

    Transaction {
        version: TxVersion::V2RingCt,
        unlock_time: block_height + STAKE_LOCK_BLOCKS,
        outputs,
        extra,
        rct,
    }
}

/// Build a deregistration transaction voting off `node_index` of the test set
/// at `target_height`.
pub fn deregistration_tx(target_height: u64, node_index: u32) -> Transaction {
    let mut extra = TxExtra::default();
    extra.push(ExtraField::Deregistration(DeregistrationData {
        block_height: target_height,
        node_index,
    }));

    Transaction {
        version: TxVersion::V3Deregister,
        extra,
        ..Default::default()
    }
}

/// Build a miner transaction for `height` naming `winner` and paying each
/// `(address, amount)` at the expected derived one-time key, with a trailing
/// governance output.
pub fn miner_tx_paying(
    height: u64,
    winner: PublicKey,
    payouts: &[(PublicAddress, u64)],
) -> Transaction {
    let (_gov_pub, gov_sec) = deterministic_keypair(height);

    let total_outputs = payouts.len() + 1;
    let mut outputs = Vec::new();
    for (i, (address, amount)) in payouts.iter().enumerate() {
        let vout_index = total_outputs - 1 - payouts.len() + i;
        let derivation =
            generate_key_derivation(&address.view, &gov_sec).expect("valid view key");
        let key = derive_public_key(&derivation, vout_index as u64, &address.spend)
            .expect("valid spend key");
        outputs.push(TxOutput::to_key(*amount, key));
    }
    // Trailing governance output.
    outputs.push(TxOutput::to_key(0, random_key()));

    let mut extra = TxExtra::default();
    extra.push(ExtraField::ServiceNodeWinner(winner));

    Transaction {
        version: TxVersion::V2RingCt,
        outputs,
        extra,
        ..Default::default()
    }
}
