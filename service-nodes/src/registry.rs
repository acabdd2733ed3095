// Copyright (c) 2024 The Palisade Project

//! The service-node active set and its chain-event reducer.
//!
//! [`ServiceNodeList`] is driven by four hooks: `init` (full rebuild from a
//! bounded window of recent chain history), `block_added`, and
//! `blockchain_detached` mutate state; `validate_miner_tx` is a pure check
//! against the current state. All mutators take `&mut self` and the caller
//! serializes them; read accessors may run concurrently behind whatever lock
//! the caller wraps the list in.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use psd_chain::keys::{
    derivation_to_scalar, derive_public_key, deterministic_keypair, generate_key_derivation,
    SecretKey,
};
use psd_chain::block::NULL_HASH;
use psd_chain::reward::{service_node_reward, share_of_reward, MAX_BLOCK_NUMBER, TOTAL_SHARES};
use psd_chain::ringct::decode_amount;
use psd_chain::{
    Block, BlockHash, ChainStore, PublicAddress, PublicKey, Transaction, TxOutTarget, TxVersion,
};

use crate::constants::{
    HARDFORK_ACTIVATION, QUORUM_LIFETIME, RELOCK_WINDOW, REPLAY_CHUNK, ROLLBACK_WINDOW,
    STAKE_LOCK_BLOCKS,
};
use crate::quorum::QuorumState;
use crate::rollback::{ActiveSet, RollbackEvent};

/// Everything the registry tracks about one active service node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceNodeInfo {
    /// Height of the block carrying the registration.
    pub first_height: u64,
    /// Index of the registration within that block; `-1` marks a node that
    /// was just paid (see [`ServiceNodeInfo::waiting_key`]).
    pub first_tx_index: i32,
    /// Stake beneficiaries, in registration order.
    pub recipients: Vec<PublicAddress>,
    /// Reward share per beneficiary, parallel to `recipients`.
    pub shares: Vec<u64>,
}

impl ServiceNodeInfo {
    /// Payout ordering key. Nodes waiting since the earliest registration
    /// come first; a node that was just paid (tx index `-1`) goes to the back
    /// of the queue until the rotation comes around again.
    fn waiting_key(&self) -> (bool, u64, i64) {
        let just_paid = self.first_tx_index < 0;
        (just_paid, self.first_height, self.first_tx_index as i64)
    }
}

/// The authoritative set of active service nodes, with its rollback journal
/// and quorum cache.
pub struct ServiceNodeList {
    store: Arc<dyn ChainStore>,
    active: ActiveSet,
    rollback: VecDeque<RollbackEvent>,
    quorum_states: BTreeMap<u64, QuorumState>,
}

impl ServiceNodeList {
    /// Create an empty list borrowing the given chain store. Call
    /// [`ServiceNodeList::init`] before use so the state reflects recent
    /// history.
    pub fn new(store: Arc<dyn ChainStore>) -> Self {
        Self {
            store,
            active: ActiveSet::new(),
            rollback: VecDeque::new(),
            quorum_states: BTreeMap::new(),
        }
    }

    // ------------------------------------------------------------------
    // Event hooks
    // ------------------------------------------------------------------

    /// Rebuild from scratch by replaying the window of chain history that can
    /// still influence the active set. On a chain-store failure the replay
    /// aborts with partial state; the caller should treat that as a startup
    /// failure.
    pub fn init(&mut self) {
        info!("rebuilding the service node list from recent chain history");

        self.active.clear();
        self.rollback.clear();

        let current_height = self.store.current_height();
        let start = current_height.saturating_sub(STAKE_LOCK_BLOCKS + RELOCK_WINDOW);

        let mut height = start;
        while height <= current_height {
            let blocks = match self.store.get_blocks(height, REPLAY_CHUNK) {
                Ok(blocks) => blocks,
                Err(err) => {
                    error!(height, error = %err, "unable to rebuild the service node list");
                    return;
                }
            };

            for (_blob, block) in &blocks {
                let (txs, missed) = self.store.get_transactions(&block.tx_hashes);
                if !missed.is_empty() {
                    error!(
                        height = block.height(),
                        missing = missed.len(),
                        "unable to fetch transactions while rebuilding"
                    );
                    return;
                }
                self.add_block(block, &txs);
            }

            height += REPLAY_CHUNK;
        }

        self.rollback.push_back(RollbackEvent::Barrier {
            height: current_height,
        });
    }

    /// Ingest one block and its transactions, in chain order.
    pub fn block_added(&mut self, block: &Block, txs: &[Transaction]) {
        self.add_block(block, txs);
    }

    /// The chain was truncated so that `height` is the first no-longer-valid
    /// height. Unwind the journal and drop quorums derived at or above it.
    pub fn blockchain_detached(&mut self, height: u64) {
        while let Some(event) = self.rollback.pop_back() {
            if event.height() < height {
                self.rollback.push_back(event);
                break;
            }
            if !event.apply(&mut self.active) {
                self.init();
                break;
            }
        }

        // Quorums at detached heights no longer exist on the canonical chain.
        let _ = self.quorum_states.split_off(&height);
    }

    // ------------------------------------------------------------------
    // Read accessors
    // ------------------------------------------------------------------

    /// Whether `key` is currently an active service node.
    pub fn is_service_node(&self, key: &PublicKey) -> bool {
        self.active.contains_key(key)
    }

    /// All active node keys, sorted by raw key bytes.
    pub fn service_node_pubkeys(&self) -> Vec<PublicKey> {
        self.active.keys().copied().collect()
    }

    /// The registry's record for an active node.
    pub fn service_node_info(&self, key: &PublicKey) -> Option<&ServiceNodeInfo> {
        self.active.get(key)
    }

    /// The quorum cached for `height`, when it is still within the quorum
    /// lifetime. Absence for a height that should have one is a consensus
    /// error on the caller's side.
    pub fn quorum_state(&self, height: u64) -> Option<&QuorumState> {
        self.quorum_states.get(&height)
    }

    /// Payout addresses and shares for the next block's winner. When no node
    /// is eligible the full share count goes to the designated null address.
    pub fn winner_payouts(&self, prev_hash: &BlockHash) -> Vec<(PublicAddress, u64)> {
        let winner = self.select_winner(prev_hash);
        match self.active.get(&winner) {
            Some(info) => info
                .recipients
                .iter()
                .copied()
                .zip(info.shares.iter().copied())
                .collect(),
            None => vec![(PublicAddress::NULL, TOTAL_SHARES)],
        }
    }

    /// The node to be paid by the next block: the oldest-waiting member of
    /// the active set, or the null key when the set is empty.
    pub fn select_winner(&self, _prev_hash: &BlockHash) -> PublicKey {
        self.active
            .iter()
            .min_by_key(|(_, info)| info.waiting_key())
            .map(|(key, _)| *key)
            .unwrap_or(PublicKey::NULL)
    }

    /// Check a proposed coinbase transaction against the payouts this
    /// registry would compute for `height`. Always valid below the
    /// activation hard fork.
    pub fn validate_miner_tx(
        &self,
        prev_hash: &BlockHash,
        miner_tx: &Transaction,
        height: u64,
        hard_fork_version: u8,
        base_reward: u64,
    ) -> bool {
        if hard_fork_version < HARDFORK_ACTIVATION {
            return true;
        }

        let total_reward = service_node_reward(height, base_reward, hard_fork_version);

        let winner = self.select_winner(prev_hash);
        if miner_tx.extra.winner() != winner {
            error!(
                expected = %winner,
                got = %miner_tx.extra.winner(),
                "miner tx names the wrong service node winner"
            );
            return false;
        }

        let (recipients, shares): (Vec<PublicAddress>, Vec<u64>) = match self.active.get(&winner) {
            Some(info) => (info.recipients.clone(), info.shares.clone()),
            None => (vec![PublicAddress::NULL], vec![TOTAL_SHARES]),
        };

        // The last output is reserved for governance; winner payouts sit
        // immediately before it.
        if miner_tx.outputs.len() < recipients.len() + 1 {
            error!(
                outputs = miner_tx.outputs.len(),
                recipients = recipients.len(),
                "miner tx has too few outputs for the service node payouts"
            );
            return false;
        }

        let (_gov_pub, gov_sec) = deterministic_keypair(height);

        for (i, (address, share)) in recipients.iter().zip(shares.iter()).enumerate() {
            let vout_index = miner_tx.outputs.len() - 1 - recipients.len() + i;
            let output = &miner_tx.outputs[vout_index];

            let reward = share_of_reward(*share, total_reward);
            if output.amount != reward {
                error!(
                    expected = reward,
                    got = output.amount,
                    vout_index,
                    "service node reward amount incorrect"
                );
                return false;
            }

            let TxOutTarget::ToKey { key } = output.target;
            let Some(expected) = expected_payout_key(address, &gov_sec, vout_index as u64) else {
                error!(vout_index, "failed to derive the expected payout key");
                return false;
            };
            if key != expected {
                error!(vout_index, "service node reward output pays the wrong key");
                return false;
            }
        }

        true
    }

    // ------------------------------------------------------------------
    // Block ingest
    // ------------------------------------------------------------------

    fn add_block(&mut self, block: &Block, txs: &[Transaction]) {
        let block_height = block.height();
        if self.store.hard_fork_version(block_height) < HARDFORK_ACTIVATION {
            return;
        }

        let journal_cutoff = block_height.saturating_sub(ROLLBACK_WINDOW);
        while let Some(front) = self.rollback.front() {
            if front.height() >= journal_cutoff {
                break;
            }
            self.rollback.pop_front();
        }

        // The node paid by this block rotates to the back of the queue.
        let winner = block.miner_tx.extra.winner();
        if let Some(info) = self.active.get_mut(&winner) {
            self.rollback.push_back(RollbackEvent::Change {
                height: block_height,
                key: winner,
                info: info.clone(),
            });
            info.first_height = 0;
            info.first_tx_index = -1;
        }

        for key in self.expired_nodes(block_height) {
            // A node may have left early (deregistered, or its key was
            // double-staked), so absence here is fine.
            if let Some(info) = self.active.remove(&key) {
                debug!(node = %key, height = block_height, "service node stake expired");
                self.rollback.push_back(RollbackEvent::Change {
                    height: block_height,
                    key,
                    info,
                });
            }
        }

        for (index, tx) in txs.iter().enumerate() {
            if let Some((key, info)) = self.registration_from_tx(tx, block_height, index as i32) {
                if self.active.contains_key(&key) {
                    debug!(
                        node = %key,
                        "stake re-used an existing service node key, funds are locked for no reward"
                    );
                } else {
                    self.rollback.push_back(RollbackEvent::New {
                        height: block_height,
                        key,
                    });
                    self.active.insert(key, info);
                }
            } else if let Some(key) = self.deregistration_target(tx) {
                if let Some(info) = self.active.remove(&key) {
                    info!(node = %key, height = block_height, "service node deregistered");
                    self.rollback.push_back(RollbackEvent::Change {
                        height: block_height,
                        key,
                        info,
                    });
                } else {
                    warn!(node = %key, "deregistration for a node that is no longer registered");
                }
            }
        }

        // Only quorums recent enough to back a deregistration are kept; a
        // historical replay never materializes long-dead quorums.
        let quorum_cutoff = self.store.current_height().saturating_sub(QUORUM_LIFETIME);
        if block_height >= quorum_cutoff {
            self.store_quorum_state(block_height);
            self.quorum_states = self.quorum_states.split_off(&quorum_cutoff);
        }
    }

    fn store_quorum_state(&mut self, height: u64) {
        let block_hash = match self.store.block_id_by_height(height) {
            Some(hash) if hash != NULL_HASH => hash,
            _ => {
                error!(height, "no canonical block hash for quorum derivation");
                return;
            }
        };

        let keys = self.service_node_pubkeys();
        self.quorum_states
            .insert(height, QuorumState::derive(&block_hash, &keys));
    }

    // ------------------------------------------------------------------
    // Transaction classification
    // ------------------------------------------------------------------

    /// Stateless registration check: unlock time, payload shape, share
    /// budget, and sufficient decoded stake. Membership of the key in the
    /// active set is the caller's concern (block ingest refuses duplicates;
    /// the expiry re-scan must not).
    fn registration_from_tx(
        &self,
        tx: &Transaction,
        block_height: u64,
        tx_index: i32,
    ) -> Option<(PublicKey, ServiceNodeInfo)> {
        if tx.unlock_time < block_height + STAKE_LOCK_BLOCKS
            || tx.unlock_time >= MAX_BLOCK_NUMBER
        {
            return None;
        }

        let registration = tx.extra.registration()?;
        let tx_pubkey = tx.extra.tx_pubkey()?;
        if tx_pubkey.is_null() || registration.service_node_key.is_null() {
            return None;
        }
        if registration.spend_keys.is_empty()
            || registration.spend_keys.len() != registration.view_keys.len()
            || registration.spend_keys.len() != registration.shares.len()
        {
            return None;
        }

        let mut total_shares: u64 = 0;
        for share in &registration.shares {
            total_shares = total_shares.checked_add(*share)?;
        }
        if total_shares > TOTAL_SHARES {
            return None;
        }

        if tx.outputs.len() < registration.spend_keys.len() {
            return None;
        }

        // Stake contributions are decoded with the fixed governance key so
        // that every node agrees on the amounts without holding any wallet
        // secrets.
        let (_gov_pub, gov_sec) = deterministic_keypair(1);
        let mut transferred: u64 = 0;
        for (i, view_key) in registration.view_keys.iter().enumerate() {
            transferred =
                transferred.saturating_add(self.staking_contribution(tx, i, view_key, &gov_sec));
        }
        if transferred < self.store.staking_requirement(block_height) {
            return None;
        }

        let recipients: Vec<PublicAddress> = registration
            .spend_keys
            .iter()
            .zip(registration.view_keys.iter())
            .map(|(spend, view)| PublicAddress::new(*spend, *view))
            .collect();

        Some((
            registration.service_node_key,
            ServiceNodeInfo {
                first_height: block_height,
                first_tx_index: tx_index,
                recipients,
                shares: registration.shares.clone(),
            },
        ))
    }

    /// Decoded stake carried by output `index` for a recipient view key.
    /// Anything that fails to decode contributes nothing.
    fn staking_contribution(
        &self,
        tx: &Transaction,
        index: usize,
        view_key: &PublicKey,
        gov_sec: &SecretKey,
    ) -> u64 {
        let Some(derivation) = generate_key_derivation(view_key, gov_sec) else {
            error!(output = index, "invalid view key in registration");
            return 0;
        };
        let shared_scalar = derivation_to_scalar(&derivation, index as u64);
        match decode_amount(&tx.rct, &shared_scalar, index) {
            Ok(amount) => amount,
            Err(err) => {
                error!(output = index, error = %err, "failed to decode staking output");
                0
            }
        }
    }

    /// Resolve a deregistration to its target node key via the cached quorum
    /// it references.
    fn deregistration_target(&self, tx: &Transaction) -> Option<PublicKey> {
        if tx.version != TxVersion::V3Deregister {
            return None;
        }

        let Some(deregistration) = tx.extra.deregistration() else {
            error!("deregister tx carries no payload, possibly corrupt chain data");
            return None;
        };

        let Some(state) = self.quorum_states.get(&deregistration.block_height) else {
            error!(
                height = deregistration.block_height,
                "no quorum cached for the deregistration height"
            );
            return None;
        };

        let Some(key) = state
            .nodes_to_test
            .get(deregistration.node_index as usize)
        else {
            error!(
                index = deregistration.node_index,
                tested = state.nodes_to_test.len(),
                "deregistration index is outside the tested set"
            );
            return None;
        };

        Some(*key)
    }

    // ------------------------------------------------------------------
    // Expiry
    // ------------------------------------------------------------------

    /// Keys whose stakes expire at `block_height`: rescan the block that is
    /// one full lock-plus-relock window behind and re-run the registration
    /// check against it. Idempotent, and avoids carrying an expiry index.
    fn expired_nodes(&self, block_height: u64) -> Vec<PublicKey> {
        let Some(expired_height) = block_height.checked_sub(STAKE_LOCK_BLOCKS + RELOCK_WINDOW)
        else {
            return Vec::new();
        };

        let blocks = match self.store.get_blocks(expired_height, 1) {
            Ok(blocks) if !blocks.is_empty() => blocks,
            Ok(_) => {
                error!(height = expired_height, "no historical block for expiry scan");
                return Vec::new();
            }
            Err(err) => {
                error!(height = expired_height, error = %err, "unable to fetch historical block");
                return Vec::new();
            }
        };

        let block = &blocks[0].1;
        let (txs, missed) = self.store.get_transactions(&block.tx_hashes);
        if !missed.is_empty() {
            error!(
                height = expired_height,
                missing = missed.len(),
                "unable to fetch transactions for expiry scan"
            );
            return Vec::new();
        }

        txs.iter()
            .enumerate()
            .filter_map(|(index, tx)| {
                self.registration_from_tx(tx, expired_height, index as i32)
                    .map(|(key, _)| key)
            })
            .collect()
    }
}

/// The one-time key a service-node payout output must pay at `vout_index`.
fn expected_payout_key(
    address: &PublicAddress,
    gov_sec: &SecretKey,
    vout_index: u64,
) -> Option<PublicKey> {
    let derivation = generate_key_derivation(&address.view, gov_sec)?;
    derive_public_key(&derivation, vout_index, &address.spend)
}
