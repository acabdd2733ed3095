// Copyright (c) 2024 The Palisade Project

//! Service-node registry.
//!
//! A deterministic reducer over chain events: every added block is scanned
//! for stake registrations and deregistrations, the active set of service
//! nodes is updated in place, a testing quorum is derived for the block, and
//! an inverse journal entry is recorded so that a chain reorganization can be
//! unwound exactly. The registry also recomputes the expected service-node
//! payouts for a coinbase transaction and validates proposed blocks against
//! them.
//!
//! Determinism is the whole game: every node must hold byte-identical
//! registry state for the same chain, so iteration orders, shuffle
//! algorithms, and arithmetic here are all pinned.
//!
//! The registry owns no chain data. It borrows a read-only
//! [`psd_chain::ChainStore`] for its lifetime and is driven by the store's
//! event hooks (`init`, `block_added`, `blockchain_detached`,
//! `validate_miner_tx`). Single-writer discipline is the caller's job: wrap
//! the registry in a lock and never run mutators concurrently.

#![deny(clippy::print_stdout)]

pub mod constants;
pub mod quorum;
pub mod registry;
pub mod rollback;

pub use quorum::QuorumState;
pub use registry::{ServiceNodeInfo, ServiceNodeList};
pub use rollback::RollbackEvent;
