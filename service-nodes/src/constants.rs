// Copyright (c) 2024 The Palisade Project

//! Consensus constants for the service-node registry.
//!
//! Every value here is consensus-critical: changing any of them forks the
//! chain.

/// Minimum number of blocks a stake must stay locked past its registration
/// height (30 days of 2-minute blocks). Registrations whose unlock time is
/// earlier than this are not valid.
pub const STAKE_LOCK_BLOCKS: u64 = 21_600;

/// Extra slack past the lock before a stake expires and the node leaves the
/// active set (1 day of blocks).
pub const RELOCK_WINDOW: u64 = 720;

/// How many blocks of inverse events the rollback journal retains. Reorgs
/// deeper than this force a full rebuild from the chain.
pub const ROLLBACK_WINDOW: u64 = 30;

/// How many blocks a derived quorum stays cached. Deregistrations referencing
/// older heights are rejected.
pub const QUORUM_LIFETIME: u64 = 60;

/// Maximum number of quorum members drawn per block.
pub const QUORUM_SIZE: usize = 10;

/// Floor on the number of nodes tested per block (when that many remain
/// outside the quorum).
pub const MIN_TEST: usize = 50;

/// Divisor for the tested fraction: one in this many of the remaining nodes
/// is tested per block.
pub const NTH_TO_TEST: usize = 100;

/// Hard-fork version at which the registry activates. Blocks under earlier
/// versions are ignored entirely.
pub const HARDFORK_ACTIVATION: u8 = 9;

/// Chunk size for the startup replay scan.
pub const REPLAY_CHUNK: u64 = 1000;
