// Copyright (c) 2024 The Palisade Project

//! Palisade chain substrate.
//!
//! Key material, confidential-output encoding, transaction and block types,
//! reward arithmetic, and the read-only [`store::ChainStore`] interface that
//! higher layers (the service-node registry, the RPC surface) consume.

#![deny(clippy::print_stdout)]

pub mod address;
pub mod block;
pub mod extra;
pub mod keys;
pub mod reward;
pub mod ringct;
pub mod store;
pub mod transaction;

pub use address::PublicAddress;
pub use block::{Block, BlockHash, BlockHeader};
pub use keys::{KeyDerivation, PublicKey, SecretKey};
pub use store::{ChainStore, ChainStoreError};
pub use transaction::{Transaction, TxHash, TxOutTarget, TxOutput, TxVersion};
