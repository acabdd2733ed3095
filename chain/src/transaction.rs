// Copyright (c) 2024 The Palisade Project

//! Transaction types.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::extra::TxExtra;
use crate::keys::PublicKey;
use crate::ringct::RctSignatures;

/// Transaction hash.
pub type TxHash = [u8; 32];

/// Transaction format versions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TxVersion {
    /// Cleartext amounts.
    V1,
    /// Confidential amounts.
    #[default]
    V2RingCt,
    /// Reserved version carrying a service-node deregistration.
    V3Deregister,
}

/// Where an output pays to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxOutTarget {
    /// Pay to a one-time output key.
    ToKey { key: PublicKey },
}

/// One transaction output.
///
/// `amount` is the cleartext amount for miner-transaction outputs and zero
/// for confidential outputs, whose value lives in the rct section.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub amount: u64,
    pub target: TxOutTarget,
}

impl TxOutput {
    pub fn to_key(amount: u64, key: PublicKey) -> Self {
        Self {
            amount,
            target: TxOutTarget::ToKey { key },
        }
    }

    /// The one-time output key.
    pub fn key(&self) -> PublicKey {
        match self.target {
            TxOutTarget::ToKey { key } => key,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Transaction {
    pub version: TxVersion,
    /// Earliest height (or timestamp, above the block-number ceiling) at
    /// which the outputs may be spent.
    pub unlock_time: u64,
    pub outputs: Vec<TxOutput>,
    pub extra: TxExtra,
    pub rct: RctSignatures,
}

impl Transaction {
    /// Content hash over the serialized transaction.
    pub fn hash(&self) -> TxHash {
        let bytes = bincode::serialize(self).expect("transaction serialization is infallible");
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        hasher.finalize().into()
    }
}
