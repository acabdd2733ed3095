// Copyright (c) 2024 The Palisade Project

//! Typed transaction-extra fields.
//!
//! The extra section is an ordered list of tagged fields. Accessors return
//! the first field of the requested kind; a missing or malformed field is
//! simply `None`, and callers decide how loudly to complain.

use serde::{Deserialize, Serialize};

use crate::keys::PublicKey;

/// Service-node registration payload.
///
/// `spend_keys`, `view_keys` and `shares` are parallel lists describing the
/// stake beneficiaries. The payload is currently accepted without a
/// signature from `service_node_key`; verification, when added, belongs at
/// this extraction boundary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationData {
    pub spend_keys: Vec<PublicKey>,
    pub view_keys: Vec<PublicKey>,
    pub shares: Vec<u64>,
    pub service_node_key: PublicKey,
}

/// Service-node deregistration payload: which member of the test set at
/// `block_height` is being voted off.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeregistrationData {
    pub block_height: u64,
    pub node_index: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtraField {
    /// The transaction's ephemeral public key.
    TxPublicKey(PublicKey),
    /// Service-node registration.
    Registration(RegistrationData),
    /// Service-node deregistration.
    Deregistration(DeregistrationData),
    /// The service node paid by this miner transaction.
    ServiceNodeWinner(PublicKey),
}

/// The ordered extra section of a transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxExtra {
    fields: Vec<ExtraField>,
}

impl TxExtra {
    pub fn new(fields: Vec<ExtraField>) -> Self {
        Self { fields }
    }

    pub fn push(&mut self, field: ExtraField) {
        self.fields.push(field);
    }

    pub fn tx_pubkey(&self) -> Option<PublicKey> {
        self.fields.iter().find_map(|f| match f {
            ExtraField::TxPublicKey(key) => Some(*key),
            _ => None,
        })
    }

    pub fn registration(&self) -> Option<&RegistrationData> {
        self.fields.iter().find_map(|f| match f {
            ExtraField::Registration(data) => Some(data),
            _ => None,
        })
    }

    pub fn deregistration(&self) -> Option<&DeregistrationData> {
        self.fields.iter().find_map(|f| match f {
            ExtraField::Deregistration(data) => Some(data),
            _ => None,
        })
    }

    /// The winner key from a miner transaction, or the null key when absent.
    ///
    /// An absent winner field means "no service node was paid", which the
    /// consensus rules treat the same as an explicit null key.
    pub fn winner(&self) -> PublicKey {
        self.fields
            .iter()
            .find_map(|f| match f {
                ExtraField::ServiceNodeWinner(key) => Some(*key),
                _ => None,
            })
            .unwrap_or(PublicKey::NULL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_field_wins() {
        let mut extra = TxExtra::default();
        extra.push(ExtraField::TxPublicKey(PublicKey([1; 32])));
        extra.push(ExtraField::TxPublicKey(PublicKey([2; 32])));
        assert_eq!(extra.tx_pubkey(), Some(PublicKey([1; 32])));
    }

    #[test]
    fn test_missing_fields_are_none() {
        let extra = TxExtra::default();
        assert_eq!(extra.tx_pubkey(), None);
        assert!(extra.registration().is_none());
        assert!(extra.deregistration().is_none());
        assert_eq!(extra.winner(), PublicKey::NULL);
    }
}
