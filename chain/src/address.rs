// Copyright (c) 2024 The Palisade Project

//! Public stake-recipient addresses.

use serde::{Deserialize, Serialize};

use crate::keys::PublicKey;

/// A two-key public address: the spend key receives funds, the view key lets
/// the owner (or a governance derivation) detect and decode outputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PublicAddress {
    pub spend: PublicKey,
    pub view: PublicKey,
}

impl PublicAddress {
    /// The designated null address, paid when no service node is eligible.
    pub const NULL: PublicAddress = PublicAddress {
        spend: PublicKey::NULL,
        view: PublicKey::NULL,
    };

    pub fn new(spend: PublicKey, view: PublicKey) -> Self {
        Self { spend, view }
    }

    pub fn is_null(&self) -> bool {
        self.spend.is_null() && self.view.is_null()
    }
}
