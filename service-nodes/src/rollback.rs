// Copyright (c) 2024 The Palisade Project

//! Inverse-event journal for reorg handling.
//!
//! Every mutation of the active set appends the event that undoes it. On a
//! chain detach the journal is replayed backwards; events older than the
//! rollback window are pruned from the front as blocks arrive. The journal
//! holds inverse operations rather than snapshots, so memory stays bounded by
//! the mutation rate instead of the active-set size.

use std::collections::BTreeMap;

use tracing::error;

use psd_chain::PublicKey;

use crate::registry::ServiceNodeInfo;

/// The active set, keyed by service-node public key. An ordered map so that
/// every observable iteration is in sorted key order.
pub type ActiveSet = BTreeMap<PublicKey, ServiceNodeInfo>;

/// One reversible step, tagged with the height whose processing produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RollbackEvent {
    /// A node was added at `height`; the inverse removes it.
    New { height: u64, key: PublicKey },
    /// A node's info changed or the node was removed at `height`; the inverse
    /// restores the prior info.
    Change {
        height: u64,
        key: PublicKey,
        info: ServiceNodeInfo,
    },
    /// Sentinel planted by a full rebuild. Rolling back past it is not
    /// possible; hitting it forces another rebuild.
    Barrier { height: u64 },
}

impl RollbackEvent {
    /// The height whose processing produced this event.
    pub fn height(&self) -> u64 {
        match self {
            RollbackEvent::New { height, .. }
            | RollbackEvent::Change { height, .. }
            | RollbackEvent::Barrier { height } => *height,
        }
    }

    /// Apply the inverse operation to the active set. Returns `false` when
    /// the journal can no longer be trusted and the caller must rebuild.
    pub fn apply(self, active: &mut ActiveSet) -> bool {
        match self {
            RollbackEvent::New { key, .. } => {
                if active.remove(&key).is_none() {
                    error!(node = %key, "rollback expected the node to be registered");
                    return false;
                }
                true
            }
            RollbackEvent::Change { key, info, .. } => {
                active.insert(key, info);
                true
            }
            RollbackEvent::Barrier { height } => {
                error!(height, "cannot roll back past the rebuild barrier");
                false
            }
        }
    }
}
