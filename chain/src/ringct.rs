// Copyright (c) 2024 The Palisade Project

//! Confidential output amounts.
//!
//! Each confidential output carries a Pedersen commitment `mask·G + amount·H`
//! and an ECDH-masked copy of the amount. Both the xor pad over the amount
//! and the commitment mask are derived from the per-output shared scalar, so
//! a party holding the right key derivation can recover the amount and check
//! it against the commitment without any further data.
//!
//! Signature aggregation differs between the simple and full variants but
//! the per-output amount encoding is shared; decoding dispatches on
//! [`RctType`] and refuses types it does not understand.

use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;
use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use thiserror::Error;

/// Domain tag for the xor pad over the cleartext amount.
const AMOUNT_DOMAIN: &[u8] = b"psd.ringct.amount";

/// Domain tag for the commitment mask scalar.
const MASK_DOMAIN: &[u8] = b"psd.ringct.mask";

/// Domain tag for the value generator `H`.
const GENERATOR_H_DOMAIN: &[u8] = b"psd.ringct.generator.H";

/// The confidential-signature layout attached to a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RctType {
    /// No confidential data (pre-RingCT or miner transactions).
    #[default]
    Null,
    /// Per-input commitments.
    Simple,
    /// Per-input commitments with bulletproof range proofs.
    SimpleBulletproof,
    /// Aggregate commitment.
    Full,
    /// Aggregate commitment with bulletproof range proofs.
    FullBulletproof,
}

/// Per-output ECDH-masked amount.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcdhInfo {
    pub masked_amount: u64,
}

/// Confidential data for a transaction: one masked amount and one commitment
/// per output, plus the layout tag.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RctSignatures {
    pub rct_type: RctType,
    pub ecdh_info: Vec<EcdhInfo>,
    /// Compressed Pedersen commitments, one per output.
    pub commitments: Vec<[u8; 32]>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RctError {
    /// Amount decoding is not defined for this layout
    #[error("amount decoding is not defined for rct type {0:?}")]
    UnsupportedType(RctType),

    /// The output index has no ECDH entry or commitment
    #[error("output index {0} out of range")]
    IndexOutOfRange(usize),

    /// The recovered amount does not open the stored commitment
    #[error("recovered amount does not open the commitment for output {0}")]
    CommitmentMismatch(usize),
}

/// The value generator `H`, independent of the basepoint.
fn generator_h() -> RistrettoPoint {
    RistrettoPoint::hash_from_bytes::<Sha512>(GENERATOR_H_DOMAIN)
}

/// Xor pad over the cleartext amount, derived from the shared scalar.
fn amount_pad(shared_scalar: &Scalar) -> u64 {
    let mut hasher = Sha512::new();
    hasher.update(AMOUNT_DOMAIN);
    hasher.update(shared_scalar.as_bytes());
    let digest = hasher.finalize();
    u64::from_le_bytes(digest[0..8].try_into().expect("digest is 64 bytes"))
}

/// Commitment mask scalar, derived from the shared scalar.
fn commitment_mask(shared_scalar: &Scalar) -> Scalar {
    let mut hasher = Sha512::new();
    hasher.update(MASK_DOMAIN);
    hasher.update(shared_scalar.as_bytes());
    Scalar::from_hash(hasher)
}

/// Pedersen commitment `mask·G + amount·H`.
fn commit(amount: u64, mask: &Scalar) -> [u8; 32] {
    let point = RISTRETTO_BASEPOINT_POINT * mask + generator_h() * Scalar::from(amount);
    point.compress().to_bytes()
}

/// Encode one output amount under the given per-output shared scalar.
///
/// Returns the masked amount and the commitment to store alongside it.
pub fn encode_amount(amount: u64, shared_scalar: &Scalar) -> (EcdhInfo, [u8; 32]) {
    let ecdh = EcdhInfo {
        masked_amount: amount ^ amount_pad(shared_scalar),
    };
    let commitment = commit(amount, &commitment_mask(shared_scalar));
    (ecdh, commitment)
}

/// Recover the amount of output `index` with the per-output shared scalar.
///
/// The recovered amount must open the stored commitment; anything else is a
/// decode failure.
pub fn decode_amount(
    rct: &RctSignatures,
    shared_scalar: &Scalar,
    index: usize,
) -> Result<u64, RctError> {
    match rct.rct_type {
        RctType::Simple | RctType::SimpleBulletproof | RctType::Full | RctType::FullBulletproof => {}
        other => return Err(RctError::UnsupportedType(other)),
    }

    let ecdh = rct
        .ecdh_info
        .get(index)
        .ok_or(RctError::IndexOutOfRange(index))?;
    let commitment = rct
        .commitments
        .get(index)
        .ok_or(RctError::IndexOutOfRange(index))?;

    let amount = ecdh.masked_amount ^ amount_pad(shared_scalar);
    if commit(amount, &commitment_mask(shared_scalar)) != *commitment {
        return Err(RctError::CommitmentMismatch(index));
    }
    Ok(amount)
}
