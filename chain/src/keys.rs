// Copyright (c) 2024 The Palisade Project

//! Ristretto key material and the key-derivation operations used for stealth
//! outputs.
//!
//! Reward outputs and stake contributions are addressed with the usual
//! two-key scheme: a recipient publishes a (spend, view) address, the sender
//! computes an ECDH shared point against the view key, and per-output scalars
//! are derived from that shared point. The governance side uses a
//! deterministic keypair derived from a block height so that every node can
//! recompute the same derivation without any secret distribution.

use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Domain tag for per-output scalar derivation.
const DERIVATION_DOMAIN: &[u8] = b"psd.keys.derivation_to_scalar";

/// Domain tag for the deterministic governance keypair.
const GOVERNANCE_DOMAIN: &[u8] = b"psd.keys.governance_keypair";

/// A compressed Ristretto public key.
///
/// Ordering and equality are over the raw compressed bytes, which is the
/// canonical ordering used wherever key order is consensus-observable.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct PublicKey(pub [u8; 32]);

impl PublicKey {
    /// The all-zero key, used as an explicit "no node" sentinel.
    pub const NULL: PublicKey = PublicKey([0u8; 32]);

    /// Whether this is the null sentinel.
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Decompress to a curve point, if the encoding is valid.
    pub fn decompress(&self) -> Option<RistrettoPoint> {
        CompressedRistretto(self.0).decompress()
    }

    fn from_point(point: &RistrettoPoint) -> Self {
        PublicKey(point.compress().to_bytes())
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({})", hex::encode(&self.0[0..8]))
    }
}

impl std::fmt::Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// A Ristretto secret scalar. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey(pub(crate) Scalar);

impl SecretKey {
    pub fn from_scalar(scalar: Scalar) -> Self {
        SecretKey(scalar)
    }

    pub fn as_scalar(&self) -> &Scalar {
        &self.0
    }

    /// The public key for this secret.
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_point(&(RISTRETTO_BASEPOINT_POINT * self.0))
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print secret material
        write!(f, "SecretKey(..)")
    }
}

/// An ECDH shared point between a public key and a secret key.
#[derive(Clone)]
pub struct KeyDerivation(RistrettoPoint);

impl KeyDerivation {
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.compress().to_bytes()
    }
}

/// Compute the ECDH shared point `sec * pub`.
///
/// Returns `None` when `public` is not a valid compressed point; callers
/// treat that as a decode failure for the output in question.
pub fn generate_key_derivation(public: &PublicKey, secret: &SecretKey) -> Option<KeyDerivation> {
    let point = public.decompress()?;
    Some(KeyDerivation(point * secret.0))
}

/// Hash a derivation and an output index to a scalar.
pub fn derivation_to_scalar(derivation: &KeyDerivation, output_index: u64) -> Scalar {
    let mut hasher = Sha512::new();
    hasher.update(DERIVATION_DOMAIN);
    hasher.update(derivation.to_bytes());
    hasher.update(output_index.to_le_bytes());
    Scalar::from_hash(hasher)
}

/// Derive the one-time output public key `Hs(derivation ‖ i) * G + spend`.
///
/// Returns `None` when the spend key fails to decompress.
pub fn derive_public_key(
    derivation: &KeyDerivation,
    output_index: u64,
    spend_public: &PublicKey,
) -> Option<PublicKey> {
    let spend_point = spend_public.decompress()?;
    let scalar = derivation_to_scalar(derivation, output_index);
    Some(PublicKey::from_point(
        &(RISTRETTO_BASEPOINT_POINT * scalar + spend_point),
    ))
}

/// The deterministic governance keypair for a block height.
///
/// Every node derives the same keypair for the same height, so governance and
/// service-node reward outputs can be recomputed and checked by consensus.
pub fn deterministic_keypair(height: u64) -> (PublicKey, SecretKey) {
    let mut hasher = Sha512::new();
    hasher.update(GOVERNANCE_DOMAIN);
    hasher.update(height.to_le_bytes());
    let secret = SecretKey(Scalar::from_hash(hasher));
    (secret.public_key(), secret)
}
