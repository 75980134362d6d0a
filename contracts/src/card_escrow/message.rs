//! # Escrow Authorization Messages
//!
//! The owner authorizes escrow actions off-chain by signing a digest:
//!
//! ```text
//! digest    = Poseidon(escrow_address, amount, nonce, action_tag)
//! signature = Schnorr_sign(owner_key, digest_bytes)        (64 bytes)
//! ```
//!
//! with `action_tag = 1` for a spend-limit change and `2` for a withdrawal.
//! The contract recomputes the digest with its *own* current nonce, so a
//! signature is good for exactly one action at exactly one point in the
//! escrow's history.
//!
//! [`authorization_digest`] is used by both the signer and the verifier.
//! Any divergence between the two sides would make every signature fail,
//! so there is only one copy of it.

use ark_bn254::Fr;
use serde::{Deserialize, Serialize};
use std::fmt;

use veil_protocol::config::{ACTION_TAG_SPEND_LIMIT, ACTION_TAG_WITHDRAW, FIELD_ELEMENT_LENGTH};
use veil_protocol::crypto::hash::{field_to_bytes, poseidon_hash};
use veil_protocol::crypto::schnorr::{SchnorrPublicKey, SchnorrSecretKey, SchnorrSignature};
use veil_protocol::identity::Address;
use veil_protocol::Amount;

/// Which escrow operation a signature authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EscrowAction {
    SpendLimit,
    Withdraw,
}

impl EscrowAction {
    pub fn tag(&self) -> u64 {
        match self {
            EscrowAction::SpendLimit => ACTION_TAG_SPEND_LIMIT,
            EscrowAction::Withdraw => ACTION_TAG_WITHDRAW,
        }
    }
}

impl fmt::Display for EscrowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EscrowAction::SpendLimit => write!(f, "spend_limit"),
            EscrowAction::Withdraw => write!(f, "withdraw"),
        }
    }
}

/// The Poseidon digest an owner signs for one escrow action.
pub fn authorization_digest(
    escrow: &Address,
    amount: Amount,
    nonce: u64,
    action: EscrowAction,
) -> [u8; FIELD_ELEMENT_LENGTH] {
    let preimage = [
        escrow.to_field(),
        Fr::from(amount),
        Fr::from(nonce),
        Fr::from(action.tag()),
    ];
    field_to_bytes(&poseidon_hash(&preimage))
}

/// A digest and the owner's signature over it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedEscrowMessage {
    pub digest: [u8; FIELD_ELEMENT_LENGTH],
    pub signature: SchnorrSignature,
}

impl SignedEscrowMessage {
    /// The 64 signature bytes, as submitted to the escrow.
    pub fn signature_bytes(&self) -> [u8; 64] {
        self.signature.to_bytes()
    }
}

/// Build and sign the authorization for `action` at `nonce`.
///
/// `nonce` must be the escrow's current nonce at the time the message is
/// submitted, usually read with `get_nonce` just before signing.
pub fn build_signed_escrow_message(
    escrow: &Address,
    amount: Amount,
    nonce: u64,
    action: EscrowAction,
    owner_key: &SchnorrSecretKey,
) -> SignedEscrowMessage {
    let digest = authorization_digest(escrow, amount, nonce, action);
    SignedEscrowMessage {
        digest,
        signature: owner_key.sign(&digest),
    }
}

/// Check `signature` against the digest for `(escrow, amount, nonce, action)`.
///
/// Signatures of the wrong length are simply invalid.
pub fn verify_escrow_signature(
    escrow: &Address,
    amount: Amount,
    nonce: u64,
    action: EscrowAction,
    owner_public_key: &SchnorrPublicKey,
    signature: &[u8],
) -> bool {
    let digest = authorization_digest(escrow, amount, nonce, action);
    owner_public_key.verify_bytes(&digest, signature)
}
