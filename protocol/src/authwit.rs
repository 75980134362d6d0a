//! # Delegated Transfer Authorizations
//!
//! An authorization witness ("authwit") lets one account allow another to
//! move its private tokens exactly once. The escrow relies on this for
//! deposits: the depositor pre-authorizes
//! `token.transfer_private_to_private(depositor, escrow, amount, nonce)` with
//! the escrow as caller, then calls `escrow.deposit(...)`.
//!
//! ```text
//! message_hash = Poseidon(SEP_AUTHWIT_MESSAGE,
//!                         chain_id, consumer, caller, from, to, amount, nonce)
//! witness      = Ed25519_sign(from_account_key, message_hash_bytes)
//! nullifier    = Poseidon(SEP_AUTHWIT_NULLIFIER, from, message_hash)
//! ```
//!
//! Consuming a witness publishes its nullifier. A nullifier can appear on
//! the ledger once, so a second redemption of the same authorization fails
//! even if the witness is still floating around.

use ark_bn254::Fr;
use ark_ff::UniformRand;
use rand::rngs::OsRng;
use thiserror::Error;

use crate::config::{FIELD_ELEMENT_LENGTH, SEPARATOR_AUTHWIT_MESSAGE, SEPARATOR_AUTHWIT_NULLIFIER};
use crate::crypto::hash::{field_to_bytes, poseidon_hash_with_separator};
use crate::crypto::keys::{AccountKeypair, AccountPublicKey, AccountSignature};
use crate::identity::Address;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthwitError {
    /// No supplied witness matches the requested action, or its signature
    /// does not verify against `from`'s account key.
    #[error("no valid authorization from {from} for this action")]
    Invalid { from: Address },

    /// The authorization's nullifier is already on the ledger.
    #[error("authorization from {from} has already been consumed")]
    Consumed { from: Address },
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The action being authorized. Every field is bound into the hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferAuthorization {
    /// Contract that will consume the witness (the token).
    pub consumer: Address,
    /// Who is allowed to trigger the transfer (the escrow, for deposits).
    pub caller: Address,
    pub from: Address,
    pub to: Address,
    pub amount: u128,
    /// Caller-chosen value that makes otherwise identical authorizations
    /// distinct.
    pub nonce: Fr,
}

/// A signed authorization, handed to whoever will submit the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthWitness {
    pub message_hash: [u8; FIELD_ELEMENT_LENGTH],
    pub signature: AccountSignature,
}

/// A fresh random authorization nonce.
pub fn random_nonce() -> Fr {
    Fr::rand(&mut OsRng)
}

impl TransferAuthorization {
    pub fn message_hash(&self, chain_id: u32) -> Fr {
        poseidon_hash_with_separator(
            &[
                Fr::from(chain_id as u64),
                self.consumer.to_field(),
                self.caller.to_field(),
                self.from.to_field(),
                self.to.to_field(),
                Fr::from(self.amount),
                self.nonce,
            ],
            SEPARATOR_AUTHWIT_MESSAGE,
        )
    }

    /// The value published when this authorization is consumed.
    pub fn nullifier(&self, chain_id: u32) -> Fr {
        poseidon_hash_with_separator(
            &[self.from.to_field(), self.message_hash(chain_id)],
            SEPARATOR_AUTHWIT_NULLIFIER,
        )
    }

    /// Sign with `from`'s account key.
    pub fn sign(&self, chain_id: u32, keypair: &AccountKeypair) -> AuthWitness {
        let message_hash = field_to_bytes(&self.message_hash(chain_id));
        AuthWitness {
            message_hash,
            signature: keypair.sign(&message_hash),
        }
    }

    /// Find the witness for this authorization among `witnesses` and check
    /// it was signed by `signer`.
    ///
    /// Does not check the nullifier set. That is the ledger's job, since
    /// it has to happen atomically with the transfer.
    pub fn verify<'a>(
        &self,
        chain_id: u32,
        signer: &AccountPublicKey,
        witnesses: &'a [AuthWitness],
    ) -> Result<&'a AuthWitness, AuthwitError> {
        let expected = field_to_bytes(&self.message_hash(chain_id));
        witnesses
            .iter()
            .find(|w| w.message_hash == expected && signer.verify(&w.message_hash, &w.signature))
            .ok_or(AuthwitError::Invalid { from: self.from })
    }
}
