//! # Identity Module
//!
//! Who is who in Veil. Accounts and contracts share one address space, and
//! every address is derived from public data so that anyone can check a
//! claimed address against the instance it supposedly came from.
//!
//! The identity stack is layered:
//!
//! 1. **AccountSecret** — 32 random bytes. Holding it means being able to
//!    read the account's private state.
//! 2. **PublicKeys** — the viewing key derived from the secret. Notes for
//!    the account are sealed to it.
//! 3. **ContractInstance** — code, deployer, salt, constructor arguments.
//!    Hashes down to a partial address.
//! 4. **Address** — Poseidon commitment to (public keys, partial address).
//!
//! An escrow is both a contract and an account: it is deployed with its own
//! public keys, and the deployer keeps the matching secret.

pub mod address;
pub mod instance;

use thiserror::Error;

pub use address::{compute_address, AccountKeys, AccountSecret, Address, PublicKeys};
pub use instance::{class_id, initialization_hash, validate_contract_address, ContractInstance};

/// Errors from parsing or validating identities.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid address length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },

    /// Bytes decode to an integer at or above the field modulus.
    #[error("address is not a canonical field element")]
    NonCanonical,
}
