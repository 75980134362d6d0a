//! # Contract Instances
//!
//! A [`ContractInstance`] is everything needed to recompute a contract's
//! address: which code it runs, who deployed it, with what salt and
//! constructor arguments, and under which public keys.
//!
//! ```text
//! salted_init     = Poseidon(SEP_SALTED_INIT, salt, initialization_hash, deployer)
//! partial_address = Poseidon(SEP_PARTIAL, class_id, salted_init)
//! address         = Poseidon(SEP_ADDRESS, public_keys_hash, partial_address)
//! ```
//!
//! Sharing an instance lets a party *call* the contract. It does not let
//! them read the contract's private state; that takes the account secret.

use ark_bn254::Fr;
use ark_ff::UniformRand;
use rand::rngs::OsRng;

use super::address::{compute_address, Address, PublicKeys};
use crate::config::{
    SEPARATOR_INITIALIZATION, SEPARATOR_PARTIAL_ADDRESS, SEPARATOR_SALTED_INITIALIZATION,
};
use crate::crypto::hash::{hash_to_field, poseidon_hash_with_separator};

/// Identifier of contract code, derived from the artifact name.
pub fn class_id(artifact: &str) -> Fr {
    hash_to_field(artifact.as_bytes())
}

/// Commitment to constructor arguments.
pub fn initialization_hash(constructor_args: &[Fr]) -> Fr {
    poseidon_hash_with_separator(constructor_args, SEPARATOR_INITIALIZATION)
}

/// A deployed (or about-to-be-deployed) contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractInstance {
    /// Human-readable artifact name, e.g. `"veil::card_escrow"`.
    pub artifact: String,
    pub class_id: Fr,
    pub salt: Fr,
    pub deployer: Address,
    pub initialization_hash: Fr,
    pub public_keys: PublicKeys,
}

impl ContractInstance {
    /// Build an instance with a random salt.
    pub fn new(
        artifact: &str,
        deployer: Address,
        constructor_args: &[Fr],
        public_keys: PublicKeys,
    ) -> Self {
        Self::with_salt(
            artifact,
            deployer,
            constructor_args,
            public_keys,
            Fr::rand(&mut OsRng),
        )
    }

    /// Build an instance with an explicit salt (deterministic addresses).
    pub fn with_salt(
        artifact: &str,
        deployer: Address,
        constructor_args: &[Fr],
        public_keys: PublicKeys,
        salt: Fr,
    ) -> Self {
        Self {
            artifact: artifact.to_string(),
            class_id: class_id(artifact),
            salt,
            deployer,
            initialization_hash: initialization_hash(constructor_args),
            public_keys,
        }
    }

    pub fn partial_address(&self) -> Fr {
        let salted = poseidon_hash_with_separator(
            &[self.salt, self.initialization_hash, self.deployer.to_field()],
            SEPARATOR_SALTED_INITIALIZATION,
        );
        poseidon_hash_with_separator(&[self.class_id, salted], SEPARATOR_PARTIAL_ADDRESS)
    }

    pub fn address(&self) -> Address {
        compute_address(&self.public_keys, self.partial_address())
    }
}

/// Check that `claimed` is the address `instance` actually derives to.
///
/// Run this before trusting an instance received from another party.
pub fn validate_contract_address(claimed: &Address, instance: &ContractInstance) -> bool {
    instance.address() == *claimed
}
