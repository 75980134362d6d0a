//! # PXE -- Private Execution Environment
//!
//! Each party runs its own PXE: a local keystore plus a registry of the
//! contracts it knows how to call. The PXE is where the confidentiality
//! boundary lives.
//!
//! | Registered                 | Can call | Can read private state |
//! |----------------------------|----------|------------------------|
//! | nothing                    | no       | no                     |
//! | contract instance          | yes      | no                     |
//! | instance + account secret  | yes      | yes                    |
//!
//! Both maps are `DashMap`s so a party can register keys on one thread
//! while another thread is mid-call.

use ark_bn254::Fr;
use dashmap::DashMap;
use thiserror::Error;
use tracing::{debug, info};

use crate::identity::{
    compute_address, validate_contract_address, AccountKeys, AccountSecret, Address,
    ContractInstance,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PrivacyError {
    /// The PXE holds no decryption material for this address, or the
    /// material it holds cannot open the notes.
    #[error("private state of {address} is not readable from this PXE")]
    ConfidentialityDenied { address: Address },

    #[error("contract {address} is not registered in this PXE")]
    UnknownContract { address: Address },

    #[error("instance derives {derived}, not the claimed address {claimed}")]
    AddressMismatch { claimed: Address, derived: Address },
}

/// One party's private execution environment.
#[derive(Debug)]
pub struct Pxe {
    label: String,
    accounts: DashMap<Address, AccountKeys>,
    contracts: DashMap<Address, ContractInstance>,
}

impl Pxe {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            accounts: DashMap::new(),
            contracts: DashMap::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Bind decryption material to the address it derives.
    ///
    /// Returns that address. Callers compare it against the address they
    /// expect; a wrong secret or partial address yields a different one.
    pub fn register_account(&self, secret: &AccountSecret, partial_address: Fr) -> Address {
        let keys = secret.derive_keys();
        let address = compute_address(&keys.public_keys(), partial_address);
        self.accounts.insert(address, keys);
        info!(pxe = %self.label, %address, "account registered");
        address
    }

    /// Make a contract callable from this PXE after checking the instance
    /// really derives `claimed`.
    pub fn register_contract(
        &self,
        claimed: Address,
        instance: ContractInstance,
    ) -> Result<(), PrivacyError> {
        if !validate_contract_address(&claimed, &instance) {
            return Err(PrivacyError::AddressMismatch {
                claimed,
                derived: instance.address(),
            });
        }
        debug!(pxe = %self.label, address = %claimed, artifact = %instance.artifact, "contract registered");
        self.contracts.insert(claimed, instance);
        Ok(())
    }

    pub fn keys_for(&self, address: &Address) -> Result<AccountKeys, PrivacyError> {
        self.accounts
            .get(address)
            .map(|entry| entry.value().clone())
            .ok_or(PrivacyError::ConfidentialityDenied { address: *address })
    }

    pub fn has_account(&self, address: &Address) -> bool {
        self.accounts.contains_key(address)
    }

    pub fn contract(&self, address: &Address) -> Result<ContractInstance, PrivacyError> {
        self.contracts
            .get(address)
            .map(|entry| entry.value().clone())
            .ok_or(PrivacyError::UnknownContract { address: *address })
    }

    /// Fails with [`PrivacyError::UnknownContract`] unless `address` is
    /// registered and runs `artifact`.
    pub fn ensure_contract(&self, address: &Address, artifact: &str) -> Result<(), PrivacyError> {
        match self.contracts.get(address) {
            Some(entry) if entry.artifact == artifact => Ok(()),
            _ => Err(PrivacyError::UnknownContract { address: *address }),
        }
    }
}
