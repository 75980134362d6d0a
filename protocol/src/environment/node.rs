//! # Node -- Shared Ledger State
//!
//! The node holds everything every party can see: deployed contract
//! instances, published public keys, account signing keys, public storage,
//! encrypted notes, and the nullifier set. Private values only ever appear
//! here as [`SealedNote`]s.
//!
//! ## Transactions
//!
//! All mutations go through [`Node::transact`]:
//!
//! 1. Lock the world state (transactions are totally ordered).
//! 2. Clone it and hand the copy to the closure.
//! 3. On `Ok`, swap the copy in, bump the block number, and emit a receipt.
//! 4. On `Err`, drop the copy. Nothing the closure did is visible.
//!
//! Two transactions that read the same nonce therefore cannot both commit,
//! and a nullifier pushed by a failed transaction never lands.
//!
//! ## Who may write what
//!
//! Reads are open. Writes to a contract's notes, public storage and
//! nullifiers go through a [`ContractScope`], and only the code deployed at
//! that address can open one. "Code" is a Rust type implementing
//! [`ContractCode`]: the first deployment of an artifact binds the artifact
//! to its type, and every later scope on an instance of that artifact must
//! name the same type. Contract modules keep that type private, so no other
//! crate or module can execute as the contract.

use ark_bn254::Fr;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::any::TypeId;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, info};

use super::notes::NoteKey;
use super::wallet::ACCOUNT_ARTIFACT;
use super::CallContext;
use crate::config::{NodeConfig, FIELD_ELEMENT_LENGTH};
use crate::crypto::hash::{blake3_hash_multi, field_to_bytes};
use crate::crypto::keys::AccountPublicKey;
use crate::crypto::note_encryption::SealedNote;
use crate::identity::{Address, ContractInstance, PublicKeys};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NodeError {
    #[error("contract already deployed at {address}")]
    AlreadyDeployed { address: Address },

    #[error("no contract deployed at {address}")]
    UnknownContract { address: Address },

    #[error("no public keys published for {address}")]
    UnknownPublicKeys { address: Address },

    #[error("no account signing key registered for {address}")]
    UnknownAccount { address: Address },

    #[error("nullifier {nullifier} already exists")]
    DuplicateNullifier { nullifier: String },

    /// Another type already deployed this artifact.
    #[error("artifact {artifact} is bound to different code")]
    ArtifactClaimed { artifact: String },

    #[error("instance runs {found}, expected {expected}")]
    ArtifactMismatch { expected: String, found: String },

    /// The caller is not the code deployed at `contract`.
    #[error("code mismatch: caller cannot execute as {contract}")]
    CodeMismatch { contract: Address },

    #[error("{executing} cannot write state belonging to {target}")]
    ForeignState { executing: Address, target: Address },
}

// ---------------------------------------------------------------------------
// Contract code
// ---------------------------------------------------------------------------

/// The code a deployed contract runs.
///
/// Implement it on a type private to the contract's module. Only that type
/// can open a [`ContractScope`] on the contract's instances.
pub trait ContractCode: 'static {
    /// Artifact name recorded in every [`ContractInstance`] of this code.
    const ARTIFACT: &'static str;
}

/// Accounts own no state. Binding their artifact here keeps anyone else from
/// claiming it.
struct AccountCode;

impl ContractCode for AccountCode {
    const ARTIFACT: &'static str = ACCOUNT_ARTIFACT;
}

// ---------------------------------------------------------------------------
// WorldState
// ---------------------------------------------------------------------------

/// The ledger as seen inside a transaction.
///
/// Everything is readable. Contract state is written through
/// [`WorldState::deploy`] and [`WorldState::scope`].
#[derive(Clone, Debug)]
pub struct WorldState {
    classes: HashMap<String, TypeId>,
    contracts: HashMap<Address, ContractInstance>,
    public_keys: HashMap<Address, PublicKeys>,
    account_signers: HashMap<Address, AccountPublicKey>,
    public_storage: HashMap<(Address, String), Vec<u8>>,
    notes: HashMap<NoteKey, Vec<SealedNote>>,
    nullifiers: HashSet<(Address, [u8; FIELD_ELEMENT_LENGTH])>,
}

impl WorldState {
    fn genesis() -> Self {
        let mut classes = HashMap::new();
        classes.insert(AccountCode::ARTIFACT.to_string(), TypeId::of::<AccountCode>());
        Self {
            classes,
            contracts: HashMap::new(),
            public_keys: HashMap::new(),
            account_signers: HashMap::new(),
            public_storage: HashMap::new(),
            notes: HashMap::new(),
            nullifiers: HashSet::new(),
        }
    }

    fn bind_class<C: ContractCode>(&mut self) -> Result<(), NodeError> {
        let code = TypeId::of::<C>();
        match self.classes.entry(C::ARTIFACT.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(code);
                Ok(())
            }
            Entry::Occupied(bound) if *bound.get() == code => Ok(()),
            Entry::Occupied(_) => Err(NodeError::ArtifactClaimed {
                artifact: C::ARTIFACT.to_string(),
            }),
        }
    }

    fn publish(&mut self, instance: ContractInstance) -> Result<Address, NodeError> {
        let address = instance.address();
        if self.contracts.contains_key(&address) {
            return Err(NodeError::AlreadyDeployed { address });
        }
        self.public_keys.insert(address, instance.public_keys);
        self.contracts.insert(address, instance);
        Ok(address)
    }

    fn publish_account(
        &mut self,
        instance: ContractInstance,
        signer: AccountPublicKey,
    ) -> Result<Address, NodeError> {
        if instance.artifact != AccountCode::ARTIFACT {
            return Err(NodeError::ArtifactMismatch {
                expected: AccountCode::ARTIFACT.to_string(),
                found: instance.artifact,
            });
        }
        let address = self.publish(instance)?;
        self.account_signers.insert(address, signer);
        Ok(address)
    }

    /// Publish `instance` as code `C` and open its scope so the constructor
    /// can write initial state.
    pub fn deploy<C: ContractCode>(
        &mut self,
        instance: ContractInstance,
    ) -> Result<ContractScope<'_>, NodeError> {
        if instance.artifact != C::ARTIFACT {
            return Err(NodeError::ArtifactMismatch {
                expected: C::ARTIFACT.to_string(),
                found: instance.artifact,
            });
        }
        self.bind_class::<C>()?;
        let contract = self.publish(instance)?;
        Ok(ContractScope {
            contract,
            state: self,
        })
    }

    /// Execute as `contract`. Fails unless `C` is the code deployed there.
    pub fn scope<C: ContractCode>(
        &mut self,
        contract: Address,
    ) -> Result<ContractScope<'_>, NodeError> {
        let artifact = &self.contract(&contract)?.artifact;
        if self.classes.get(artifact) != Some(&TypeId::of::<C>()) {
            return Err(NodeError::CodeMismatch { contract });
        }
        Ok(ContractScope {
            contract,
            state: self,
        })
    }

    pub fn contract(&self, address: &Address) -> Result<&ContractInstance, NodeError> {
        self.contracts
            .get(address)
            .ok_or(NodeError::UnknownContract { address: *address })
    }

    pub fn is_deployed(&self, address: &Address) -> bool {
        self.contracts.contains_key(address)
    }

    pub fn public_keys(&self, address: &Address) -> Result<PublicKeys, NodeError> {
        self.public_keys
            .get(address)
            .copied()
            .ok_or(NodeError::UnknownPublicKeys { address: *address })
    }

    pub fn account_signer(&self, address: &Address) -> Result<AccountPublicKey, NodeError> {
        self.account_signers
            .get(address)
            .copied()
            .ok_or(NodeError::UnknownAccount { address: *address })
    }

    pub fn public_storage(&self, contract: &Address, key: &str) -> Option<&[u8]> {
        self.public_storage
            .get(&(*contract, key.to_string()))
            .map(Vec::as_slice)
    }

    pub fn notes(&self, key: &NoteKey) -> &[SealedNote] {
        self.notes.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `contract` has emitted `nullifier`. Nullifiers are siloed per
    /// contract.
    pub fn has_nullifier(&self, contract: &Address, nullifier: &Fr) -> bool {
        self.nullifiers
            .contains(&(*contract, field_to_bytes(nullifier)))
    }

    pub fn nullifier_count(&self) -> usize {
        self.nullifiers.len()
    }
}

// ---------------------------------------------------------------------------
// ContractScope
// ---------------------------------------------------------------------------

/// Write access to one contract's state inside a transaction.
pub struct ContractScope<'s> {
    contract: Address,
    state: &'s mut WorldState,
}

impl ContractScope<'_> {
    /// The contract this scope executes as.
    pub fn contract(&self) -> Address {
        self.contract
    }

    pub fn state(&self) -> &WorldState {
        &*self.state
    }

    fn owns(&self, key: &NoteKey) -> Result<(), NodeError> {
        if key.contract != self.contract {
            return Err(NodeError::ForeignState {
                executing: self.contract,
                target: key.contract,
            });
        }
        Ok(())
    }

    pub fn push_note(&mut self, key: NoteKey, note: SealedNote) -> Result<(), NodeError> {
        self.owns(&key)?;
        self.state.notes.entry(key).or_default().push(note);
        Ok(())
    }

    /// Drop every note at `key` and return them.
    pub fn take_notes(&mut self, key: &NoteKey) -> Result<Vec<SealedNote>, NodeError> {
        self.owns(key)?;
        Ok(self.state.notes.remove(key).unwrap_or_default())
    }

    /// Replace the notes at `key` with a single note.
    pub fn replace_note(&mut self, key: NoteKey, note: SealedNote) -> Result<(), NodeError> {
        self.owns(&key)?;
        self.state.notes.insert(key, vec![note]);
        Ok(())
    }

    pub fn set_public_storage(&mut self, key: &str, value: Vec<u8>) {
        self.state
            .public_storage
            .insert((self.contract, key.to_string()), value);
    }

    pub fn push_nullifier(&mut self, nullifier: Fr) -> Result<(), NodeError> {
        let bytes = field_to_bytes(&nullifier);
        if !self.state.nullifiers.insert((self.contract, bytes)) {
            return Err(NodeError::DuplicateNullifier {
                nullifier: hex::encode(bytes),
            });
        }
        Ok(())
    }

    /// Context for calls this contract makes into other contracts: the same
    /// node and PXE, with this contract as `msg_sender`.
    pub fn call_context<'a>(&self, outer: &CallContext<'a>) -> CallContext<'a> {
        CallContext::new(outer.node(), outer.pxe(), self.contract)
    }
}

// ---------------------------------------------------------------------------
// Receipts
// ---------------------------------------------------------------------------

/// Proof that a transaction committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    /// BLAKE3 over (chain id, block number, label).
    pub tx_hash: String,
    pub block_number: u64,
    pub label: String,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

struct Inner {
    state: WorldState,
    next_block: u64,
}

/// An in-process ledger.
pub struct Node {
    config: NodeConfig,
    inner: Mutex<Inner>,
}

impl Node {
    pub fn new(config: NodeConfig) -> Self {
        info!(
            chain_id = config.chain_id,
            version = %config.protocol_version,
            "node started"
        );
        let next_block = config.genesis_block;
        Self {
            config,
            inner: Mutex::new(Inner {
                state: WorldState::genesis(),
                next_block,
            }),
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn chain_id(&self) -> u32 {
        self.config.chain_id
    }

    /// Run `f` as one atomic transaction.
    ///
    /// The lock is held for the whole closure, so `f` must not call back
    /// into this node.
    pub fn transact<T, E, F>(&self, label: &str, f: F) -> Result<(T, TxReceipt), E>
    where
        F: FnOnce(&mut WorldState) -> Result<T, E>,
        E: std::fmt::Display,
    {
        let mut inner = self.inner.lock();
        let mut staged = inner.state.clone();

        match f(&mut staged) {
            Ok(value) => {
                let block_number = inner.next_block;
                inner.next_block += 1;
                inner.state = staged;

                let hash = blake3_hash_multi(&[
                    &self.config.chain_id.to_be_bytes(),
                    &block_number.to_be_bytes(),
                    label.as_bytes(),
                ]);
                let receipt = TxReceipt {
                    tx_hash: hex::encode(hash),
                    block_number,
                    label: label.to_string(),
                    timestamp: Utc::now(),
                };
                debug!(label, block_number, tx_hash = %receipt.tx_hash, "transaction committed");
                Ok((value, receipt))
            }
            Err(e) => {
                debug!(label, error = %e, "transaction reverted");
                Err(e)
            }
        }
    }

    /// Read-only access to the committed state.
    pub fn view<T>(&self, f: impl FnOnce(&WorldState) -> T) -> T {
        f(&self.inner.lock().state)
    }

    /// Block number the next committed transaction will get.
    pub fn block_number(&self) -> u64 {
        self.inner.lock().next_block
    }

    /// Deploy `instance` as code `C` with no initial state.
    pub fn deploy<C: ContractCode>(&self, instance: ContractInstance) -> Result<TxReceipt, NodeError> {
        let artifact = instance.artifact.clone();
        let (address, receipt) = self.transact("deploy", |state| {
            state.deploy::<C>(instance).map(|scope| scope.contract())
        })?;
        info!(%address, %artifact, "contract published");
        Ok(receipt)
    }

    /// Register an account: its instance (and thus public keys) plus the
    /// key that signs its authorizations.
    pub fn register_account(
        &self,
        instance: ContractInstance,
        signer: AccountPublicKey,
    ) -> Result<TxReceipt, NodeError> {
        let (address, receipt) = self.transact("register_account", |state| {
            state.publish_account(instance, signer)
        })?;
        info!(%address, "account registered");
        Ok(receipt)
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new(NodeConfig::default())
    }
}
