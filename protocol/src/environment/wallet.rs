//! # Wallets
//!
//! A wallet is an account with a signing key, bound to one node and one
//! PXE. Creating a wallet publishes its account instance and signing key on
//! the node and registers its decryption material in the PXE.

use std::fmt;
use std::sync::Arc;

use tracing::info;

use super::node::{Node, NodeError};
use super::pxe::Pxe;
use super::CallContext;
use crate::authwit::{AuthWitness, TransferAuthorization};
use crate::crypto::hash::bytes_to_fields;
use crate::crypto::keys::{AccountKeypair, AccountPublicKey};
use crate::identity::{AccountSecret, Address, ContractInstance};

/// Artifact name of account contracts.
pub const ACCOUNT_ARTIFACT: &str = "veil::account";

pub struct Wallet {
    address: Address,
    keypair: AccountKeypair,
    node: Arc<Node>,
    pxe: Arc<Pxe>,
}

impl Wallet {
    /// Create a fresh account and register it with `node` and `pxe`.
    pub fn create(node: Arc<Node>, pxe: Arc<Pxe>) -> Result<Self, NodeError> {
        let secret = AccountSecret::random();
        let keypair = AccountKeypair::generate();
        let signer = keypair.public_key();

        let instance = ContractInstance::new(
            ACCOUNT_ARTIFACT,
            Address::ZERO,
            &bytes_to_fields(signer.as_bytes()),
            secret.derive_keys().public_keys(),
        );
        let partial = instance.partial_address();
        node.register_account(instance, signer)?;
        let address = pxe.register_account(&secret, partial);

        info!(%address, pxe = pxe.label(), "wallet created");
        Ok(Self {
            address,
            keypair,
            node,
            pxe,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn public_key(&self) -> AccountPublicKey {
        self.keypair.public_key()
    }

    pub fn node(&self) -> &Arc<Node> {
        &self.node
    }

    pub fn pxe(&self) -> &Arc<Pxe> {
        &self.pxe
    }

    /// Sign a delegated transfer authorization.
    ///
    /// Only meaningful when `authorization.from` is this wallet; anything
    /// else produces a witness that will never verify.
    pub fn create_authwit(&self, authorization: &TransferAuthorization) -> AuthWitness {
        authorization.sign(self.node.chain_id(), &self.keypair)
    }

    /// A call context with this wallet as sender.
    pub fn context(&self) -> CallContext<'_> {
        CallContext::new(&self.node, &self.pxe, self.address)
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .field("pxe", &self.pxe.label())
            .finish()
    }
}
