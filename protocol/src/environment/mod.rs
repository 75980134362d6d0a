//! # Execution Environment
//!
//! An in-process stand-in for the network a contract runs on:
//!
//! - [`Node`]: the shared ledger. Everyone sees it; private values on it
//!   are encrypted.
//! - [`Pxe`]: one party's keystore and contract registry.
//! - [`Wallet`]: an account with a signing key, bound to a node and a PXE.
//! - [`CallContext`]: what a contract call is given. It names the node,
//!   the caller's PXE, and `msg_sender`.
//!
//! A [`CallContext`] only comes from [`Wallet::context`] (the wallet's own
//! address as sender) or from [`ContractScope::call_context`] (a contract
//! calling onward as itself).

pub mod node;
pub mod notes;
pub mod pxe;
pub mod wallet;

pub use node::{ContractCode, ContractScope, Node, NodeError, TxReceipt, WorldState};
pub use notes::{open_value, seal_value, NoteError, NoteKey};
pub use pxe::{PrivacyError, Pxe};
pub use wallet::{Wallet, ACCOUNT_ARTIFACT};

use crate::identity::Address;

/// The environment of a single contract call.
#[derive(Clone, Copy)]
pub struct CallContext<'a> {
    node: &'a Node,
    pxe: &'a Pxe,
    sender: Address,
}

impl<'a> CallContext<'a> {
    pub(crate) fn new(node: &'a Node, pxe: &'a Pxe, sender: Address) -> Self {
        Self { node, pxe, sender }
    }

    pub fn node(&self) -> &'a Node {
        self.node
    }

    pub fn pxe(&self) -> &'a Pxe {
        self.pxe
    }

    /// `msg_sender` of the call.
    pub fn sender(&self) -> Address {
        self.sender
    }
}
