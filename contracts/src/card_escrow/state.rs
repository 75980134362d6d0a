//! # Escrow State
//!
//! The whole private state of an escrow is one [`EscrowAccount`], stored as
//! a single sealed note owned by the escrow address. Transitions here are
//! pure: they check, then mutate `self`, and never touch the ledger. The
//! dispatcher loads the account, applies one transition, and writes it
//! back inside one transaction.
//!
//! ## State Transitions
//!
//! A signed action `(amount, signature)` against an account with nonce `n`:
//!
//! 1. Verify `signature` over `digest(escrow, amount, n, tag)`.
//! 2. Check the action's own preconditions (withdrawals only).
//! 3. Apply the action.
//! 4. `nonce = n + 1`.
//!
//! Any failure leaves `self` untouched.

use serde::{Deserialize, Serialize};

use veil_protocol::crypto::schnorr::SchnorrPublicKey;
use veil_protocol::identity::Address;
use veil_protocol::Amount;

use super::error::EscrowError;
use super::message::{verify_escrow_signature, EscrowAction};

/// Private state of one card escrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowAccount {
    /// The deployer.
    pub owner: Address,
    /// Receives withdrawn funds.
    pub operator: Address,
    /// The asset held in escrow.
    pub token: Address,
    /// Verifies owner-signed authorizations.
    pub owner_public_key: SchnorrPublicKey,
    /// Ceiling on a single withdrawal.
    pub spend_limit: Amount,
    /// Number of signed actions applied so far.
    pub nonce: u64,
    pub balance: Amount,
}

/// The configuration view returned by `get_config`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowConfig {
    pub owner: Address,
    pub operator: Address,
    pub token: Address,
    pub spend_limit: Amount,
}

impl EscrowAccount {
    pub fn new(
        owner: Address,
        operator: Address,
        token: Address,
        owner_public_key: SchnorrPublicKey,
        spend_limit: Amount,
    ) -> Self {
        Self {
            owner,
            operator,
            token,
            owner_public_key,
            spend_limit,
            nonce: 0,
            balance: 0,
        }
    }

    pub fn config(&self) -> EscrowConfig {
        EscrowConfig {
            owner: self.owner,
            operator: self.operator,
            token: self.token,
            spend_limit: self.spend_limit,
        }
    }

    fn check_signature(
        &self,
        escrow: &Address,
        amount: Amount,
        action: EscrowAction,
        signature: &[u8],
    ) -> Result<(), EscrowError> {
        if verify_escrow_signature(
            escrow,
            amount,
            self.nonce,
            action,
            &self.owner_public_key,
            signature,
        ) {
            Ok(())
        } else {
            Err(EscrowError::SignatureInvalid)
        }
    }

    fn next_nonce(&self) -> Result<u64, EscrowError> {
        self.nonce.checked_add(1).ok_or(EscrowError::NonceExhausted)
    }

    /// Replace the spend limit under an owner signature.
    pub fn change_spend_limit(
        &mut self,
        escrow: &Address,
        new_limit: Amount,
        signature: &[u8],
    ) -> Result<(), EscrowError> {
        self.check_signature(escrow, new_limit, EscrowAction::SpendLimit, signature)?;
        let nonce = self.next_nonce()?;

        self.spend_limit = new_limit;
        self.nonce = nonce;
        Ok(())
    }

    /// Debit `amount` under an owner signature.
    ///
    /// Checks run in a fixed order: signature, spend limit, balance.
    pub fn withdraw(
        &mut self,
        escrow: &Address,
        amount: Amount,
        signature: &[u8],
    ) -> Result<(), EscrowError> {
        self.check_signature(escrow, amount, EscrowAction::Withdraw, signature)?;

        if amount > self.spend_limit {
            return Err(EscrowError::InsufficientSpendLimit {
                requested: amount,
                limit: self.spend_limit,
            });
        }
        let balance =
            self.balance
                .checked_sub(amount)
                .ok_or(EscrowError::InsufficientBalance {
                    requested: amount,
                    available: self.balance,
                })?;
        let nonce = self.next_nonce()?;

        self.balance = balance;
        self.nonce = nonce;
        Ok(())
    }

    /// Credit a deposit. Does not touch the nonce.
    pub fn deposit(&mut self, amount: Amount) -> Result<(), EscrowError> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(EscrowError::AmountOverflow)?;
        Ok(())
    }
}
