//! # Private Token Contract
//!
//! A fungible token whose balances exist only as encrypted notes. The
//! ledger sees that notes were written, never how much they hold.
//!
//! ## Security Model
//!
//! - **Mint gating**: only the minter fixed at deployment can mint.
//! - **Transfers**: the owner of the funds may transfer directly. Anyone
//!   else needs an [`AuthWitness`] signed by the owner for exactly this
//!   `(caller, from, to, amount, nonce)`, and each witness is spent once by
//!   publishing its nullifier.
//! - **Balances**: reading a balance means opening the owner's notes, which
//!   takes the owner's keys in the caller's PXE.
//! - **Supply tracking**: total supply is public and checked for overflow.
//!
//! Transfers consume every note the sender holds and write back at most two:
//! a change note for the sender and a note for the recipient.

use ark_bn254::Fr;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use veil_protocol::authwit::{AuthWitness, AuthwitError, TransferAuthorization};
use veil_protocol::crypto::hash::hash_to_field;
use veil_protocol::environment::{
    open_value, seal_value, CallContext, ContractCode, ContractScope, NodeError, NoteError,
    NoteKey, PrivacyError, TxReceipt, WorldState,
};
use veil_protocol::identity::{AccountSecret, Address, ContractInstance};
use veil_protocol::Amount;

/// Artifact name of the token contract.
pub const TOKEN_ARTIFACT: &str = "veil::private_token";

const BALANCES_SLOT: &str = "balances";
const METADATA_KEY: &str = "metadata";
const MINTER_KEY: &str = "minter";
const TOTAL_SUPPLY_KEY: &str = "total_supply";

/// Code of every token instance.
struct TokenCode;

impl ContractCode for TokenCode {
    const ARTIFACT: &'static str = TOKEN_ARTIFACT;
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during token operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    /// The caller is not the minter of this token.
    #[error("unauthorized: {caller} is not the minter")]
    Unauthorized { caller: Address },

    /// The sender's notes do not cover the transfer.
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        requested: Amount,
        available: Amount,
    },

    #[error("no valid transfer authorization from {from}")]
    AuthorizationInvalid { from: Address },

    #[error("transfer authorization from {from} already consumed")]
    AuthorizationConsumed { from: Address },

    #[error("private balance of {address} is not readable from this PXE")]
    ConfidentialityDenied { address: Address },

    #[error("contract {address} is not a registered token")]
    UnknownContract { address: Address },

    #[error("amount overflow")]
    Overflow,

    #[error("corrupt public storage: {0}")]
    Storage(String),

    #[error(transparent)]
    Node(NodeError),

    #[error(transparent)]
    Note(NoteError),
}

impl From<AuthwitError> for TokenError {
    fn from(e: AuthwitError) -> Self {
        match e {
            AuthwitError::Invalid { from } => TokenError::AuthorizationInvalid { from },
            AuthwitError::Consumed { from } => TokenError::AuthorizationConsumed { from },
        }
    }
}

impl From<PrivacyError> for TokenError {
    fn from(e: PrivacyError) -> Self {
        match e {
            PrivacyError::ConfidentialityDenied { address } => {
                TokenError::ConfidentialityDenied { address }
            }
            PrivacyError::UnknownContract { address } => TokenError::UnknownContract { address },
            PrivacyError::AddressMismatch { claimed, .. } => {
                TokenError::UnknownContract { address: claimed }
            }
        }
    }
}

impl From<NodeError> for TokenError {
    fn from(e: NodeError) -> Self {
        match e {
            NodeError::UnknownContract { address } => TokenError::UnknownContract { address },
            other => TokenError::Node(other),
        }
    }
}

impl From<NoteError> for TokenError {
    fn from(e: NoteError) -> Self {
        TokenError::Note(e)
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Public token metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    /// Human-readable name (e.g., "USD Coin").
    pub name: String,
    /// Ticker symbol (e.g., "USDC").
    pub symbol: String,
    /// Number of decimal places.
    pub decimals: u8,
}

impl TokenMetadata {
    pub fn new(name: &str, symbol: &str, decimals: u8) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals,
        }
    }

    /// A USDC-like stablecoin with 6 decimals.
    pub fn usdc() -> Self {
        Self::new("USD Coin", "USDC", 6)
    }

    /// `n` whole units in base units.
    pub fn wad(&self, n: u128) -> Amount {
        wad(n, self.decimals)
    }
}

/// `n · 10^decimals`, saturating at `u128::MAX`.
///
/// ```
/// use veil_contracts::token::wad;
/// assert_eq!(wad(1000, 6), 1_000_000_000);
/// ```
pub const fn wad(n: u128, decimals: u8) -> Amount {
    n.saturating_mul(10u128.saturating_pow(decimals as u32))
}

/// A private token note. Only the amount is sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct ValueNote {
    amount: Amount,
}

/// Handle to a deployed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrivateToken {
    address: Address,
}

impl PrivateToken {
    /// Refer to an already-deployed token.
    pub fn at(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Deploy a token with the caller as minter.
    ///
    /// The token is registered in the caller's PXE. Other parties register
    /// it themselves with [`Pxe::register_contract`](veil_protocol::Pxe::register_contract).
    pub fn deploy_with_minter(
        ctx: &CallContext<'_>,
        metadata: TokenMetadata,
    ) -> Result<(Self, ContractInstance, TxReceipt), TokenError> {
        let metadata_json =
            serde_json::to_vec(&metadata).map_err(|e| TokenError::Storage(e.to_string()))?;

        // The token holds no private state of its own; its keys are
        // generated only so that it has an address.
        let keys = AccountSecret::random().derive_keys();
        let instance = ContractInstance::new(
            TOKEN_ARTIFACT,
            ctx.sender(),
            &[hash_to_field(&metadata_json), ctx.sender().to_field()],
            keys.public_keys(),
        );
        let address = instance.address();
        let minter = ctx.sender();

        let published = instance.clone();
        let (_, receipt) = ctx.node().transact("token.deploy_with_minter", |state| {
            let mut token = state.deploy::<TokenCode>(published)?;
            token.set_public_storage(METADATA_KEY, metadata_json);
            token.set_public_storage(MINTER_KEY, minter.as_bytes().to_vec());
            write_total_supply(&mut token, 0)?;
            Ok::<_, TokenError>(())
        })?;
        ctx.pxe().register_contract(address, instance.clone())?;

        info!(token = %address, symbol = %metadata.symbol, %minter, "token deployed");
        Ok((Self { address }, instance, receipt))
    }

    pub fn metadata(&self, ctx: &CallContext<'_>) -> Result<TokenMetadata, TokenError> {
        ctx.pxe().ensure_contract(&self.address, TOKEN_ARTIFACT)?;
        ctx.node().view(|state| {
            let bytes = state
                .public_storage(&self.address, METADATA_KEY)
                .ok_or_else(|| TokenError::Storage("missing metadata".into()))?;
            serde_json::from_slice(bytes).map_err(|e| TokenError::Storage(e.to_string()))
        })
    }

    pub fn total_supply(&self, ctx: &CallContext<'_>) -> Result<Amount, TokenError> {
        ctx.pxe().ensure_contract(&self.address, TOKEN_ARTIFACT)?;
        ctx.node()
            .view(|state| read_total_supply(state, self.address))
    }

    /// Mint `amount` into a new private note for `to`. Minter only.
    pub fn mint_to_private(
        &self,
        ctx: &CallContext<'_>,
        to: Address,
        amount: Amount,
    ) -> Result<TxReceipt, TokenError> {
        ctx.pxe().ensure_contract(&self.address, TOKEN_ARTIFACT)?;
        let token = self.address;
        let caller = ctx.sender();

        let result = ctx.node().transact("token.mint_to_private", |state| {
            let mut scope = state.scope::<TokenCode>(token)?;
            let minter = scope
                .state()
                .public_storage(&token, MINTER_KEY)
                .ok_or_else(|| TokenError::Storage("missing minter".into()))?;
            if minter != caller.as_bytes() {
                return Err(TokenError::Unauthorized { caller });
            }

            let supply = read_total_supply(scope.state(), token)?
                .checked_add(amount)
                .ok_or(TokenError::Overflow)?;
            write_total_supply(&mut scope, supply)?;

            write_value_note(&mut scope, to, amount)
        });

        match result {
            Ok((_, receipt)) => {
                info!(%token, %to, "minted private tokens");
                Ok(receipt)
            }
            Err(e) => {
                warn!(%token, %caller, error = %e, "mint rejected");
                Err(e)
            }
        }
    }

    /// Move `amount` from `from` to `to` as a standalone transaction.
    pub fn transfer_private_to_private(
        &self,
        ctx: &CallContext<'_>,
        from: Address,
        to: Address,
        amount: Amount,
        nonce: Fr,
        witnesses: &[AuthWitness],
    ) -> Result<TxReceipt, TokenError> {
        ctx.pxe().ensure_contract(&self.address, TOKEN_ARTIFACT)?;
        let result = ctx.node().transact("token.transfer_private_to_private", |state| {
            self.transfer_within(state, ctx, from, to, amount, nonce, witnesses)
        });
        match result {
            Ok((_, receipt)) => Ok(receipt),
            Err(e) => {
                warn!(token = %self.address, %from, error = %e, "transfer rejected");
                Err(e)
            }
        }
    }

    /// Transfer inside a transaction that is already open, for calls made
    /// by another contract. `ctx.sender()` is the calling contract.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn transfer_within(
        &self,
        state: &mut WorldState,
        ctx: &CallContext<'_>,
        from: Address,
        to: Address,
        amount: Amount,
        nonce: Fr,
        witnesses: &[AuthWitness],
    ) -> Result<(), TokenError> {
        let mut scope = state.scope::<TokenCode>(self.address)?;
        if ctx.sender() != from {
            consume_authorization(&mut scope, ctx, from, to, amount, nonce, witnesses)?;
        }

        let keys = ctx.pxe().keys_for(&from)?;
        let from_key = NoteKey::new(self.address, from, BALANCES_SLOT);
        let mut available: Amount = 0;
        for note in scope.take_notes(&from_key)? {
            let value: ValueNote = open_value(&from_key, &keys, &note)
                .map_err(|_| TokenError::ConfidentialityDenied { address: from })?;
            available = available
                .checked_add(value.amount)
                .ok_or(TokenError::Overflow)?;
        }

        if available < amount {
            return Err(TokenError::InsufficientFunds {
                requested: amount,
                available,
            });
        }

        let change = available - amount;
        if change > 0 {
            write_value_note(&mut scope, from, change)?;
        }
        if amount > 0 {
            write_value_note(&mut scope, to, amount)?;
        }
        Ok(())
    }

    /// Sum of `owner`'s notes. Needs `owner`'s keys in the caller's PXE.
    pub fn balance_of_private(
        &self,
        ctx: &CallContext<'_>,
        owner: Address,
    ) -> Result<Amount, TokenError> {
        ctx.pxe().ensure_contract(&self.address, TOKEN_ARTIFACT)?;
        let keys = ctx.pxe().keys_for(&owner)?;
        let key = NoteKey::new(self.address, owner, BALANCES_SLOT);

        ctx.node().view(|state| {
            state.notes(&key).iter().try_fold(0u128, |acc, note| {
                let value: ValueNote = open_value(&key, &keys, note)
                    .map_err(|_| TokenError::ConfidentialityDenied { address: owner })?;
                acc.checked_add(value.amount).ok_or(TokenError::Overflow)
            })
        })
    }
}

fn consume_authorization(
    token: &mut ContractScope<'_>,
    ctx: &CallContext<'_>,
    from: Address,
    to: Address,
    amount: Amount,
    nonce: Fr,
    witnesses: &[AuthWitness],
) -> Result<(), TokenError> {
    let chain_id = ctx.node().chain_id();
    let authorization = TransferAuthorization {
        consumer: token.contract(),
        caller: ctx.sender(),
        from,
        to,
        amount,
        nonce,
    };
    let signer = token
        .state()
        .account_signer(&from)
        .map_err(|_| TokenError::AuthorizationInvalid { from })?;
    authorization.verify(chain_id, &signer, witnesses)?;

    let nullifier = authorization.nullifier(chain_id);
    if token.state().has_nullifier(&token.contract(), &nullifier) {
        return Err(TokenError::AuthorizationConsumed { from });
    }
    token.push_nullifier(nullifier)?;
    Ok(())
}

fn write_value_note(
    token: &mut ContractScope<'_>,
    owner: Address,
    amount: Amount,
) -> Result<(), TokenError> {
    let recipient = token.state().public_keys(&owner)?;
    let key = NoteKey::new(token.contract(), owner, BALANCES_SLOT);
    let note = seal_value(&key, &recipient, &ValueNote { amount })?;
    token.push_note(key, note)?;
    Ok(())
}

fn read_total_supply(state: &WorldState, token: Address) -> Result<Amount, TokenError> {
    let bytes = state
        .public_storage(&token, TOTAL_SUPPLY_KEY)
        .ok_or_else(|| TokenError::Storage("missing total supply".into()))?;
    serde_json::from_slice(bytes).map_err(|e| TokenError::Storage(e.to_string()))
}

fn write_total_supply(token: &mut ContractScope<'_>, supply: Amount) -> Result<(), TokenError> {
    let bytes = serde_json::to_vec(&supply).map_err(|e| TokenError::Storage(e.to_string()))?;
    token.set_public_storage(TOTAL_SUPPLY_KEY, bytes);
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
