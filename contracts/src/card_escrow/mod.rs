//! # Card Escrow Contract
//!
//! Holds a private token balance for an owner and lets an operator (the
//! card issuer) draw from it, one owner-signed authorization at a time.
//!
//! ## Lifecycle
//!
//! ```text
//!  deploy ──> Active ──┬── deposit(amount, authwit)              balance += amount
//!                      ├── change_spend_limit_by_signature(l, σ)  limit = l,  nonce += 1
//!                      └── withdraw_by_signature(a, σ)            balance -= a, nonce += 1
//!                                                                 (a -> operator)
//! ```
//!
//! There is one state. Every call either applies completely or fails with
//! nothing changed.
//!
//! ## Security Model
//!
//! - **Owner authorization**: spend-limit changes and withdrawals need a
//!   Schnorr signature by the owner over
//!   `Poseidon(escrow, amount, nonce, action_tag)`. The contract uses its
//!   own nonce, so each signature works once. See [`message`].
//! - **Deposits** need no owner signature, only a delegated transfer
//!   authorization from the depositor to the token.
//! - **Confidentiality**: the escrow's state is a sealed note. Every call,
//!   reads included, runs against a PXE that holds the escrow's secret.
//!   Knowing the contract instance is not enough.

pub mod error;
pub mod message;
pub mod state;

use ark_bn254::Fr;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use veil_protocol::authwit::AuthWitness;
use veil_protocol::crypto::hash::bytes_to_fields;
use veil_protocol::crypto::schnorr::SchnorrPublicKey;
use veil_protocol::environment::{
    open_value, seal_value, CallContext, ContractCode, ContractScope, NoteKey, TxReceipt,
    WorldState,
};
use veil_protocol::identity::{AccountSecret, Address, ContractInstance};
use veil_protocol::Amount;

use crate::token::{PrivateToken, TOKEN_ARTIFACT};

pub use error::EscrowError;
pub use message::{
    authorization_digest, build_signed_escrow_message, verify_escrow_signature, EscrowAction,
    SignedEscrowMessage,
};
pub use state::{EscrowAccount, EscrowConfig};

/// Artifact name of the card escrow contract.
pub const ESCROW_ARTIFACT: &str = "veil::card_escrow";

const ACCOUNT_SLOT: &str = "account";

/// Code of every escrow instance.
struct EscrowCode;

impl ContractCode for EscrowCode {
    const ARTIFACT: &'static str = ESCROW_ARTIFACT;
}

/// Everything the deployer gets back.
#[derive(Debug)]
pub struct DeployedEscrow {
    pub escrow: CardEscrow,
    /// Decryption secret for the escrow's private state. Share it (with
    /// [`instance`](Self::instance)) with any party that must read or
    /// operate the escrow from its own PXE.
    pub secret: AccountSecret,
    pub instance: ContractInstance,
    pub receipt: TxReceipt,
}

/// Handle to a deployed card escrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardEscrow {
    address: Address,
}

impl CardEscrow {
    /// Refer to an already-deployed escrow.
    pub fn at(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Deploy an escrow owned by the caller.
    ///
    /// Generates the escrow's own keys, publishes the instance, writes the
    /// initial state (nonce 0, zero balance), and registers both the
    /// instance and the secret in the caller's PXE. The operator must have
    /// published public keys, since withdrawals seal notes for it.
    pub fn deploy(
        ctx: &CallContext<'_>,
        token: &PrivateToken,
        operator: Address,
        owner_public_key: SchnorrPublicKey,
        initial_spend_limit: Amount,
    ) -> Result<DeployedEscrow, EscrowError> {
        let secret = AccountSecret::random();
        let keys = secret.derive_keys();

        let [pk_hi, pk_lo] = bytes_to_fields(owner_public_key.as_bytes());
        let instance = ContractInstance::new(
            ESCROW_ARTIFACT,
            ctx.sender(),
            &[
                token.address().to_field(),
                operator.to_field(),
                pk_hi,
                pk_lo,
                Fr::from(initial_spend_limit),
            ],
            keys.public_keys(),
        );
        let escrow = Self {
            address: instance.address(),
        };
        let account = EscrowAccount::new(
            ctx.sender(),
            operator,
            token.address(),
            owner_public_key,
            initial_spend_limit,
        );

        let published = instance.clone();
        let (_, receipt) = ctx.node().transact("card_escrow.deploy", |state| {
            state.public_keys(&operator)?;
            let mut scope = state.deploy::<EscrowCode>(published)?;
            escrow.store(&mut scope, &account)
        })?;

        let registered = ctx.pxe().register_account(&secret, instance.partial_address());
        if registered != escrow.address {
            return Err(EscrowError::Storage(format!(
                "escrow secret derives {registered}, expected {}",
                escrow.address
            )));
        }
        ctx.pxe().register_contract(escrow.address, instance.clone())?;

        info!(
            escrow = %escrow.address,
            owner = %ctx.sender(),
            %operator,
            token = %token.address(),
            "card escrow deployed"
        );
        Ok(DeployedEscrow {
            escrow,
            secret,
            instance,
            receipt,
        })
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Pull `amount` of the escrow's token from the caller.
    ///
    /// The caller must have authorized
    /// `token.transfer_private_to_private(caller, escrow, amount, nonce)`
    /// with the escrow as the authorized caller, and pass the witness here.
    pub fn deposit(
        &self,
        ctx: &CallContext<'_>,
        amount: Amount,
        nonce: Fr,
        witnesses: &[AuthWitness],
    ) -> Result<TxReceipt, EscrowError> {
        let depositor = ctx.sender();
        let receipt = self.execute(ctx, "deposit", |state, as_escrow, account| {
            ctx.pxe().ensure_contract(&account.token, TOKEN_ARTIFACT)?;
            PrivateToken::at(account.token).transfer_within(
                state,
                as_escrow,
                depositor,
                self.address,
                amount,
                nonce,
                witnesses,
            )?;
            account.deposit(amount)
        })?;
        info!(escrow = %self.address, %depositor, "deposit applied");
        Ok(receipt)
    }

    /// Set a new spend limit under an owner signature over
    /// `(escrow, new_limit, current_nonce, SpendLimit)`.
    pub fn change_spend_limit_by_signature(
        &self,
        ctx: &CallContext<'_>,
        new_limit: Amount,
        signature: &[u8],
    ) -> Result<TxReceipt, EscrowError> {
        let receipt = self.execute(ctx, "change_spend_limit_by_signature", |_, _, account| {
            account.change_spend_limit(&self.address, new_limit, signature)
        })?;
        info!(escrow = %self.address, "spend limit changed");
        Ok(receipt)
    }

    /// Send `amount` to the operator under an owner signature over
    /// `(escrow, amount, current_nonce, Withdraw)`.
    pub fn withdraw_by_signature(
        &self,
        ctx: &CallContext<'_>,
        amount: Amount,
        signature: &[u8],
    ) -> Result<TxReceipt, EscrowError> {
        let receipt = self.execute(ctx, "withdraw_by_signature", |state, as_escrow, account| {
            account.withdraw(&self.address, amount, signature)?;
            ctx.pxe().ensure_contract(&account.token, TOKEN_ARTIFACT)?;
            PrivateToken::at(account.token).transfer_within(
                state,
                as_escrow,
                self.address,
                account.operator,
                amount,
                Fr::from(0u64),
                &[],
            )?;
            Ok(())
        })?;
        info!(escrow = %self.address, "withdrawal sent to operator");
        Ok(receipt)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn get_nonce(&self, ctx: &CallContext<'_>) -> Result<u64, EscrowError> {
        self.read(ctx, |account| account.nonce)
    }

    pub fn get_spend_limit(&self, ctx: &CallContext<'_>) -> Result<Amount, EscrowError> {
        self.read(ctx, |account| account.spend_limit)
    }

    pub fn get_config(&self, ctx: &CallContext<'_>) -> Result<EscrowConfig, EscrowError> {
        self.read(ctx, EscrowAccount::config)
    }

    pub fn get_balance(&self, ctx: &CallContext<'_>) -> Result<Amount, EscrowError> {
        self.read(ctx, |account| account.balance)
    }

    // -----------------------------------------------------------------------
    // Storage
    // -----------------------------------------------------------------------

    fn note_key(&self) -> NoteKey {
        NoteKey::new(self.address, self.address, ACCOUNT_SLOT)
    }

    fn load(&self, state: &WorldState, ctx: &CallContext<'_>) -> Result<EscrowAccount, EscrowError> {
        ctx.pxe().ensure_contract(&self.address, ESCROW_ARTIFACT)?;
        let keys = ctx.pxe().keys_for(&self.address)?;
        let key = self.note_key();
        let note = state
            .notes(&key)
            .last()
            .ok_or_else(|| EscrowError::Storage(format!("no state note for {}", self.address)))?;
        open_value(&key, &keys, note).map_err(|_| EscrowError::ConfidentialityDenied {
            address: self.address,
        })
    }

    fn store(
        &self,
        escrow: &mut ContractScope<'_>,
        account: &EscrowAccount,
    ) -> Result<(), EscrowError> {
        let recipient = escrow.state().public_keys(&self.address)?;
        let key = self.note_key();
        let note = seal_value(&key, &recipient, account)?;
        escrow.replace_note(key, note)?;
        Ok(())
    }

    fn read<T>(
        &self,
        ctx: &CallContext<'_>,
        f: impl FnOnce(&EscrowAccount) -> T,
    ) -> Result<T, EscrowError> {
        ctx.node()
            .view(|state| self.load(state, ctx))
            .map(|account| f(&account))
    }

    /// Load, mutate, store, all in one transaction.
    ///
    /// `f` gets a context with the escrow as sender for its calls into the
    /// token.
    fn execute<'a>(
        &self,
        ctx: &CallContext<'a>,
        op: &str,
        f: impl FnOnce(
            &mut WorldState,
            &CallContext<'a>,
            &mut EscrowAccount,
        ) -> Result<(), EscrowError>,
    ) -> Result<TxReceipt, EscrowError> {
        let label = format!("card_escrow.{op}");
        let result = ctx.node().transact(&label, |state| {
            let mut account = self.load(state, ctx)?;
            let as_escrow = state.scope::<EscrowCode>(self.address)?.call_context(ctx);
            f(state, &as_escrow, &mut account)?;
            self.store(&mut state.scope::<EscrowCode>(self.address)?, &account)
        });
        match result {
            Ok(((), receipt)) => Ok(receipt),
            Err(e) => {
                warn!(escrow = %self.address, op, caller = %ctx.sender(), error = %e, "escrow call rejected");
                Err(e)
            }
        }
    }
}
