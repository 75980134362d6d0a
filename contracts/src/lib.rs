//! # Veil Contracts
//!
//! Contract logic for confidential card spending:
//!
//! - **Private Token** — a fungible token whose balances are encrypted
//!   notes, with minter-gated issuance and single-use delegated transfer
//!   authorizations.
//! - **Card Escrow** — holds a private token balance for an owner and pays
//!   an operator only against owner-signed, nonce-bound authorizations, up
//!   to a spend limit.
//!
//! ## Design Principles
//!
//! 1. All monetary operations check for overflow: `checked_add` and
//!    `checked_sub` everywhere.
//! 2. Signature verification gates every privileged operation.
//! 3. Every mutation runs in one node transaction. Failure means no change.
//! 4. Private values reach the ledger only as sealed notes.

pub mod card_escrow;
pub mod token;

pub use card_escrow::{CardEscrow, DeployedEscrow, EscrowAction, EscrowError};
pub use token::{wad, PrivateToken, TokenError, TokenMetadata};
