// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Veil Protocol — Core Library
//!
//! Primitives for confidential escrows: an owner keeps a private balance and
//! lets an operator spend from it under owner-signed, single-use
//! authorizations.
//!
//! ## Architecture
//!
//! - **config** — Protocol constants, hash separators, `NodeConfig`.
//! - **logging** — `tracing-subscriber` setup.
//! - **crypto** — Poseidon, Schnorr, Ed25519, AES-GCM, sealed notes.
//! - **identity** — Addresses, account secrets, contract instances.
//! - **authwit** — Single-use delegated transfer authorizations.
//! - **environment** — Node (shared ledger), PXE (per-party keys), wallets.
//!
//! Contracts built on these live in `veil-contracts`.
//!
//! ## Design Philosophy
//!
//! 1. One digest function per message type, shared by signer and verifier.
//! 2. Private state exists on the ledger only as ciphertext.
//! 3. Every mutation is an all-or-nothing transaction.
//! 4. If it touches money, it has tests. Plural.

pub mod authwit;
pub mod config;
pub mod crypto;
pub mod environment;
pub mod identity;
pub mod logging;

pub use authwit::{AuthWitness, TransferAuthorization};
pub use environment::{CallContext, Node, Pxe, Wallet};
pub use identity::{AccountSecret, Address, ContractInstance};

/// Amount of a fungible asset, in base units.
pub type Amount = u128;
