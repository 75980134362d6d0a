use thiserror::Error;

use veil_protocol::environment::{NodeError, NoteError, PrivacyError};
use veil_protocol::identity::Address;
use veil_protocol::Amount;

use crate::token::TokenError;

/// Errors that can occur during card escrow operations.
///
/// Every error aborts the enclosing transaction: nonce, limit and balance
/// are exactly as they were before the call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EscrowError {
    /// The signature does not verify against the digest for the current
    /// nonce and this action. Covers replays, wrong keys, wrong action
    /// tags, and signatures that are not 64 bytes.
    #[error("invalid owner signature")]
    SignatureInvalid,

    #[error("withdrawal of {requested} exceeds spend limit {limit}")]
    InsufficientSpendLimit { requested: Amount, limit: Amount },

    #[error("withdrawal of {requested} exceeds escrow balance {available}")]
    InsufficientBalance {
        requested: Amount,
        available: Amount,
    },

    /// No delegated transfer authorization matches the deposit.
    #[error("deposit transfer authorization is missing or invalid")]
    AuthorizationInvalid,

    /// The deposit's transfer authorization was already redeemed.
    #[error("deposit transfer authorization already consumed")]
    AuthorizationConsumed,

    /// The depositor's token balance does not cover the deposit.
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        requested: Amount,
        available: Amount,
    },

    #[error("escrow state of {address} is not readable from this PXE")]
    ConfidentialityDenied { address: Address },

    #[error("contract {address} is not registered in this PXE")]
    UnknownContract { address: Address },

    /// The party has published no public keys, so no note can be sealed
    /// for it.
    #[error("no public keys published for {address}")]
    UnknownAccount { address: Address },

    #[error("escrow balance overflow")]
    AmountOverflow,

    #[error("escrow nonce exhausted")]
    NonceExhausted,

    #[error("token call failed: {0}")]
    Token(TokenError),

    #[error("escrow storage: {0}")]
    Storage(String),
}

impl From<TokenError> for EscrowError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::AuthorizationInvalid { .. } => EscrowError::AuthorizationInvalid,
            TokenError::AuthorizationConsumed { .. } => EscrowError::AuthorizationConsumed,
            TokenError::InsufficientFunds {
                requested,
                available,
            } => EscrowError::InsufficientFunds {
                requested,
                available,
            },
            TokenError::ConfidentialityDenied { address } => {
                EscrowError::ConfidentialityDenied { address }
            }
            TokenError::UnknownContract { address } => EscrowError::UnknownContract { address },
            other => EscrowError::Token(other),
        }
    }
}

impl From<PrivacyError> for EscrowError {
    fn from(e: PrivacyError) -> Self {
        match e {
            PrivacyError::ConfidentialityDenied { address } => {
                EscrowError::ConfidentialityDenied { address }
            }
            PrivacyError::UnknownContract { address } => EscrowError::UnknownContract { address },
            PrivacyError::AddressMismatch { claimed, .. } => {
                EscrowError::UnknownContract { address: claimed }
            }
        }
    }
}

impl From<NodeError> for EscrowError {
    fn from(e: NodeError) -> Self {
        match e {
            NodeError::UnknownContract { address } => EscrowError::UnknownContract { address },
            NodeError::UnknownPublicKeys { address } => EscrowError::UnknownAccount { address },
            other => EscrowError::Storage(other.to_string()),
        }
    }
}

impl From<NoteError> for EscrowError {
    fn from(e: NoteError) -> Self {
        EscrowError::Storage(e.to_string())
    }
}
