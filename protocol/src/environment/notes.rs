//! # Private State Notes
//!
//! Typed private values are bincode-encoded and sealed to the owner's
//! viewing key. The AAD binds every note to where it is stored, so a note
//! copied into another contract's slot fails to open.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::encryption::EncryptionError;
use crate::crypto::note_encryption::{open, seal, SealedNote};
use crate::identity::{AccountKeys, Address, PublicKeys};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NoteError {
    #[error("note encoding failed: {0}")]
    Encode(String),

    #[error("note decoding failed: {0}")]
    Decode(String),

    /// Wrong viewing key, tampered ciphertext, or a note moved between slots.
    #[error("note cannot be decrypted with the supplied keys")]
    Undecryptable,

    #[error("note sealing failed: {0}")]
    Seal(#[from] EncryptionError),
}

/// Where a set of notes lives: `(contract, owner, slot)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NoteKey {
    pub contract: Address,
    pub owner: Address,
    pub slot: String,
}

impl NoteKey {
    pub fn new(contract: Address, owner: Address, slot: &str) -> Self {
        Self {
            contract,
            owner,
            slot: slot.to_string(),
        }
    }

    /// Associated data for every note at this location.
    pub fn aad(&self) -> Vec<u8> {
        let mut aad = Vec::with_capacity(64 + self.slot.len());
        aad.extend_from_slice(self.contract.as_bytes());
        aad.extend_from_slice(self.owner.as_bytes());
        aad.extend_from_slice(self.slot.as_bytes());
        aad
    }
}

/// Encode and seal `value` for the holder of `recipient`'s viewing key.
pub fn seal_value<T: Serialize>(
    key: &NoteKey,
    recipient: &PublicKeys,
    value: &T,
) -> Result<SealedNote, NoteError> {
    let plaintext = bincode::serialize(value).map_err(|e| NoteError::Encode(e.to_string()))?;
    Ok(seal(&recipient.viewing_key, &plaintext, &key.aad())?)
}

/// Open and decode a note sealed with [`seal_value`].
pub fn open_value<T: DeserializeOwned>(
    key: &NoteKey,
    keys: &AccountKeys,
    note: &SealedNote,
) -> Result<T, NoteError> {
    let plaintext =
        open(keys.viewing_key(), note, &key.aad()).map_err(|_| NoteError::Undecryptable)?;
    bincode::deserialize(&plaintext).map_err(|e| NoteError::Decode(e.to_string()))
}
