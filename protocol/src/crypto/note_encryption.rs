//! # Note Encryption
//!
//! Private state is stored as sealed notes that only the holder of the
//! recipient's viewing secret can open. Anyone who knows the recipient's
//! viewing *public* key can write one, which is what lets a depositor fund an
//! escrow without holding the escrow's keys.
//!
//! ```text
//! e      <- random X25519 scalar           (fresh per note)
//! E      = e·B                             (stored alongside the note)
//! shared = X25519(e, V)                    (V = recipient viewing key)
//! key    = BLAKE3-derive_key(NOTE_KEY_CONTEXT, shared || E || V)
//! note   = E || nonce || AES-256-GCM(key, plaintext, aad)
//! ```
//!
//! Each note gets its own key, so AES-GCM nonce reuse is a non-issue.

use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use super::encryption::{decrypt_with_aad, encrypt_with_aad, EncryptionError};
use crate::config::{AES_NONCE_LENGTH, NOTE_KEY_CONTEXT};

/// Long-lived X25519 secret that opens notes addressed to an account.
#[derive(Clone)]
pub struct ViewingSecretKey {
    secret: StaticSecret,
}

/// The public half; safe to publish in the node's key registry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewingPublicKey {
    bytes: [u8; 32],
}

/// An encrypted note as it sits in ledger storage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedNote {
    /// Ephemeral X25519 public key `E`.
    pub ephemeral_public: [u8; 32],
    /// AES-GCM nonce.
    pub nonce: [u8; AES_NONCE_LENGTH],
    /// Ciphertext with the 16-byte tag appended.
    pub ciphertext: Vec<u8>,
}

impl ViewingSecretKey {
    /// Wrap 32 bytes of derived key material.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self {
            secret: StaticSecret::from(bytes),
        }
    }

    pub fn public_key(&self) -> ViewingPublicKey {
        ViewingPublicKey {
            bytes: PublicKey::from(&self.secret).to_bytes(),
        }
    }
}

impl fmt::Debug for ViewingSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ViewingSecretKey(pub={})", self.public_key().to_hex())
    }
}

impl ViewingPublicKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl fmt::Debug for ViewingPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ViewingPublicKey({}...)", &self.to_hex()[..12])
    }
}

fn derive_note_key(shared: &[u8; 32], ephemeral: &[u8; 32], recipient: &[u8; 32]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(NOTE_KEY_CONTEXT);
    hasher.update(shared);
    hasher.update(ephemeral);
    hasher.update(recipient);
    *hasher.finalize().as_bytes()
}

/// Seal `plaintext` to `recipient`, authenticating `aad`.
pub fn seal(
    recipient: &ViewingPublicKey,
    plaintext: &[u8],
    aad: &[u8],
) -> Result<SealedNote, EncryptionError> {
    let ephemeral = EphemeralSecret::random_from_rng(OsRng);
    let ephemeral_public = PublicKey::from(&ephemeral).to_bytes();
    let shared = ephemeral.diffie_hellman(&PublicKey::from(recipient.bytes));
    let key = derive_note_key(shared.as_bytes(), &ephemeral_public, &recipient.bytes);

    let (nonce, ciphertext) = encrypt_with_aad(&key, plaintext, aad)?;
    Ok(SealedNote {
        ephemeral_public,
        nonce,
        ciphertext,
    })
}

/// Open a note with the recipient's viewing secret.
///
/// Fails with [`EncryptionError::DecryptFailed`] for the wrong key, a
/// tampered note, or mismatched `aad`. These are indistinguishable on
/// purpose.
pub fn open(
    viewing_key: &ViewingSecretKey,
    note: &SealedNote,
    aad: &[u8],
) -> Result<Vec<u8>, EncryptionError> {
    let recipient = viewing_key.public_key();
    let shared = viewing_key
        .secret
        .diffie_hellman(&PublicKey::from(note.ephemeral_public));
    let key = derive_note_key(shared.as_bytes(), &note.ephemeral_public, &recipient.bytes);
    decrypt_with_aad(&key, &note.nonce, &note.ciphertext, aad)
}
