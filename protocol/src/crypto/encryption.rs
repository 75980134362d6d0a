//! # AES-256-GCM Encryption
//!
//! Authenticated encryption for private state. [`encrypt_with_aad`] and
//! [`decrypt_with_aad`] keep the nonce separate and authenticate extra
//! metadata; notes use this to bind a ciphertext to the storage location it
//! was written to.
//!
//! Nonces are 96 random bits per call. Note keys are single-use (fresh
//! ephemeral ECDH per note), so the birthday bound never comes into play.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use thiserror::Error;

use crate::config::{AES_KEY_LENGTH, AES_NONCE_LENGTH, AES_TAG_LENGTH};

/// Errors that can occur during encryption/decryption.
///
/// "Wrong key" and "corrupted ciphertext" are deliberately the same error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncryptionError {
    #[error("encryption failed")]
    EncryptFailed,

    #[error("decryption failed -- wrong key or corrupted ciphertext")]
    DecryptFailed,

    #[error("ciphertext too short: must be at least {AES_TAG_LENGTH} bytes")]
    CiphertextTooShort,
}

fn random_nonce() -> [u8; AES_NONCE_LENGTH] {
    let mut nonce = [0u8; AES_NONCE_LENGTH];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Encrypt with Additional Authenticated Data.
///
/// Returns `(nonce, ciphertext || tag)`. The same AAD must be supplied at
/// decryption time.
///
/// ```
/// use veil_protocol::crypto::encryption::{decrypt_with_aad, encrypt_with_aad};
///
/// let key = [0x42u8; 32];
/// let (nonce, sealed) = encrypt_with_aad(&key, b"spend limit", b"slot").unwrap();
/// assert_eq!(decrypt_with_aad(&key, &nonce, &sealed, b"slot").unwrap(), b"spend limit");
/// ```
pub fn encrypt_with_aad(
    key: &[u8; AES_KEY_LENGTH],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<([u8; AES_NONCE_LENGTH], Vec<u8>), EncryptionError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| EncryptionError::EncryptFailed)?;
    let nonce_bytes = random_nonce();
    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce_bytes),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|_| EncryptionError::EncryptFailed)?;
    Ok((nonce_bytes, ciphertext))
}

/// Decrypt ciphertext produced by [`encrypt_with_aad`].
pub fn decrypt_with_aad(
    key: &[u8; AES_KEY_LENGTH],
    nonce: &[u8; AES_NONCE_LENGTH],
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, EncryptionError> {
    if ciphertext.len() < AES_TAG_LENGTH {
        return Err(EncryptionError::CiphertextTooShort);
    }
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| EncryptionError::DecryptFailed)?;
    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| EncryptionError::DecryptFailed)
}
