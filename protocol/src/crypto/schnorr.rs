//! # Schnorr Signatures (BIP-340 over secp256k1)
//!
//! Owner countersignatures on escrow actions are BIP-340 Schnorr signatures
//! produced and checked by the `secp256k1` crate:
//!
//! ```text
//! m         = SHA-256(SCHNORR_MESSAGE_CONTEXT || message)
//! signature = R.x (32 bytes) || s (32 bytes)
//! public    = x-only point (32 bytes)
//! ```
//!
//! The signed message is the 32-byte authorization digest; the scheme does
//! not care what it is. Signing uses no auxiliary randomness, so the same
//! key and message always give the same bytes.

use rand::rngs::OsRng;
use secp256k1::schnorr::Signature;
use secp256k1::{All, Keypair, Message, Secp256k1, SecretKey, XOnlyPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

use crate::config::{SCHNORR_KEY_LENGTH, SCHNORR_MESSAGE_CONTEXT, SCHNORR_SIGNATURE_LENGTH};

/// Errors from parsing Schnorr key and signature material.
///
/// Verification itself returns `bool`; there is nothing useful to tell a
/// caller about *why* a signature is wrong.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchnorrError {
    #[error("invalid signature length: expected {SCHNORR_SIGNATURE_LENGTH} bytes, got {0}")]
    InvalidSignatureLength(usize),

    #[error("invalid secret key: zero or not below the curve order")]
    InvalidSecretKey,

    #[error("invalid public key: not an x-only secp256k1 point")]
    InvalidPublicKey,
}

/// Signing and verification context, built once per process.
fn secp() -> &'static Secp256k1<All> {
    static CONTEXT: OnceLock<Secp256k1<All>> = OnceLock::new();
    CONTEXT.get_or_init(Secp256k1::new)
}

fn message_for(message: &[u8]) -> Message {
    let digest: [u8; 32] = Sha256::new()
        .chain_update(SCHNORR_MESSAGE_CONTEXT)
        .chain_update(message)
        .finalize()
        .into();
    Message::from_digest(digest)
}

// ---------------------------------------------------------------------------
// SchnorrSecretKey
// ---------------------------------------------------------------------------

/// The signing half. Deliberately not `Serialize`; export with
/// [`to_bytes`](Self::to_bytes) when you really mean it.
#[derive(Clone)]
pub struct SchnorrSecretKey {
    keypair: Keypair,
}

impl SchnorrSecretKey {
    /// Generate a fresh key from the OS RNG.
    pub fn generate() -> Self {
        let secret = SecretKey::new(&mut OsRng);
        Self {
            keypair: Keypair::from_secret_key(secp(), &secret),
        }
    }

    /// Parse a 32-byte big-endian scalar in `[1, n)`.
    pub fn from_bytes(bytes: [u8; SCHNORR_KEY_LENGTH]) -> Result<Self, SchnorrError> {
        let secret = SecretKey::from_slice(&bytes).map_err(|_| SchnorrError::InvalidSecretKey)?;
        Ok(Self {
            keypair: Keypair::from_secret_key(secp(), &secret),
        })
    }

    /// Raw secret bytes. Handle with care.
    pub fn to_bytes(&self) -> [u8; SCHNORR_KEY_LENGTH] {
        self.keypair.secret_bytes()
    }

    pub fn public_key(&self) -> SchnorrPublicKey {
        let (x_only, _parity) = self.keypair.x_only_public_key();
        SchnorrPublicKey {
            bytes: x_only.serialize(),
        }
    }

    /// Sign `message`.
    pub fn sign(&self, message: &[u8]) -> SchnorrSignature {
        let signature = secp().sign_schnorr_no_aux_rand(&message_for(message), &self.keypair);
        SchnorrSignature {
            bytes: signature.serialize(),
        }
    }
}

impl fmt::Debug for SchnorrSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SchnorrSecretKey(pub={})", self.public_key().to_hex())
    }
}

// ---------------------------------------------------------------------------
// SchnorrPublicKey
// ---------------------------------------------------------------------------

/// An x-only secp256k1 public key.
///
/// Deserialization goes through [`from_bytes`](Self::from_bytes), so a
/// decoded key is always a valid point.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(
    try_from = "[u8; SCHNORR_KEY_LENGTH]",
    into = "[u8; SCHNORR_KEY_LENGTH]"
)]
pub struct SchnorrPublicKey {
    bytes: [u8; SCHNORR_KEY_LENGTH],
}

impl SchnorrPublicKey {
    /// Parse and validate an x-only point.
    pub fn from_bytes(bytes: [u8; SCHNORR_KEY_LENGTH]) -> Result<Self, SchnorrError> {
        XOnlyPublicKey::from_slice(&bytes).map_err(|_| SchnorrError::InvalidPublicKey)?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; SCHNORR_KEY_LENGTH] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Verify `signature` over `message`.
    pub fn verify(&self, message: &[u8], signature: &SchnorrSignature) -> bool {
        let Ok(public) = XOnlyPublicKey::from_slice(&self.bytes) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(&signature.bytes) else {
            return false;
        };
        secp()
            .verify_schnorr(&signature, &message_for(message), &public)
            .is_ok()
    }

    /// Verify a signature that arrived as raw bytes off the wire.
    ///
    /// Wrong-length input is simply an invalid signature.
    pub fn verify_bytes(&self, message: &[u8], signature: &[u8]) -> bool {
        match SchnorrSignature::from_slice(signature) {
            Ok(sig) => self.verify(message, &sig),
            Err(_) => false,
        }
    }
}

impl TryFrom<[u8; SCHNORR_KEY_LENGTH]> for SchnorrPublicKey {
    type Error = SchnorrError;

    fn try_from(bytes: [u8; SCHNORR_KEY_LENGTH]) -> Result<Self, Self::Error> {
        Self::from_bytes(bytes)
    }
}

impl From<SchnorrPublicKey> for [u8; SCHNORR_KEY_LENGTH] {
    fn from(key: SchnorrPublicKey) -> Self {
        key.bytes
    }
}

impl fmt::Debug for SchnorrPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SchnorrPublicKey({}...)", &self.to_hex()[..12])
    }
}

// ---------------------------------------------------------------------------
// SchnorrSignature
// ---------------------------------------------------------------------------

/// `R.x || s`, always 64 bytes.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SchnorrSignature {
    bytes: [u8; SCHNORR_SIGNATURE_LENGTH],
}

impl SchnorrSignature {
    pub fn from_bytes(bytes: [u8; SCHNORR_SIGNATURE_LENGTH]) -> Self {
        Self { bytes }
    }

    /// Length-checked parse.
    pub fn from_slice(slice: &[u8]) -> Result<Self, SchnorrError> {
        let bytes: [u8; SCHNORR_SIGNATURE_LENGTH] = slice
            .try_into()
            .map_err(|_| SchnorrError::InvalidSignatureLength(slice.len()))?;
        Ok(Self { bytes })
    }

    pub fn to_bytes(&self) -> [u8; SCHNORR_SIGNATURE_LENGTH] {
        self.bytes
    }

    pub fn as_bytes(&self) -> &[u8; SCHNORR_SIGNATURE_LENGTH] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl fmt::Debug for SchnorrSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SchnorrSignature({}...)", &self.to_hex()[..16])
    }
}
