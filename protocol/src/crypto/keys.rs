//! # Account Signing Keys
//!
//! Ed25519 keypairs that authenticate *accounts*: the key a wallet uses to
//! sign delegated transfer authorizations. Escrow owner countersignatures use
//! Schnorr (see [`super::schnorr`]) and never touch this module.
//!
//! Key bytes are never logged. `Debug` prints only the public half.

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::config::SIGNATURE_LENGTH;

/// Errors that can occur during key operations.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key bytes")]
    InvalidSecretKey,

    #[error("invalid public key bytes: not a valid Ed25519 point")]
    InvalidPublicKey,
}

/// An account's Ed25519 signing key.
///
/// Intentionally not `Serialize`. Use [`to_bytes`](Self::to_bytes) /
/// [`from_seed`](Self::from_seed) explicitly.
pub struct AccountKeypair {
    signing_key: SigningKey,
}

/// The public half of an account key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountPublicKey {
    bytes: [u8; 32],
}

/// An Ed25519 signature. Always 64 bytes.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct AccountSignature {
    bytes: [u8; SIGNATURE_LENGTH],
}

impl AccountKeypair {
    /// Generate a fresh keypair using the OS cryptographic RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Construct a keypair deterministically from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Parse a hex-encoded seed.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str).map_err(|_| KeyError::InvalidSecretKey)?;
        let seed: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self::from_seed(&seed))
    }

    pub fn public_key(&self) -> AccountPublicKey {
        AccountPublicKey {
            bytes: self.signing_key.verifying_key().to_bytes(),
        }
    }

    /// Sign a message. Deterministic per RFC 8032.
    pub fn sign(&self, message: &[u8]) -> AccountSignature {
        AccountSignature {
            bytes: self.signing_key.sign(message).to_bytes(),
        }
    }

    /// Raw seed bytes. Don't log them.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl Clone for AccountKeypair {
    fn clone(&self) -> Self {
        Self::from_seed(&self.signing_key.to_bytes())
    }
}

impl fmt::Debug for AccountKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountKeypair(pub={})", self.public_key().to_hex())
    }
}

impl AccountPublicKey {
    /// Validate and wrap raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, KeyError> {
        VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Verify a signature. A yes/no answer is all callers need.
    pub fn verify(&self, message: &[u8], signature: &AccountSignature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.bytes) else {
            return false;
        };
        let sig = DalekSignature::from_bytes(&signature.bytes);
        verifying_key.verify_strict(message, &sig).is_ok()
    }
}

impl fmt::Debug for AccountPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountPublicKey({}...)", &self.to_hex()[..12])
    }
}

impl AccountSignature {
    pub fn from_bytes(bytes: [u8; SIGNATURE_LENGTH]) -> Self {
        Self { bytes }
    }

    pub fn to_bytes(&self) -> [u8; SIGNATURE_LENGTH] {
        self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl fmt::Debug for AccountSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountSignature({}...)", &self.to_hex()[..16])
    }
}
