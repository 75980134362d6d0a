//! # Cryptographic Primitives for Veil
//!
//! - **Poseidon** (BN254 scalar field) for digests that two parties must
//!   reproduce exactly: authorization messages, addresses, nullifiers.
//! - **BIP-340 Schnorr over secp256k1** for owner countersignatures.
//! - **Ed25519** for account signatures on delegated authorizations.
//! - **X25519 + AES-256-GCM** for sealed private-state notes.
//! - **BLAKE3** for key derivation and byte hashing.
//!
//! Everything here is a thin wrapper around audited implementations.

pub mod encryption;
pub mod hash;
pub mod keys;
pub mod note_encryption;
pub mod schnorr;

pub use encryption::EncryptionError;
pub use hash::{blake3_hash, field_to_bytes, hash_to_field, poseidon_hash};
pub use keys::{AccountKeypair, AccountPublicKey, AccountSignature};
pub use note_encryption::{SealedNote, ViewingPublicKey, ViewingSecretKey};
pub use schnorr::{SchnorrPublicKey, SchnorrSecretKey, SchnorrSignature};
