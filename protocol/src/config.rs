//! # Protocol Configuration & Constants
//!
//! Every magic number in Veil lives here. Field widths, hash separators,
//! Poseidon round counts, action tags. If two parties disagree on any of
//! these, signatures stop verifying and notes stop decrypting, so treat
//! this file as wire format.
//!
//! Runtime knobs that are allowed to differ between deployments live in
//! [`NodeConfig`].

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// The full version string.
pub const PROTOCOL_VERSION: &str = "0.1.0";

/// Default chain identifier for in-process environments.
pub const DEFAULT_CHAIN_ID: u32 = 0x5645_494C; // "VEIL"

// ---------------------------------------------------------------------------
// Field & Hash Parameters
// ---------------------------------------------------------------------------

/// Serialized width of a field element, big-endian.
pub const FIELD_ELEMENT_LENGTH: usize = 32;

/// Poseidon sponge rate (field elements absorbed per permutation).
pub const POSEIDON_RATE: usize = 4;

/// Poseidon sponge capacity.
pub const POSEIDON_CAPACITY: usize = 1;

/// S-box exponent. 5 is the smallest `α` with `gcd(α, p - 1) = 1` for BN254.
pub const POSEIDON_ALPHA: u64 = 5;

/// Full rounds (split evenly before and after the partial rounds).
pub const POSEIDON_FULL_ROUNDS: usize = 8;

/// Partial rounds for width 5 over a 254-bit field at 128-bit security.
pub const POSEIDON_PARTIAL_ROUNDS: usize = 60;

/// Output length of the BLAKE3 helpers in [`crate::crypto::hash`].
pub const HASH_OUTPUT_LENGTH: usize = 32;

// Domain separators prepended to multi-purpose Poseidon hashes. The escrow
// authorization digest deliberately has none: its preimage is fixed at four
// elements and the action tag already separates the two signed actions.

/// Separator for `public_keys_hash`.
pub const SEPARATOR_PUBLIC_KEYS: u32 = 0x0100;

/// Separator for salted initialization hashes.
pub const SEPARATOR_SALTED_INITIALIZATION: u32 = 0x0101;

/// Separator for constructor argument hashes.
pub const SEPARATOR_INITIALIZATION: u32 = 0x0102;

/// Separator for partial addresses.
pub const SEPARATOR_PARTIAL_ADDRESS: u32 = 0x0103;

/// Separator for contract and account addresses.
pub const SEPARATOR_ADDRESS: u32 = 0x0104;

/// Separator for delegated transfer authorization message hashes.
pub const SEPARATOR_AUTHWIT_MESSAGE: u32 = 0x0200;

/// Separator for delegated transfer authorization nullifiers.
pub const SEPARATOR_AUTHWIT_NULLIFIER: u32 = 0x0201;

// ---------------------------------------------------------------------------
// Signed Actions
// ---------------------------------------------------------------------------

/// Action tag for `change_spend_limit_by_signature`.
pub const ACTION_TAG_SPEND_LIMIT: u64 = 1;

/// Action tag for `withdraw_by_signature`.
pub const ACTION_TAG_WITHDRAW: u64 = 2;

// ---------------------------------------------------------------------------
// Signature & Key Parameters
// ---------------------------------------------------------------------------

/// BIP-340 Schnorr signature length: `R.x` (32) followed by `s` (32).
pub const SCHNORR_SIGNATURE_LENGTH: usize = 64;

/// secp256k1 secret keys and x-only public keys are both 32 bytes.
pub const SCHNORR_KEY_LENGTH: usize = 32;

/// Prefix hashed with the message before BIP-340 signing.
pub const SCHNORR_MESSAGE_CONTEXT: &[u8] = b"veil/escrow-authorization";

/// Ed25519 signature length.
pub const SIGNATURE_LENGTH: usize = 64;

/// Account master secret length.
pub const ACCOUNT_SECRET_LENGTH: usize = 32;

/// AES-256-GCM key length in bytes.
pub const AES_KEY_LENGTH: usize = 32;

/// AES-256-GCM nonce length in bytes. Twelve. Not sixteen.
pub const AES_NONCE_LENGTH: usize = 12;

/// AES-256-GCM authentication tag length in bytes.
pub const AES_TAG_LENGTH: usize = 16;

/// BLAKE3 `derive_key` context for viewing secrets.
pub const VIEWING_KEY_CONTEXT: &str = "veil 2026-01 account viewing key";

/// BLAKE3 `derive_key` context for note encryption keys.
pub const NOTE_KEY_CONTEXT: &str = "veil 2026-01 note encryption key";

// ---------------------------------------------------------------------------
// Runtime Configuration
// ---------------------------------------------------------------------------

/// Per-deployment settings for an in-process [`Node`](crate::environment::Node).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Chain identifier mixed into transaction hashes.
    pub chain_id: u32,
    /// Protocol version reported by the node.
    pub protocol_version: String,
    /// Block number of the first transaction.
    pub genesis_block: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            protocol_version: PROTOCOL_VERSION.to_string(),
            genesis_block: 1,
        }
    }
}

impl NodeConfig {
    /// Parse a configuration from JSON. Missing fields fall back to defaults.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
