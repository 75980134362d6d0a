//! # Addresses and Account Keys
//!
//! Every account and contract is identified by an [`Address`]: a BN254
//! field element, printed as `0x`-prefixed big-endian hex. Being a field
//! element is what lets an address go straight into a Poseidon preimage
//! (the escrow address is the first element of every authorization digest).
//!
//! An address commits to two things:
//!
//! ```text
//! address = Poseidon(SEP_ADDRESS, public_keys_hash, partial_address)
//! ```
//!
//! `public_keys_hash` comes from the account's keys (see [`AccountSecret`]);
//! `partial_address` comes from how the contract was instantiated (see
//! [`super::instance`]). Knowing the partial address plus the secret is
//! exactly what a party needs to register an account in its PXE.

use ark_bn254::Fr;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::IdentityError;
use crate::config::{
    ACCOUNT_SECRET_LENGTH, FIELD_ELEMENT_LENGTH, SEPARATOR_ADDRESS, SEPARATOR_PUBLIC_KEYS,
    VIEWING_KEY_CONTEXT,
};
use crate::crypto::hash::{
    bytes_to_fields, domain_separated_hash, field_from_canonical_bytes, field_to_bytes,
    poseidon_hash_with_separator,
};
use crate::crypto::note_encryption::{ViewingPublicKey, ViewingSecretKey};

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A canonical field-element address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; FIELD_ELEMENT_LENGTH]);

impl Address {
    /// The zero address. Used as the deployer of account contracts.
    pub const ZERO: Address = Address([0u8; FIELD_ELEMENT_LENGTH]);

    pub fn from_field(value: Fr) -> Self {
        Self(field_to_bytes(&value))
    }

    /// The address as a field element. Infallible: the bytes are canonical
    /// by construction.
    pub fn to_field(&self) -> Fr {
        use ark_ff::PrimeField;
        Fr::from_be_bytes_mod_order(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8; FIELD_ELEMENT_LENGTH] {
        &self.0
    }

    /// Parse `0x`-prefixed (or bare) big-endian hex.
    pub fn from_hex(s: &str) -> Result<Self, IdentityError> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|e| IdentityError::InvalidHex(e.to_string()))?;
        let arr: [u8; FIELD_ELEMENT_LENGTH] =
            bytes
                .as_slice()
                .try_into()
                .map_err(|_| IdentityError::InvalidLength {
                    expected: FIELD_ELEMENT_LENGTH,
                    got: bytes.len(),
                })?;
        field_from_canonical_bytes(&arr).ok_or(IdentityError::NonCanonical)?;
        Ok(Self(arr))
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({}...)", &self.to_hex()[..10])
    }
}

impl FromStr for Address {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// An account's master secret. Everything else is derived from it.
///
/// For an escrow this is the "owner secret" handed back at deployment;
/// whoever holds it can read the escrow's private state.
#[derive(Clone, PartialEq, Eq)]
pub struct AccountSecret([u8; ACCOUNT_SECRET_LENGTH]);

impl AccountSecret {
    pub fn random() -> Self {
        let mut bytes = [0u8; ACCOUNT_SECRET_LENGTH];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; ACCOUNT_SECRET_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn to_bytes(&self) -> [u8; ACCOUNT_SECRET_LENGTH] {
        self.0
    }

    /// Derive the decryption material for this account.
    pub fn derive_keys(&self) -> AccountKeys {
        AccountKeys {
            viewing: ViewingSecretKey::from_bytes(domain_separated_hash(
                VIEWING_KEY_CONTEXT,
                &self.0,
            )),
        }
    }
}

impl fmt::Debug for AccountSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccountSecret(<redacted>)")
    }
}

/// Decryption material derived from an [`AccountSecret`].
#[derive(Clone, Debug)]
pub struct AccountKeys {
    viewing: ViewingSecretKey,
}

impl AccountKeys {
    pub fn viewing_key(&self) -> &ViewingSecretKey {
        &self.viewing
    }

    pub fn public_keys(&self) -> PublicKeys {
        PublicKeys {
            viewing_key: self.viewing.public_key(),
        }
    }
}

/// The published half of an account's keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKeys {
    /// Notes for this account are sealed to this key.
    pub viewing_key: ViewingPublicKey,
}

impl PublicKeys {
    /// `Poseidon(SEP_PUBLIC_KEYS, viewing_hi, viewing_lo)`.
    pub fn hash(&self) -> Fr {
        poseidon_hash_with_separator(
            &bytes_to_fields(self.viewing_key.as_bytes()),
            SEPARATOR_PUBLIC_KEYS,
        )
    }
}

/// Combine a public keys hash with a partial address.
pub fn compute_address(public_keys: &PublicKeys, partial_address: Fr) -> Address {
    Address::from_field(poseidon_hash_with_separator(
        &[public_keys.hash(), partial_address],
        SEPARATOR_ADDRESS,
    ))
}
