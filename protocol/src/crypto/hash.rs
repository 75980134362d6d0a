//! # Hashing Utilities
//!
//! Two families of hash live here, and they are not interchangeable:
//!
//! - **Poseidon** over the BN254 scalar field. Arithmetic-domain sponge used
//!   for everything that must be reproduced bit-for-bit by two parties:
//!   authorization digests, addresses, delegated authorization hashes and
//!   nullifiers. Inputs and outputs are field elements.
//!
//! - **BLAKE3** for byte-oriented work: key derivation, transaction hashes,
//!   and mapping arbitrary bytes into the field.
//!
//! ## Poseidon parameters
//!
//! Width 5 (rate 4, capacity 1), `α = 5`, 8 full rounds, 60 partial rounds.
//! Round constants and the MDS matrix come from the Grain LFSR, exactly as
//! the reference parameter generation does. They are computed once per
//! process and cached.

use std::sync::OnceLock;

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::poseidon::{
    find_poseidon_ark_and_mds, PoseidonConfig, PoseidonSponge,
};
use ark_crypto_primitives::sponge::{CryptographicSponge, FieldBasedCryptographicSponge};
use ark_ff::{BigInteger, PrimeField};

use crate::config::{
    FIELD_ELEMENT_LENGTH, HASH_OUTPUT_LENGTH, POSEIDON_ALPHA, POSEIDON_CAPACITY, POSEIDON_FULL_ROUNDS,
    POSEIDON_PARTIAL_ROUNDS, POSEIDON_RATE,
};

/// Lazily built Poseidon parameters shared by every hash in the process.
fn poseidon_config() -> &'static PoseidonConfig<Fr> {
    static CONFIG: OnceLock<PoseidonConfig<Fr>> = OnceLock::new();
    CONFIG.get_or_init(|| {
        let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
            Fr::MODULUS_BIT_SIZE as u64,
            POSEIDON_RATE,
            POSEIDON_FULL_ROUNDS as u64,
            POSEIDON_PARTIAL_ROUNDS as u64,
            0,
        );
        PoseidonConfig::new(
            POSEIDON_FULL_ROUNDS,
            POSEIDON_PARTIAL_ROUNDS,
            POSEIDON_ALPHA,
            mds,
            ark,
            POSEIDON_RATE,
            POSEIDON_CAPACITY,
        )
    })
}

/// Hash a sequence of field elements with the Poseidon sponge.
///
/// Elements are absorbed in order and a single element is squeezed. Order
/// matters and there is no implicit length prefix, so callers that hash
/// variable-length data should use [`poseidon_hash_with_separator`].
///
/// # Example
///
/// ```
/// use ark_bn254::Fr;
/// use veil_protocol::crypto::hash::poseidon_hash;
///
/// let a = poseidon_hash(&[Fr::from(1u64), Fr::from(2u64)]);
/// let b = poseidon_hash(&[Fr::from(1u64), Fr::from(2u64)]);
/// assert_eq!(a, b);
/// ```
pub fn poseidon_hash(inputs: &[Fr]) -> Fr {
    let mut sponge = PoseidonSponge::<Fr>::new(poseidon_config());
    let elements: Vec<Fr> = inputs.to_vec();
    sponge.absorb(&elements);
    sponge.squeeze_native_field_elements(1)[0]
}

/// Poseidon with a leading domain separator element.
///
/// `poseidon_hash_with_separator(&xs, s) == poseidon_hash(&[s, xs...])`.
/// Different protocol objects (addresses, authorization hashes, nullifiers)
/// each get their own separator from [`crate::config`].
pub fn poseidon_hash_with_separator(inputs: &[Fr], separator: u32) -> Fr {
    let mut elements = Vec::with_capacity(inputs.len() + 1);
    elements.push(Fr::from(separator as u64));
    elements.extend_from_slice(inputs);
    poseidon_hash(&elements)
}

/// Serialize a field element as 32 big-endian bytes.
pub fn field_to_bytes(value: &Fr) -> [u8; FIELD_ELEMENT_LENGTH] {
    let be = value.into_bigint().to_bytes_be();
    let mut out = [0u8; FIELD_ELEMENT_LENGTH];
    // BigInteger256 always yields 32 bytes; the offset only guards against
    // a narrower representation.
    out[FIELD_ELEMENT_LENGTH - be.len()..].copy_from_slice(&be);
    out
}

/// Parse 32 big-endian bytes as a field element.
///
/// Returns `None` unless the bytes are the canonical encoding, i.e. the
/// integer is below the field modulus. Accepting non-canonical encodings
/// would give two byte strings the same field value.
pub fn field_from_canonical_bytes(bytes: &[u8; FIELD_ELEMENT_LENGTH]) -> Option<Fr> {
    let value = Fr::from_be_bytes_mod_order(bytes);
    (field_to_bytes(&value) == *bytes).then_some(value)
}

/// Split 32 arbitrary bytes into two 128-bit limbs `[hi, lo]`.
///
/// Injective, unlike reducing 256 bits mod a 254-bit prime. Used to feed
/// public keys (X25519, Ed25519, x-only secp256k1) into Poseidon.
pub fn bytes_to_fields(bytes: &[u8; 32]) -> [Fr; 2] {
    let mut hi = [0u8; 16];
    let mut lo = [0u8; 16];
    hi.copy_from_slice(&bytes[..16]);
    lo.copy_from_slice(&bytes[16..]);
    [
        Fr::from(u128::from_be_bytes(hi)),
        Fr::from(u128::from_be_bytes(lo)),
    ]
}

/// Compute the BLAKE3 hash of the input data.
pub fn blake3_hash(data: &[u8]) -> [u8; HASH_OUTPUT_LENGTH] {
    *blake3::hash(data).as_bytes()
}

/// Hash multiple byte slices together without concatenation overhead.
pub fn blake3_hash_multi(parts: &[&[u8]]) -> [u8; HASH_OUTPUT_LENGTH] {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

/// Domain-separated BLAKE3 using `derive_key` mode.
///
/// `context` should be a hardcoded, globally unique string; see the
/// `*_CONTEXT` constants in [`crate::config`].
pub fn domain_separated_hash(context: &str, data: &[u8]) -> [u8; HASH_OUTPUT_LENGTH] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    hasher.update(data);
    *hasher.finalize().as_bytes()
}

/// Map arbitrary bytes to a field element (BLAKE3, then reduce mod r).
///
/// The bias from reducing 256 bits into a ~254-bit field is negligible.
pub fn hash_to_field(data: &[u8]) -> Fr {
    Fr::from_le_bytes_mod_order(&blake3_hash(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::{UniformRand, Zero};
    use rand::rngs::OsRng;

    #[test]
    fn poseidon_deterministic() {
        let inputs = [Fr::from(7u64), Fr::from(11u64), Fr::from(13u64), Fr::from(2u64)];
        assert_eq!(poseidon_hash(&inputs), poseidon_hash(&inputs));
    }

    #[test]
    fn poseidon_order_matters() {
        let a = poseidon_hash(&[Fr::from(1u64), Fr::from(2u64)]);
        let b = poseidon_hash(&[Fr::from(2u64), Fr::from(1u64)]);
        assert_ne!(a, b);
    }

    #[test]
    fn poseidon_last_element_changes_output() {
        // The action tag sits in the last slot of the authorization preimage;
        // it must influence the digest.
        let base = [Fr::from(99u64), Fr::from(1_000u64), Fr::from(0u64)];
        let mut one = base.to_vec();
        one.push(Fr::from(1u64));
        let mut two = base.to_vec();
        two.push(Fr::from(2u64));
        assert_ne!(poseidon_hash(&one), poseidon_hash(&two));
    }

    #[test]
    fn poseidon_output_is_not_trivial() {
        assert!(!poseidon_hash(&[Fr::zero()]).is_zero());
    }

    #[test]
    fn separator_equals_prefixed_hash() {
        let xs = [Fr::from(5u64), Fr::from(6u64)];
        let expected = poseidon_hash(&[Fr::from(42u64), xs[0], xs[1]]);
        assert_eq!(poseidon_hash_with_separator(&xs, 42), expected);
        assert_ne!(poseidon_hash_with_separator(&xs, 43), expected);
    }

    #[test]
    fn field_bytes_roundtrip_canonical() {
        let value = Fr::rand(&mut OsRng);
        let bytes = field_to_bytes(&value);
        assert_eq!(field_from_canonical_bytes(&bytes), Some(value));
    }

    #[test]
    fn field_bytes_are_big_endian() {
        let bytes = field_to_bytes(&Fr::from(0x0102u64));
        assert_eq!(bytes[30], 0x01);
        assert_eq!(bytes[31], 0x02);
        assert!(bytes[..30].iter().all(|b| *b == 0));
    }

    #[test]
    fn non_canonical_bytes_rejected() {
        // 0xFF..FF is far above the BN254 modulus.
        assert!(field_from_canonical_bytes(&[0xFF; 32]).is_none());
    }

    #[test]
    fn bytes_to_fields_is_injective_on_high_bits() {
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        a[0] = 1;
        b[16] = 1;
        assert_ne!(bytes_to_fields(&a), bytes_to_fields(&b));
    }

    #[test]
    fn blake3_multi_matches_concatenation() {
        assert_eq!(
            blake3_hash_multi(&[b"hello", b" world"]),
            blake3_hash(b"hello world")
        );
    }

    #[test]
    fn domain_separation() {
        let data = b"same data";
        assert_ne!(
            domain_separated_hash("context-a", data),
            domain_separated_hash("context-b", data)
        );
    }

    #[test]
    fn hash_to_field_deterministic() {
        assert_eq!(hash_to_field(b"escrow"), hash_to_field(b"escrow"));
        assert_ne!(hash_to_field(b"escrow"), hash_to_field(b"token"));
    }
}
