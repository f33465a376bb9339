//! Forculus threshold encryption: a Shamir-secret-sharing scheme where the
//! shared secret is an encryption key for the plaintext value itself. Any
//! `threshold` independent observations of the same value let the analyzer
//! reconstruct the key and decrypt; fewer reveal nothing (information
//! theoretically, per the field arithmetic below). Reconstruction is the
//! server-side analyzer's job and explicitly out of scope here; this
//! module only ever produces shares.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Nonce,
};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;

use crate::status::{Status, StatusCode};

/// A Mersenne prime just under 2^61, large enough that field elements don't
/// wrap u64 arithmetic when widened to u128 for multiplication.
const FIELD_MODULUS: u64 = (1u64 << 61) - 1;

const NONCE_LEN: usize = 12;

pub struct ForculusEncoder {
    threshold: u32,
}

/// The two public outputs of one Forculus encoding.
pub struct ForculusShare {
    pub ciphertext: Vec<u8>,
    pub point_x: Vec<u8>,
    pub point_y: Vec<u8>,
}

impl ForculusEncoder {
    pub fn new(threshold: u32) -> Result<Self, Status> {
        if threshold < 2 {
            return Err(Status::new(
                StatusCode::InvalidConfig,
                "forculus threshold must be at least 2",
            ));
        }
        Ok(Self { threshold })
    }

    /// Encodes `value` as one point on the value's deterministic polynomial,
    /// encrypted with the polynomial's constant term as key.
    pub fn encode(&self, value: &[u8]) -> Result<ForculusShare, Status> {
        let coefficients = derive_coefficients(value, self.threshold);
        let x = random_field_element();
        let y = evaluate(&coefficients, x);

        let key = derive_aead_key(coefficients[0]);
        let cipher = ChaCha20Poly1305::new((&key).into());

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, Payload { msg: value, aad: &[] })
            .map_err(|_| Status::new(StatusCode::Other, "forculus encryption failed"))?;

        let mut framed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        framed.extend_from_slice(&nonce_bytes);
        framed.extend_from_slice(&ciphertext);

        Ok(ForculusShare {
            ciphertext: framed,
            point_x: x.to_be_bytes().to_vec(),
            point_y: y.to_be_bytes().to_vec(),
        })
    }
}

/// Degree-`threshold - 1` polynomial coefficients, deterministic in `value`
/// so that every device encoding the same value lands points on the same
/// curve. `coefficients[0]` is the key; `coefficients[1..]` are the
/// remaining terms.
fn derive_coefficients(value: &[u8], threshold: u32) -> Vec<u64> {
    (0..threshold)
        .map(|i| hash_to_field(value, i))
        .collect()
}

fn hash_to_field(value: &[u8], index: u32) -> u64 {
    use sha2::Digest;
    let mut hasher = Sha256::new();
    hasher.update(b"cobalt.forculus.coefficient");
    hasher.update(index.to_le_bytes());
    hasher.update(value);
    let digest: [u8; 32] = hasher.finalize().into();
    u64::from_be_bytes(digest[0..8].try_into().expect("8 bytes")) % FIELD_MODULUS
}

fn random_field_element() -> u64 {
    loop {
        let mut bytes = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut bytes);
        let candidate = u64::from_be_bytes(bytes) % FIELD_MODULUS;
        if candidate != 0 {
            return candidate;
        }
    }
}

fn evaluate(coefficients: &[u64], x: u64) -> u64 {
    coefficients
        .iter()
        .rev()
        .fold(0u64, |acc, coefficient| {
            let widened = (acc as u128 * x as u128 + *coefficient as u128) % FIELD_MODULUS as u128;
            widened as u64
        })
}

fn derive_aead_key(constant_term: u64) -> [u8; 32] {
    let hk = Hkdf::<Sha256>::new(None, &constant_term.to_be_bytes());
    let mut key = [0u8; 32];
    hk.expand(b"cobalt.forculus.aead-key", &mut key)
        .expect("32 bytes is a valid HKDF output length");
    key
}

#[cfg(test)]
mod test {
    use super::*;

    #[test_log::test]
    fn same_value_shares_a_polynomial() {
        let encoder = ForculusEncoder::new(3).expect("valid threshold");
        let a = encoder.encode(b"Banana").expect("encodes");
        let b = encoder.encode(b"Banana").expect("encodes");
        // Different random x (overwhelmingly likely), but evaluating the
        // deterministic polynomial at a's x should reproduce a's y even
        // from a fresh encoding pass.
        let coefficients = derive_coefficients(b"Banana", 3);
        let x = u64::from_be_bytes(a.point_x.clone().try_into().expect("8 bytes"));
        let y = u64::from_be_bytes(a.point_y.clone().try_into().expect("8 bytes"));
        assert_eq!(evaluate(&coefficients, x), y);
        assert_ne!(a.point_x, b.point_x, "points should be independently random");
    }

    #[test_log::test]
    fn different_values_yield_different_keys() {
        let encoder = ForculusEncoder::new(2).expect("valid threshold");
        let a = derive_coefficients(b"Apple", 2)[0];
        let b = derive_coefficients(b"Banana", 2)[0];
        assert_ne!(a, b);
        let _ = encoder.encode(b"Apple").expect("encodes");
    }

    #[test_log::test]
    fn rejects_threshold_below_two() {
        assert_eq!(
            ForculusEncoder::new(1).unwrap_err().code(),
            StatusCode::InvalidConfig
        );
    }

    #[test_log::test]
    fn ciphertext_is_not_the_plaintext() {
        let encoder = ForculusEncoder::new(5).expect("valid threshold");
        let share = encoder.encode(b"Cantaloupe").expect("encodes");
        assert_ne!(share.ciphertext, b"Cantaloupe");
        assert!(share.ciphertext.len() > NONCE_LEN);
    }
}
