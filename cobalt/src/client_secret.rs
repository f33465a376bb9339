//! The per-device secret that seeds cohort assignment and permanent
//! randomized response (PRR) masks.

use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A 128-bit secret created once per device and held for its lifetime.
///
/// Never serialized into an observation or envelope; only its deterministic
/// derivatives (cohort index, PRR mask) leave the device. Wiped on drop so a
/// stale copy doesn't linger in freed memory.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ClientSecret([u8; 16]);

impl ClientSecret {
    /// Generate a fresh secret from a cryptographic RNG. Call once per
    /// device and persist the bytes; regenerating the secret resets cohort
    /// assignment and PRR masks.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Deterministically derives a value in `[0, num_cohorts)` for String
    /// RAPPOR cohort assignment. The same secret always yields the same
    /// cohort for a given `num_cohorts`, across every metric that uses
    /// String RAPPOR with that cohort count.
    pub fn cohort(&self, num_cohorts: u32) -> u32 {
        if num_cohorts == 0 {
            return 0;
        }
        let digest = self.derive(b"cobalt.rappor.cohort", &num_cohorts.to_le_bytes());
        (u32::from_le_bytes(digest[0..4].try_into().expect("4 bytes")) % num_cohorts) as u32
    }

    /// Derives a deterministic pseudorandom mask used as the permanent
    /// randomized response for `value` under RAPPOR encoding. The PRR must
    /// be stable for the lifetime of the client secret and the value: this
    /// is what "permanent" means in PRR.
    ///
    /// Returns `num_bits` pseudorandom bits, one per output byte (lowest bit
    /// of each byte significant), suitable for driving independent PRR
    /// coin-flips per Bloom-filter position.
    pub fn prr_mask(&self, context: &[u8], num_bits: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(num_bits);
        let mut counter: u32 = 0;
        while out.len() < num_bits {
            let digest = self.derive(b"cobalt.rappor.prr", &[context, &counter.to_le_bytes()].concat());
            out.extend_from_slice(&digest);
            counter += 1;
        }
        out.truncate(num_bits);
        out
    }

    fn derive(&self, domain: &[u8], input: &[u8]) -> [u8; 32] {
        let hk = Hkdf::<Sha256>::new(Some(domain), &self.0);
        let mut out = [0u8; 32];
        hk.expand(input, &mut out).expect("32 bytes is a valid HKDF output length");
        out
    }
}

impl std::fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ClientSecret(..)")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test_log::test]
    fn cohort_is_deterministic_and_in_range() {
        let secret = ClientSecret::from_bytes([7; 16]);
        let cohort_a = secret.cohort(20);
        let cohort_b = secret.cohort(20);
        assert_eq!(cohort_a, cohort_b);
        assert!(cohort_a < 20);
    }

    #[test_log::test]
    fn different_secrets_can_yield_different_cohorts() {
        let a = ClientSecret::from_bytes([1; 16]);
        let b = ClientSecret::from_bytes([2; 16]);
        // Not a strict inequality assertion (collisions are legal), just
        // confirms the derivation actually depends on the secret bytes.
        assert_ne!(a.prr_mask(b"x", 32), b.prr_mask(b"x", 32));
    }

    #[test_log::test]
    fn prr_mask_is_stable_for_same_value() {
        let secret = ClientSecret::from_bytes([9; 16]);
        let first = secret.prr_mask(b"Banana", 128);
        let second = secret.prr_mask(b"Banana", 128);
        assert_eq!(first, second);
        assert_eq!(first.len(), 128);
    }

    #[test_log::test]
    fn prr_mask_differs_across_values() {
        let secret = ClientSecret::from_bytes([9; 16]);
        assert_ne!(secret.prr_mask(b"Banana", 64), secret.prr_mask(b"Apple", 64));
    }
}
