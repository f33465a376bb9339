//! String RAPPOR and Basic RAPPOR randomized-response encoding.
//!
//! Both variants apply the same permanent randomized response (PRR) rule to
//! a real bit vector: flip a zero bit to one with probability `p`, keep a
//! one bit as one with probability `q`. "Permanent" means the flip outcome
//! for a given (client secret, value) pair is fixed forever rather than
//! redrawn per report — implemented here by deriving every coin flip from
//! [`ClientSecret::prr_mask`] instead of a fresh RNG, which is what makes
//! `p=0, q=1` fully deterministic.

use crate::client_secret::ClientSecret;
use crate::registry::RapporParams;
use crate::status::{Status, StatusCode};

/// Applies the Bloom filter + cohort-assignment stage of String RAPPOR.
pub struct RapporEncoder<'a> {
    params: &'a RapporParams,
}

pub struct RapporShare {
    pub cohort: u32,
    pub data: Vec<u8>,
}

impl<'a> RapporEncoder<'a> {
    pub fn new(params: &'a RapporParams) -> Result<Self, Status> {
        validate(params)?;
        Ok(Self { params })
    }

    pub fn encode(&self, client_secret: &ClientSecret, value: &str) -> Result<RapporShare, Status> {
        let cohort = client_secret.cohort(self.params.num_cohorts);
        let mut bits = vec![false; self.params.num_bloom_bits as usize];
        for hash_index in 0..self.params.num_hashes {
            let position = bloom_position(cohort, hash_index, value, self.params.num_bloom_bits);
            bits[position as usize] = true;
        }

        let noised = apply_prr(client_secret, value.as_bytes(), &bits, self.params.probability_p, self.params.probability_q);
        Ok(RapporShare {
            cohort,
            data: pack_bits(&noised),
        })
    }
}

/// Basic (categorical) RAPPOR: one-hot over a fixed category list, no
/// cohorts.
pub struct BasicRapporEncoder<'a> {
    params: &'a RapporParams,
}

impl<'a> BasicRapporEncoder<'a> {
    pub fn new(params: &'a RapporParams) -> Result<Self, Status> {
        if params.categories.is_empty() {
            return Err(Status::new(
                StatusCode::InvalidConfig,
                "basic rappor report has no categories",
            ));
        }
        validate_probabilities(params.probability_p, params.probability_q)?;
        Ok(Self { params })
    }

    pub fn encode(&self, client_secret: &ClientSecret, value: &str) -> Result<Vec<u8>, Status> {
        let index = self
            .params
            .categories
            .iter()
            .position(|category| category == value)
            .ok_or_else(|| {
                Status::new(
                    StatusCode::InvalidArguments,
                    format!("{value} is not one of the configured categories"),
                )
            })?;

        let mut bits = vec![false; self.params.categories.len()];
        bits[index] = true;

        let noised = apply_prr(client_secret, value.as_bytes(), &bits, self.params.probability_p, self.params.probability_q);
        Ok(pack_bits(&noised))
    }
}

fn validate(params: &RapporParams) -> Result<(), Status> {
    validate_probabilities(params.probability_p, params.probability_q)?;
    if params.num_bloom_bits == 0 || params.num_hashes == 0 || params.num_cohorts == 0 {
        return Err(Status::new(
            StatusCode::InvalidConfig,
            "rappor config has a zero-valued parameter",
        ));
    }
    Ok(())
}

fn validate_probabilities(p: f64, q: f64) -> Result<(), Status> {
    if !(0.0..=1.0).contains(&p) || !(0.0..=1.0).contains(&q) {
        return Err(Status::new(
            StatusCode::InvalidConfig,
            "rappor probabilities must be within [0, 1]",
        ));
    }
    Ok(())
}

fn bloom_position(cohort: u32, hash_index: u32, value: &str, num_bits: u32) -> u32 {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(b"cobalt.rappor.bloom");
    hasher.update(cohort.to_le_bytes());
    hasher.update(hash_index.to_le_bytes());
    hasher.update(value.as_bytes());
    let digest: [u8; 32] = hasher.finalize().into();
    u32::from_be_bytes(digest[0..4].try_into().expect("4 bytes")) % num_bits
}

fn apply_prr(client_secret: &ClientSecret, value: &[u8], real_bits: &[bool], p: f64, q: f64) -> Vec<bool> {
    let mask = client_secret.prr_mask(value, real_bits.len());
    real_bits
        .iter()
        .zip(mask.iter())
        .map(|(&bit, &random_byte)| {
            let uniform = random_byte as f64 / 256.0;
            if bit {
                uniform < q
            } else {
                uniform < p
            }
        })
        .collect()
}

fn pack_bits(bits: &[bool]) -> Vec<u8> {
    let mut bytes = vec![0u8; bits.len().div_ceil(8)];
    for (i, &bit) in bits.iter().enumerate() {
        if bit {
            bytes[i / 8] |= 1 << (i % 8);
        }
    }
    bytes
}

#[cfg(test)]
mod test {
    use super::*;

    fn basic_params(categories: &[&str]) -> RapporParams {
        RapporParams {
            probability_p: 0.0,
            probability_q: 1.0,
            num_bloom_bits: 0,
            num_hashes: 0,
            num_cohorts: 0,
            categories: categories.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test_log::test]
    fn basic_rappor_deterministic_p0_q1_matches_one_hot() {
        let params = basic_params(&["Apple", "Banana", "Cantaloupe"]);
        let encoder = BasicRapporEncoder::new(&params).expect("valid config");
        let secret = ClientSecret::generate();
        let data = encoder.encode(&secret, "Banana").expect("in categories");
        // least-significant bit = category 0 -> 0b010 = 0x02
        assert_eq!(data, vec![0b010]);
    }

    #[test_log::test]
    fn basic_rappor_rejects_value_outside_categories() {
        let params = basic_params(&["Apple", "Banana"]);
        let encoder = BasicRapporEncoder::new(&params).expect("valid config");
        let secret = ClientSecret::generate();
        let err = encoder.encode(&secret, "Durian").unwrap_err();
        assert_eq!(err.code(), StatusCode::InvalidArguments);
    }

    #[test_log::test]
    fn basic_rappor_rejects_empty_categories() {
        let params = basic_params(&[]);
        assert_eq!(
            BasicRapporEncoder::new(&params).unwrap_err().code(),
            StatusCode::InvalidConfig
        );
    }

    fn string_params() -> RapporParams {
        RapporParams {
            probability_p: 0.0,
            probability_q: 1.0,
            num_bloom_bits: 16,
            num_hashes: 2,
            num_cohorts: 10,
            categories: vec![],
        }
    }

    #[test_log::test]
    fn string_rappor_is_deterministic_for_same_secret_and_value() {
        let params = string_params();
        let encoder = RapporEncoder::new(&params).expect("valid config");
        let secret = ClientSecret::from_bytes([3; 16]);
        let a = encoder.encode(&secret, "hello").expect("encodes");
        let b = encoder.encode(&secret, "hello").expect("encodes");
        assert_eq!(a.cohort, b.cohort);
        assert_eq!(a.data, b.data);
    }

    #[test_log::test]
    fn string_rappor_cohort_is_stable_across_values() {
        let params = string_params();
        let encoder = RapporEncoder::new(&params).expect("valid config");
        let secret = ClientSecret::from_bytes([5; 16]);
        let a = encoder.encode(&secret, "hello").expect("encodes");
        let b = encoder.encode(&secret, "world").expect("encodes");
        assert_eq!(a.cohort, b.cohort, "cohort depends only on the client secret");
    }

    #[test_log::test]
    fn string_rappor_rejects_probability_out_of_range() {
        let mut params = string_params();
        params.probability_p = 1.5;
        assert_eq!(
            RapporEncoder::new(&params).unwrap_err().code(),
            StatusCode::InvalidConfig
        );
    }

    #[test_log::test]
    fn pack_bits_round_trips_through_byte_boundaries() {
        let bits = vec![true, false, true, true, false, false, false, false, true];
        let packed = pack_bits(&bits);
        assert_eq!(packed.len(), 2);
        assert_eq!(packed[0], 0b0000_1101);
        assert_eq!(packed[1], 0b0000_0001);
    }
}
