//! Poseidon sponge over the BN254 scalar field.
//!
//! The same configuration is used natively (nullifier derivation) and inside
//! the loan circuit, so both sides must always build it through
//! [`PoseidonHasher::new`].

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::{
    poseidon::{find_poseidon_ark_and_mds, PoseidonConfig, PoseidonSponge},
    CryptographicSponge,
};
use ark_ff::PrimeField;

const FULL_ROUNDS: usize = 8;
const PARTIAL_ROUNDS: usize = 57;
const ALPHA: u64 = 5;
const RATE: usize = 2;
const CAPACITY: usize = 1;

/// Poseidon hasher configured for BN254 scalar field.
#[derive(Clone)]
pub struct PoseidonHasher {
    config: PoseidonConfig<Fr>,
}

impl PoseidonHasher {
    pub fn new() -> Self {
        // Grain LFSR round constants and MDS, as in the Poseidon reference.
        let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
            Fr::MODULUS_BIT_SIZE as u64,
            RATE,
            FULL_ROUNDS as u64,
            PARTIAL_ROUNDS as u64,
            0,
        );

        Self {
            config: PoseidonConfig {
                full_rounds: FULL_ROUNDS,
                partial_rounds: PARTIAL_ROUNDS,
                alpha: ALPHA,
                ark,
                mds,
                rate: RATE,
                capacity: CAPACITY,
            },
        }
    }

    /// Absorb `elements` in order and squeeze one field element.
    pub fn hash_many(&self, elements: &[Fr]) -> Fr {
        let mut sponge = PoseidonSponge::new(&self.config);
        for element in elements {
            sponge.absorb(element);
        }
        sponge.squeeze_field_elements::<Fr>(1)[0]
    }

    pub fn config(&self) -> &PoseidonConfig<Fr> {
        &self.config
    }
}

impl Default for PoseidonHasher {
    fn default() -> Self {
        Self::new()
    }
}
