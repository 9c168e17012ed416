//! Loan eligibility circuit.
//!
//! Public inputs (allocation order = proof public input order):
//! - `loan_eligibility`: 1 if `100 * loan_amount <= 30 * expected_salary`, else 0
//! - `nullifier`: `Poseidon(NULLIFIER_TAG, secret_field, expected_salary)`
//! - `domain_hash`: hash of the DKIM signing domain
//!
//! Private witnesses:
//! - `loan_amount`, `expected_salary`: both constrained to 64 bits
//! - `secret_field`: field element derived from the user secret
//!
//! This proves: "for some salary and secret, this nullifier is mine and the
//! requested amount is within 30% of that salary" without revealing either.

use std::cmp::Ordering;

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::{
    constraints::CryptographicSpongeVar,
    poseidon::{constraints::PoseidonSpongeVar, PoseidonConfig},
};
use ark_r1cs_std::{
    fields::fp::FpVar,
    prelude::{AllocVar, Boolean, EqGadget, ToBitsGadget},
};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

use crate::eligibility::MAX_LOAN_RATIO_PERCENT;
use crate::hash::{self, PoseidonHasher};

/// Bit width of loan and salary amounts.
pub const AMOUNT_BITS: usize = 64;

/// Scalar assignment of the circuit. `None` values are only valid during setup.
#[derive(Clone)]
pub struct LoanEligibilityCircuit {
    pub poseidon_config: PoseidonConfig<Fr>,

    pub loan_amount: Option<Fr>,
    pub expected_salary: Option<Fr>,
    pub secret_field: Option<Fr>,

    pub loan_eligibility: Option<Fr>,
    pub nullifier: Option<Fr>,
    pub domain_hash: Option<Fr>,
}

/// Values that satisfy the circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanAssignment {
    pub loan_amount: Fr,
    pub expected_salary: Fr,
    pub secret_field: Fr,
    pub loan_eligibility: Fr,
    pub nullifier: Fr,
    pub domain_hash: Fr,
}

impl LoanEligibilityCircuit {
    /// Satisfiable dummy assignment for key generation.
    pub fn new_empty() -> Self {
        let zero = Fr::from(0u64);
        Self::new_with_witness(&LoanAssignment {
            loan_amount: zero,
            expected_salary: zero,
            secret_field: zero,
            loan_eligibility: Fr::from(1u64),
            nullifier: hash::nullifier_from_field(zero, 0).0,
            domain_hash: zero,
        })
    }

    pub fn new_with_witness(assignment: &LoanAssignment) -> Self {
        Self {
            poseidon_config: PoseidonHasher::new().config().clone(),
            loan_amount: Some(assignment.loan_amount),
            expected_salary: Some(assignment.expected_salary),
            secret_field: Some(assignment.secret_field),
            loan_eligibility: Some(assignment.loan_eligibility),
            nullifier: Some(assignment.nullifier),
            domain_hash: Some(assignment.domain_hash),
        }
    }

    /// Public inputs in verification order.
    pub fn public_inputs(&self) -> Option<[Fr; 3]> {
        Some([self.loan_eligibility?, self.nullifier?, self.domain_hash?])
    }
}

impl ConstraintSynthesizer<Fr> for LoanEligibilityCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        let loan_var = FpVar::new_witness(cs.clone(), || {
            self.loan_amount.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let salary_var = FpVar::new_witness(cs.clone(), || {
            self.expected_salary.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let secret_var = FpVar::new_witness(cs.clone(), || {
            self.secret_field.ok_or(SynthesisError::AssignmentMissing)
        })?;

        let eligibility_var = FpVar::new_input(cs.clone(), || {
            self.loan_eligibility.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let nullifier_var = FpVar::new_input(cs.clone(), || {
            self.nullifier.ok_or(SynthesisError::AssignmentMissing)
        })?;
        // Bound to the proof through the public input vector.
        let _domain_hash_var = FpVar::new_input(cs.clone(), || {
            self.domain_hash.ok_or(SynthesisError::AssignmentMissing)
        })?;

        enforce_bit_width(&loan_var, AMOUNT_BITS)?;
        enforce_bit_width(&salary_var, AMOUNT_BITS)?;

        // loan <= salary * 30 / 100  <=>  100 * loan <= 30 * salary
        let scaled_loan = &loan_var * Fr::from(100u64);
        let scaled_cap = &salary_var * Fr::from(MAX_LOAN_RATIO_PERCENT);
        let within_cap = scaled_loan.is_cmp(&scaled_cap, Ordering::Less, true)?;
        eligibility_var.enforce_equal(&FpVar::from(within_cap))?;

        let tag_var = FpVar::new_constant(cs.clone(), hash::nullifier_tag())?;
        let computed_nullifier = poseidon_hash(
            cs,
            &self.poseidon_config,
            &[tag_var, secret_var, salary_var],
        )?;
        computed_nullifier.enforce_equal(&nullifier_var)?;

        Ok(())
    }
}

/// Force every bit at or above `bits` to zero.
fn enforce_bit_width(value: &FpVar<Fr>, bits: usize) -> Result<(), SynthesisError> {
    let le_bits = value.to_bits_le()?;
    for bit in le_bits.iter().skip(bits) {
        bit.enforce_equal(&Boolean::FALSE)?;
    }
    Ok(())
}

/// In-circuit Poseidon over `inputs`, squeezing one element.
fn poseidon_hash(
    cs: ConstraintSystemRef<Fr>,
    config: &PoseidonConfig<Fr>,
    inputs: &[FpVar<Fr>],
) -> Result<FpVar<Fr>, SynthesisError> {
    let mut sponge = PoseidonSpongeVar::new(cs, config);
    for input in inputs {
        sponge.absorb(input)?;
    }
    let output = sponge.squeeze_field_elements(1)?;
    Ok(output[0].clone())
}
