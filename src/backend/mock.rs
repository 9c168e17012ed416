//! Deterministic mock backend.
//!
//! Checks the loan relation natively and emits a SHA-256 "proof" over the
//! public inputs. Verifiable, reproducible, and with no zero-knowledge
//! guarantees whatsoever.

use sha2::{Digest, Sha256};

use super::{CircuitBackend, ProofArtifact, ProofError, Witness};
use crate::circuit::CircuitInputs;
use crate::hash::field_to_bytes32;

/// Proof length the loan contract accepts from the mock verifier.
pub const MOCK_PROOF_LEN: usize = 192;

const MOCK_DOMAIN: &[u8] = b"zkloan/mock-proof/v1";

#[derive(Debug, Clone, Default)]
pub struct MockBackend;

impl MockBackend {
    pub fn new() -> Self {
        Self
    }

    fn proof_bytes(public_inputs: &[[u8; 32]; 3]) -> Vec<u8> {
        let mut proof = Vec::with_capacity(MOCK_PROOF_LEN);
        let mut block: u8 = 0;
        while proof.len() < MOCK_PROOF_LEN {
            let mut hasher = Sha256::new();
            hasher.update(MOCK_DOMAIN);
            hasher.update([block]);
            for input in public_inputs {
                hasher.update(input);
            }
            proof.extend_from_slice(&hasher.finalize());
            block += 1;
        }
        proof.truncate(MOCK_PROOF_LEN);
        proof
    }
}

impl CircuitBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn execute(&self, inputs: &CircuitInputs) -> Result<Witness, ProofError> {
        let witness = Witness::solve(inputs)?;
        witness.check_relation()?;
        Ok(witness)
    }

    fn generate_proof(&self, witness: &Witness) -> Result<ProofArtifact, ProofError> {
        let public = witness.public_inputs().map(|f| field_to_bytes32(&f));
        Ok(ProofArtifact {
            proof: Self::proof_bytes(&public),
            public_inputs: witness.public_input_strings(),
        })
    }

    fn verify_proof(&self, artifact: &ProofArtifact) -> Result<bool, ProofError> {
        let public = artifact.public_fields()?.map(|f| field_to_bytes32(&f));
        Ok(artifact.proof == Self::proof_bytes(&public))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::tests::sample_inputs;

    #[test]
    fn test_prove_and_verify() {
        let backend = MockBackend::new();
        let witness = backend.execute(&sample_inputs("120000", 30_000)).unwrap();
        let artifact = backend.generate_proof(&witness).unwrap();

        assert_eq!(artifact.proof.len(), MOCK_PROOF_LEN);
        assert!(backend.verify_proof(&artifact).unwrap());
    }

    #[test]
    fn test_deterministic() {
        let backend = MockBackend::new();
        let witness = backend.execute(&sample_inputs("120000", 30_000)).unwrap();
        assert_eq!(
            backend.generate_proof(&witness).unwrap(),
            backend.generate_proof(&witness).unwrap()
        );
    }

    #[test]
    fn test_tampered_public_input_fails() {
        let backend = MockBackend::new();
        let witness = backend.execute(&sample_inputs("120000", 30_000)).unwrap();
        let mut artifact = backend.generate_proof(&witness).unwrap();
        artifact.public_inputs[0] = "0".to_string();
        assert!(!backend.verify_proof(&artifact).unwrap());
    }

    #[test]
    fn test_execute_rejects_unsatisfied_relation() {
        let mut inputs = sample_inputs("120000", 30_000);
        inputs.loan_eligibility = "0".to_string();
        assert!(matches!(
            MockBackend::new().execute(&inputs),
            Err(ProofError::Witness(_))
        ));
    }
}
