//! Groth16 over BN254 for the loan circuit.

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, PreparedVerifyingKey, Proof, ProvingKey, VerifyingKey};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystem};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use ark_std::rand::{rngs::StdRng, SeedableRng};

use super::{CircuitBackend, ProofArtifact, ProofError, Witness};
use crate::circuit::{CircuitInputs, LoanEligibilityCircuit};

/// Proving and verifying keys for [`LoanEligibilityCircuit`].
pub struct Groth16Backend {
    proving_key: ProvingKey<Bn254>,
    verifying_key: VerifyingKey<Bn254>,
    prepared_vk: PreparedVerifyingKey<Bn254>,
}

impl Groth16Backend {
    /// Circuit-specific setup from a seeded RNG.
    ///
    /// A single party knows the toxic waste here. Fine for demos and tests;
    /// a deployed verifier needs keys from a ceremony.
    pub fn setup(seed: u64) -> Result<Self, ProofError> {
        let circuit = LoanEligibilityCircuit::new_empty();
        let mut rng = StdRng::seed_from_u64(seed);

        let (proving_key, verifying_key) =
            Groth16::<Bn254>::circuit_specific_setup(circuit, &mut rng)
                .map_err(|e| ProofError::Setup(e.to_string()))?;
        let prepared_vk = Groth16::<Bn254>::process_vk(&verifying_key)
            .map_err(|e| ProofError::Setup(e.to_string()))?;

        Ok(Self {
            proving_key,
            verifying_key,
            prepared_vk,
        })
    }

    pub fn verifying_key(&self) -> &VerifyingKey<Bn254> {
        &self.verifying_key
    }

    /// Compressed verifying key, for exporting to a verifier.
    pub fn verifying_key_bytes(&self) -> Result<Vec<u8>, ProofError> {
        let mut bytes = Vec::new();
        self.verifying_key
            .serialize_compressed(&mut bytes)
            .map_err(|e| ProofError::Setup(e.to_string()))?;
        Ok(bytes)
    }
}

impl CircuitBackend for Groth16Backend {
    fn name(&self) -> &'static str {
        "groth16"
    }

    fn execute(&self, inputs: &CircuitInputs) -> Result<Witness, ProofError> {
        let witness = Witness::solve(inputs)?;

        let cs = ConstraintSystem::<Fr>::new_ref();
        LoanEligibilityCircuit::new_with_witness(&witness.assignment)
            .generate_constraints(cs.clone())
            .map_err(|e| ProofError::Witness(e.to_string()))?;
        let satisfied = cs
            .is_satisfied()
            .map_err(|e| ProofError::Witness(e.to_string()))?;
        if !satisfied {
            let failing = cs.which_is_unsatisfied().ok().flatten().unwrap_or_default();
            return Err(ProofError::Witness(format!("constraint not satisfied: {failing}")));
        }

        tracing::debug!(constraints = cs.num_constraints(), "loan circuit satisfied");
        Ok(witness)
    }

    fn generate_proof(&self, witness: &Witness) -> Result<ProofArtifact, ProofError> {
        let circuit = LoanEligibilityCircuit::new_with_witness(&witness.assignment);

        // Seeded from the witness so re-proving yields identical bytes.
        let mut rng = StdRng::from_seed(witness.digest());
        let proof = Groth16::<Bn254>::prove(&self.proving_key, circuit, &mut rng)
            .map_err(|e| ProofError::ProofGeneration(e.to_string()))?;

        let mut proof_bytes = Vec::new();
        proof
            .serialize_compressed(&mut proof_bytes)
            .map_err(|e| ProofError::ProofGeneration(e.to_string()))?;

        Ok(ProofArtifact {
            proof: proof_bytes,
            public_inputs: witness.public_input_strings(),
        })
    }

    fn verify_proof(&self, artifact: &ProofArtifact) -> Result<bool, ProofError> {
        let public_inputs = artifact.public_fields()?;
        let proof = Proof::<Bn254>::deserialize_compressed(&artifact.proof[..])
            .map_err(|e| ProofError::MalformedArtifact(e.to_string()))?;

        Groth16::<Bn254>::verify_with_processed_vk(&self.prepared_vk, &public_inputs, &proof)
            .map_err(|e| ProofError::MalformedArtifact(e.to_string()))
    }
}
