//! Proving backends.
//!
//! The circuit is consumed through three capabilities: `execute` (witness
//! generation), `generate_proof` and `verify_proof`. [`MockBackend`] and
//! [`Groth16Backend`] implement the same trait and are chosen by
//! [`ProverConfig::use_mock_backend`](crate::config::ProverConfig).

mod groth16;
mod mock;

use ark_bn254::Fr;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::circuit::{CircuitInputs, LoanAssignment};
use crate::config::ProverConfig;
use crate::eligibility::MAX_LOAN_RATIO_PERCENT;
use crate::email::dkim::{KEY_LIMBS_2048, LIMB_BITS};
use crate::hash::{self, field_to_bytes32, field_to_hex, parse_field};

pub use groth16::Groth16Backend;
pub use mock::MockBackend;

/// Errors raised while proving or verifying.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProofError {
    #[error("trusted setup failed: {0}")]
    Setup(String),

    /// The circuit rejected the inputs.
    #[error("witness generation failed: {0}")]
    Witness(String),

    #[error("proof generation failed: {0}")]
    ProofGeneration(String),

    /// Self-verification of a freshly generated proof did not pass.
    #[error("generated proof failed verification: {0}")]
    InvalidProof(String),

    #[error("malformed proof artifact: {0}")]
    MalformedArtifact(String),
}

/// Proof plus its public inputs `[loan_eligibility, nullifier, domain_hash]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofArtifact {
    #[serde(with = "hex_bytes")]
    pub proof: Vec<u8>,
    pub public_inputs: [String; 3],
}

impl ProofArtifact {
    pub fn loan_eligible(&self) -> bool {
        parse_field(&self.public_inputs[0]) == Some(Fr::from(1u64))
    }

    pub fn nullifier(&self) -> &str {
        &self.public_inputs[1]
    }

    pub fn domain_hash(&self) -> &str {
        &self.public_inputs[2]
    }

    /// Public inputs as field elements.
    pub fn public_fields(&self) -> Result<[Fr; 3], ProofError> {
        let parse = |i: usize| {
            parse_field(&self.public_inputs[i]).ok_or_else(|| {
                ProofError::MalformedArtifact(format!("public input {i} is not a field element"))
            })
        };
        Ok([parse(0)?, parse(1)?, parse(2)?])
    }
}

/// Circuit inputs solved into field elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Witness {
    pub assignment: LoanAssignment,
    pub loan_amount: u64,
    pub expected_salary: u64,
}

impl Witness {
    /// Validate shapes and parse every scalar.
    pub fn solve(inputs: &CircuitInputs) -> Result<Self, ProofError> {
        if !inputs.header.is_well_formed() {
            return Err(ProofError::Witness("header storage has the wrong shape".into()));
        }
        if !inputs.body.is_well_formed() {
            return Err(ProofError::Witness("body storage has the wrong shape".into()));
        }
        check_limbs("pubkey modulus", &inputs.pubkey.modulus)?;
        check_limbs("signature", &inputs.signature)?;

        let loan_amount = parse_amount("loan_amount", &inputs.loan_amount)?;
        let expected_salary = parse_amount("expected_salary", &inputs.expected_salary)?;
        let loan_eligibility = parse_scalar("loan_eligibility", &inputs.loan_eligibility)?;
        if loan_eligibility != Fr::from(0u64) && loan_eligibility != Fr::from(1u64) {
            return Err(ProofError::Witness("loan_eligibility must be 0 or 1".into()));
        }

        Ok(Self {
            assignment: LoanAssignment {
                loan_amount: Fr::from(loan_amount),
                expected_salary: Fr::from(expected_salary),
                secret_field: parse_scalar("user_secret", &inputs.user_secret)?,
                loan_eligibility,
                nullifier: parse_scalar("nullifier", &inputs.nullifier)?,
                domain_hash: parse_scalar("domain_hash", &inputs.domain_hash)?,
            },
            loan_amount,
            expected_salary,
        })
    }

    /// Native evaluation of the loan circuit's constraints.
    pub fn check_relation(&self) -> Result<(), ProofError> {
        let within_cap = u128::from(self.loan_amount) * 100
            <= u128::from(self.expected_salary) * u128::from(MAX_LOAN_RATIO_PERCENT);
        if self.assignment.loan_eligibility != Fr::from(within_cap as u64) {
            return Err(ProofError::Witness(
                "loan_eligibility does not match loan_amount and expected_salary".into(),
            ));
        }

        let nullifier = hash::nullifier_from_field(self.assignment.secret_field, self.expected_salary);
        if nullifier.0 != self.assignment.nullifier {
            return Err(ProofError::Witness(
                "nullifier does not match user_secret and expected_salary".into(),
            ));
        }
        Ok(())
    }

    pub fn public_inputs(&self) -> [Fr; 3] {
        let a = &self.assignment;
        [a.loan_eligibility, a.nullifier, a.domain_hash]
    }

    pub fn public_input_strings(&self) -> [String; 3] {
        self.public_inputs().map(|f| field_to_hex(&f))
    }

    /// SHA-256 over every assigned value; seeds deterministic proving.
    pub fn digest(&self) -> [u8; 32] {
        let a = &self.assignment;
        let mut hasher = Sha256::new();
        for value in [
            a.loan_amount,
            a.expected_salary,
            a.secret_field,
            a.loan_eligibility,
            a.nullifier,
            a.domain_hash,
        ] {
            hasher.update(field_to_bytes32(&value));
        }
        hasher.finalize().into()
    }
}

fn check_limbs(name: &str, limbs: &[String]) -> Result<(), ProofError> {
    if limbs.len() != KEY_LIMBS_2048 {
        return Err(ProofError::Witness(format!(
            "{name} has {} limbs, expected {KEY_LIMBS_2048}",
            limbs.len()
        )));
    }
    for limb in limbs {
        let value: u128 = limb
            .parse()
            .map_err(|_| ProofError::Witness(format!("{name} limb {limb:?} is not an integer")))?;
        if value >> LIMB_BITS != 0 {
            return Err(ProofError::Witness(format!("{name} limb exceeds {LIMB_BITS} bits")));
        }
    }
    Ok(())
}

fn parse_amount(name: &str, value: &str) -> Result<u64, ProofError> {
    value
        .parse()
        .map_err(|_| ProofError::Witness(format!("{name} {value:?} is not a 64-bit integer")))
}

fn parse_scalar(name: &str, value: &str) -> Result<Fr, ProofError> {
    parse_field(value)
        .ok_or_else(|| ProofError::Witness(format!("{name} is not a field element")))
}

/// Capability set of a compiled loan circuit.
pub trait CircuitBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Solve the witness; rejects malformed or unsatisfying inputs.
    fn execute(&self, inputs: &CircuitInputs) -> Result<Witness, ProofError>;

    /// Prove a solved witness. Must be deterministic for a given witness.
    fn generate_proof(&self, witness: &Witness) -> Result<ProofArtifact, ProofError>;

    /// `Ok(false)` for a well-formed proof that does not verify.
    fn verify_proof(&self, artifact: &ProofArtifact) -> Result<bool, ProofError>;
}

/// Backend selected by `config.use_mock_backend`.
pub fn from_config(config: &ProverConfig) -> Result<Box<dyn CircuitBackend>, ProofError> {
    if config.use_mock_backend {
        tracing::info!("using mock proving backend");
        Ok(Box::new(MockBackend::new()))
    } else {
        tracing::info!(seed = config.setup_seed, "running Groth16 setup");
        Ok(Box::new(Groth16Backend::setup(config.setup_seed)?))
    }
}

mod hex_bytes {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        hex::decode(raw.trim_start_matches("0x")).map_err(D::Error::custom)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::circuit::CircuitInputBuilder;
    use crate::email::dkim::Sequence;
    use crate::email::{DkimData, SalaryData};

    pub(crate) fn sample_inputs(salary: &str, requested: u64) -> CircuitInputs {
        let dkim = DkimData {
            header: "From: hr@techcorp.com".to_string(),
            body: "SALARY_AMOUNT: 120000".to_string(),
            signature: "dGVzdHNpZ25hdHVyZQ==".to_string(),
            domain: "techcorp.com".to_string(),
            selector: "s1".to_string(),
            body_hash: String::new(),
            header_sequence: Sequence::default(),
            body_hash_index: 0,
        };
        let salary = SalaryData {
            salary_amount: salary.to_string(),
            wallet_address: String::new(),
            employee_name: String::new(),
            company_email: String::new(),
            position: String::new(),
            company: String::new(),
            pay_period: String::new(),
            zk_reference: String::new(),
        };
        CircuitInputBuilder::new()
            .build(&dkim, &salary, requested, "secret")
            .unwrap()
    }

    #[test]
    fn test_solve_valid_inputs() {
        let witness = Witness::solve(&sample_inputs("120000", 30_000)).unwrap();
        assert_eq!(witness.loan_amount, 30_000);
        assert_eq!(witness.expected_salary, 120_000);
        assert!(witness.check_relation().is_ok());
    }

    #[test]
    fn test_solve_rejects_bad_shapes() {
        let mut inputs = sample_inputs("120000", 30_000);
        inputs.header.storage.pop();
        assert!(matches!(Witness::solve(&inputs), Err(ProofError::Witness(_))));

        let mut inputs = sample_inputs("120000", 30_000);
        inputs.signature.truncate(3);
        assert!(matches!(Witness::solve(&inputs), Err(ProofError::Witness(_))));

        let mut inputs = sample_inputs("120000", 30_000);
        inputs.loan_eligibility = "2".to_string();
        assert!(matches!(Witness::solve(&inputs), Err(ProofError::Witness(_))));

        let mut inputs = sample_inputs("120000", 30_000);
        inputs.nullifier = "zz".to_string();
        assert!(matches!(Witness::solve(&inputs), Err(ProofError::Witness(_))));
    }

    #[test]
    fn test_relation_catches_tampering() {
        let mut inputs = sample_inputs("120000", 30_000);
        inputs.loan_amount = "40000".to_string();
        let witness = Witness::solve(&inputs).unwrap();
        assert!(matches!(witness.check_relation(), Err(ProofError::Witness(_))));
    }

    #[test]
    fn test_digest_depends_on_witness() {
        let a = Witness::solve(&sample_inputs("120000", 30_000)).unwrap();
        let b = Witness::solve(&sample_inputs("120000", 30_001)).unwrap();
        assert_eq!(a.digest(), a.digest());
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn test_artifact_accessors() {
        let witness = Witness::solve(&sample_inputs("120000", 30_000)).unwrap();
        let artifact = ProofArtifact {
            proof: vec![1, 2, 3],
            public_inputs: witness.public_input_strings(),
        };
        assert!(artifact.loan_eligible());
        assert_eq!(artifact.nullifier(), hash::nullifier("secret", 120_000).to_hex());
        assert_eq!(artifact.public_fields().unwrap(), witness.public_inputs());

        let json = serde_json::to_string(&artifact).unwrap();
        assert!(json.contains("\"proof\":\"0x010203\""));
        let back: ProofArtifact = serde_json::from_str(&json).unwrap();
        assert_eq!(back, artifact);
    }
}
