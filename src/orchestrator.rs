//! Proof lifecycle: witness, proof, self-verification.
//!
//! ```text
//! Init -> WitnessGenerated -> ProofGenerated -> SelfVerified -> Done
//!   \____________\_________________\______________\----> Failed
//! ```
//!
//! One progress line is emitted after each completed transition, and a final
//! `❌` line naming the stage on failure. Nothing is retried.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::backend::{self, CircuitBackend, ProofArtifact, ProofError, Witness};
use crate::circuit::CircuitInputs;
use crate::config::ProverConfig;
use crate::progress::ProgressSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofStage {
    Init,
    WitnessGenerated,
    ProofGenerated,
    SelfVerified,
    Done,
    Failed,
}

impl fmt::Display for ProofStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::WitnessGenerated => "witness_generated",
            Self::ProofGenerated => "proof_generated",
            Self::SelfVerified => "self_verified",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Drives a [`CircuitBackend`] through one proof.
pub struct ProofOrchestrator {
    backend: Box<dyn CircuitBackend>,
}

impl ProofOrchestrator {
    pub fn new(backend: Box<dyn CircuitBackend>) -> Self {
        Self { backend }
    }

    pub fn from_config(config: &ProverConfig) -> Result<Self, ProofError> {
        Ok(Self::new(backend::from_config(config)?))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn backend(&self) -> &dyn CircuitBackend {
        self.backend.as_ref()
    }

    /// Run the full lifecycle. On error no artifact is returned.
    pub fn generate_proof(
        &self,
        inputs: &CircuitInputs,
        progress: &mut dyn ProgressSink,
    ) -> Result<ProofArtifact, ProofError> {
        self.drive(inputs, progress).1
    }

    /// Like [`generate_proof`](Self::generate_proof), also returning the
    /// terminal stage: [`ProofStage::Done`] or [`ProofStage::Failed`].
    #[instrument(skip_all, fields(backend = self.backend.name()))]
    pub fn drive(
        &self,
        inputs: &CircuitInputs,
        progress: &mut dyn ProgressSink,
    ) -> (ProofStage, Result<ProofArtifact, ProofError>) {
        let mut stage = ProofStage::Init;
        match self.run(inputs, progress, &mut stage) {
            Ok(artifact) => {
                tracing::info!("proof lifecycle complete");
                (stage, Ok(artifact))
            }
            Err(e) => {
                tracing::warn!(%stage, error = %e, "proof lifecycle failed");
                progress.emit(&format!("❌ Proof generation failed after {stage}: {e}"));
                stage = ProofStage::Failed;
                (stage, Err(e))
            }
        }
    }

    fn run(
        &self,
        inputs: &CircuitInputs,
        progress: &mut dyn ProgressSink,
        stage: &mut ProofStage,
    ) -> Result<ProofArtifact, ProofError> {
        let witness = self.generate_witness(inputs)?;
        *stage = ProofStage::WitnessGenerated;
        progress.emit("🧮 Witness generated");

        let artifact = self.backend.generate_proof(&witness)?;
        *stage = ProofStage::ProofGenerated;
        tracing::debug!(proof_len = artifact.proof.len(), "proof generated");
        progress.emit("✅ ZK proof generated successfully");

        self.self_verify(&witness, &artifact)?;
        *stage = ProofStage::SelfVerified;
        progress.emit("✅ Proof verification: VALID");

        *stage = ProofStage::Done;
        progress.emit(&format!(
            "📊 Public inputs: eligibility={} nullifier={} domain_hash={}",
            artifact.public_inputs[0], artifact.public_inputs[1], artifact.public_inputs[2]
        ));
        Ok(artifact)
    }

    fn generate_witness(&self, inputs: &CircuitInputs) -> Result<Witness, ProofError> {
        let witness = self.backend.execute(inputs)?;
        tracing::debug!(
            header_len = inputs.header.len,
            body_len = inputs.body.len,
            "witness generated"
        );
        Ok(witness)
    }

    /// Re-prove from the same witness and verify the re-run.
    fn self_verify(&self, witness: &Witness, artifact: &ProofArtifact) -> Result<(), ProofError> {
        let rerun = self.backend.generate_proof(witness)?;
        if &rerun != artifact {
            return Err(ProofError::InvalidProof(
                "re-generated proof differs from the original".into(),
            ));
        }
        if !self.backend.verify_proof(&rerun)? {
            return Err(ProofError::InvalidProof("verifier rejected the proof".into()));
        }
        Ok(())
    }
}
