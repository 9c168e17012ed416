//! zk-payroll-loan - Borrow against your salary without revealing it
//!
//! Turns a DKIM-signed salary email into a zero-knowledge proof that a
//! requested loan is at most 30% of the salary, bound to a one-time
//! nullifier and the signer's domain.
//!
//! # Architecture
//!
//! 1. [`email`] pulls salary fields and DKIM data out of the raw `.eml`
//! 2. [`eligibility`] applies the 30% cap
//! 3. [`circuit`] builds fixed-shape circuit inputs ([`hash`] supplies the
//!    nullifier and domain hash)
//! 4. [`orchestrator`] runs witness → proof → self-verification on a
//!    [`backend`]
//! 5. [`chain`] encodes the proof for the loan contract
//!
//! [`pipeline::LoanProofPipeline`] wires all of it together.

pub mod backend;
pub mod chain;
pub mod circuit;
pub mod config;
pub mod eligibility;
pub mod email;
pub mod error;
pub mod hash;
pub mod orchestrator;
pub mod pipeline;
pub mod progress;

// WASM bindings (only compiled when wasm feature is enabled)
#[cfg(feature = "wasm")]
pub mod wasm;

pub use backend::{CircuitBackend, ProofArtifact, ProofError};
pub use chain::{encode_for_chain, ChainCalldata, ChainConfig, LoanCall};
pub use circuit::{CircuitInputBuilder, CircuitInputs};
pub use config::ProverConfig;
pub use eligibility::{EligibilityError, EligibilityResult};
pub use email::{ParseError, SalaryData, SalaryEmailParser};
pub use error::{ErrorKind, LoanError};
pub use orchestrator::{ProofOrchestrator, ProofStage};
pub use pipeline::{EligibilityReport, LoanProof, LoanProofPipeline};
pub use progress::{ProgressEntry, ProgressLog, ProgressSink};
