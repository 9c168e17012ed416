//! End-to-end: salary email in, contract calldata out.

use serde::Serialize;

use crate::backend::ProofArtifact;
use crate::chain::{encode_for_chain, ChainCalldata, LoanCall};
use crate::circuit::CircuitInputBuilder;
use crate::config::ProverConfig;
use crate::eligibility::{self, EligibilityError, EligibilityResult};
use crate::email::{ParsedSalaryEmail, SalaryData, SalaryEmailParser};
use crate::error::LoanError;
use crate::orchestrator::ProofOrchestrator;
use crate::progress::ProgressSink;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityReport {
    pub salary_amount: u64,
    pub requested: u64,
    pub result: EligibilityResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanProof {
    pub artifact: ProofArtifact,
    pub calldata: ChainCalldata,
    pub eligibility: EligibilityReport,
    pub salary_data: SalaryData,
}

impl LoanProof {
    pub fn take_loan_call(&self) -> LoanCall {
        LoanCall::take_loan(self.eligibility.requested, self.calldata.clone())
    }

    pub fn repay_loan_call(&self) -> LoanCall {
        LoanCall::repay_loan(self.calldata.clone())
    }
}

pub struct LoanProofPipeline {
    orchestrator: ProofOrchestrator,
    builder: CircuitInputBuilder,
}

impl LoanProofPipeline {
    pub fn new(orchestrator: ProofOrchestrator, builder: CircuitInputBuilder) -> Self {
        Self {
            orchestrator,
            builder,
        }
    }

    /// Backend and DKIM key from `config`. Groth16 setup runs here.
    pub fn from_config(config: &ProverConfig) -> Result<Self, LoanError> {
        let builder = match &config.dkim_public_key_pem {
            Some(pem) => CircuitInputBuilder::with_public_key_pem(pem)?,
            None => CircuitInputBuilder::new(),
        };
        tracing::info!(key_source = ?builder.pubkey().source, "DKIM key limbs ready");
        Ok(Self::new(ProofOrchestrator::from_config(config)?, builder))
    }

    pub fn orchestrator(&self) -> &ProofOrchestrator {
        &self.orchestrator
    }

    pub fn parse(&self, raw_email: &str) -> Result<ParsedSalaryEmail, LoanError> {
        Ok(SalaryEmailParser::parse(raw_email)?)
    }

    /// Parse and evaluate without proving.
    pub fn check_eligibility(
        &self,
        raw_email: &str,
        requested: u64,
    ) -> Result<EligibilityReport, LoanError> {
        let parsed = self.parse(raw_email)?;
        Ok(report(&parsed.salary_data, requested)?)
    }

    /// Parse, gate on eligibility, build inputs, prove and encode.
    ///
    /// An over-cap request fails with [`EligibilityError::ExceedsCap`] before
    /// any circuit work starts.
    pub fn prove_loan(
        &self,
        raw_email: &str,
        requested: u64,
        user_secret: &str,
        progress: &mut dyn ProgressSink,
    ) -> Result<LoanProof, LoanError> {
        let result = self.prove_loan_inner(raw_email, requested, user_secret, progress);
        if let Err(e) = &result {
            // Proof failures already reported their stage.
            if !matches!(e, LoanError::Proof(_)) {
                progress.emit(&format!("❌ Error: {e}"));
            }
        }
        result
    }

    fn prove_loan_inner(
        &self,
        raw_email: &str,
        requested: u64,
        user_secret: &str,
        progress: &mut dyn ProgressSink,
    ) -> Result<LoanProof, LoanError> {
        progress.emit("🚀 Starting loan proof...");
        progress.emit(&format!("💰 Loan amount: ${requested}"));
        progress.emit("🔍 Validating loan eligibility from email...");

        let parsed = self.parse(raw_email)?;
        let eligibility = report(&parsed.salary_data, requested)?;
        progress.emit(&format!("📧 Verified salary: ${}", parsed.salary_data.salary_amount));
        eligibility.result.ensure_eligible(requested)?;
        progress.emit(&format!(
            "✅ Loan approved: ${requested} ({:.1}% of salary)",
            eligibility.result.ratio
        ));

        let inputs = self.builder.build(
            &parsed.dkim_data,
            &parsed.salary_data,
            requested,
            user_secret,
        )?;
        tracing::info!(
            domain = %parsed.dkim_data.domain,
            requested,
            max_loan_amount = eligibility.result.max_loan_amount,
            "circuit inputs built"
        );

        progress.emit("📧 Generating DKIM loan proof...");
        let artifact = self.orchestrator.generate_proof(&inputs, progress)?;
        let calldata = encode_for_chain(&artifact)?;
        progress.emit("🎉 Loan proof ready for submission");

        Ok(LoanProof {
            artifact,
            calldata,
            eligibility,
            salary_data: parsed.salary_data,
        })
    }

    /// Check an artifact against this pipeline's backend.
    pub fn verify_artifact(&self, artifact: &ProofArtifact) -> Result<bool, LoanError> {
        Ok(self.orchestrator.backend().verify_proof(artifact)?)
    }
}

fn report(salary_data: &SalaryData, requested: u64) -> Result<EligibilityReport, EligibilityError> {
    let salary_amount = salary_data
        .salary_as_integer()
        .ok_or(EligibilityError::SalaryUnknown)?;
    Ok(EligibilityReport {
        salary_amount,
        requested,
        result: eligibility::evaluate(salary_amount, requested)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::progress::ProgressLog;

    const EMAIL: &str = "From: payroll@techcorp.com\n\
DKIM-Signature: v=1; a=rsa-sha256; c=relaxed/relaxed; d=techcorp.com; s=hr;\n\tbh=abc=; b=dGVzdHNpZ25hdHVyZQ==\n\
X-Salary-Amount: 120000\n\
\n\
Monthly salary statement\n";

    fn pipeline() -> LoanProofPipeline {
        LoanProofPipeline::from_config(&ProverConfig::mock()).unwrap()
    }

    #[test]
    fn test_check_eligibility() {
        let report = pipeline().check_eligibility(EMAIL, 30_000).unwrap();
        assert_eq!(report.salary_amount, 120_000);
        assert!(report.result.is_eligible);
        assert_eq!(report.result.max_loan_amount, 36_000);
    }

    #[test]
    fn test_unparseable_salary() {
        let raw = EMAIL.replace("120000", "lots");
        let err = pipeline().check_eligibility(&raw, 1).unwrap_err();
        assert!(matches!(err, LoanError::Eligibility(EligibilityError::SalaryUnknown)));
    }

    #[test]
    fn test_prove_loan() {
        let mut log = ProgressLog::new();
        let proof = pipeline().prove_loan(EMAIL, 30_000, "hunter2", &mut log).unwrap();

        assert!(proof.artifact.loan_eligible());
        assert_eq!(proof.calldata.public_inputs_bytes32.len(), 3);
        assert_eq!(proof.take_loan_call().function_name(), "takeLoan");

        let repay = proof.repay_loan_call();
        assert_eq!(repay.function_name(), "repayLoan");
        assert_eq!(repay.calldata(), &proof.calldata);
        assert_eq!(proof.take_loan_call().calldata(), repay.calldata());
        assert!(log.messages().any(|m| m.contains("120000")));
        assert!(log.messages().all(|m| !m.contains("hunter2")));
    }

    #[test]
    fn test_over_cap_rejected_before_proving() {
        let mut log = ProgressLog::new();
        let err = pipeline().prove_loan(EMAIL, 40_000, "s", &mut log).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Eligibility);
        assert!(log.messages().all(|m| !m.contains("Witness")));
        assert!(log.messages().last().unwrap().contains("max allowed: 36000"));
    }
}
