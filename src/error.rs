//! Crate-level error.

use thiserror::Error;

use crate::backend::ProofError;
use crate::chain::ChainError;
use crate::circuit::BuildError;
use crate::config::ConfigError;
use crate::eligibility::EligibilityError;
use crate::email::ParseError;

#[derive(Debug, Error)]
pub enum LoanError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Eligibility(#[from] EligibilityError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Proof(#[from] ProofError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Stable error categories for callers that branch on failure type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Parse,
    Eligibility,
    Build,
    Witness,
    InvalidProof,
    Proof,
    Chain,
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parse => "parse_error",
            Self::Eligibility => "eligibility_error",
            Self::Build => "build_error",
            Self::Witness => "witness_error",
            Self::InvalidProof => "invalid_proof_error",
            Self::Proof => "proof_error",
            Self::Chain => "chain_error",
            Self::Config => "config_error",
        }
    }
}

impl LoanError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse(_) => ErrorKind::Parse,
            Self::Eligibility(_) => ErrorKind::Eligibility,
            Self::Build(_) => ErrorKind::Build,
            Self::Proof(ProofError::Witness(_)) => ErrorKind::Witness,
            Self::Proof(ProofError::InvalidProof(_)) => ErrorKind::InvalidProof,
            Self::Proof(_) => ErrorKind::Proof,
            Self::Chain(_) => ErrorKind::Chain,
            Self::Config(_) => ErrorKind::Config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        let cases: Vec<(LoanError, &str)> = vec![
            (ParseError::MissingDkimSignature.into(), "parse_error"),
            (EligibilityError::SalaryUnknown.into(), "eligibility_error"),
            (BuildError::SalaryNotFound.into(), "build_error"),
            (ProofError::Witness("x".into()).into(), "witness_error"),
            (ProofError::InvalidProof("x".into()).into(), "invalid_proof_error"),
            (ProofError::Setup("x".into()).into(), "proof_error"),
        ];
        for (err, kind) in cases {
            assert_eq!(err.kind().as_str(), kind);
        }
    }

    #[test]
    fn test_message_is_transparent() {
        let err: LoanError = EligibilityError::ExceedsCap {
            requested: 40_000,
            max_loan_amount: 36_000,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "requested loan of 40000 exceeds 30% of salary (max allowed: 36000)"
        );
    }
}
