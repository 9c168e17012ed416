//! Loan eligibility: a loan may not exceed 30% of the verified salary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cap on the requested amount, as a percentage of salary.
pub const MAX_LOAN_RATIO_PERCENT: u64 = 30;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EligibilityError {
    #[error("salary unknown or zero")]
    SalaryUnknown,

    #[error("requested loan of {requested} exceeds 30% of salary (max allowed: {max_loan_amount})")]
    ExceedsCap { requested: u64, max_loan_amount: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityResult {
    pub is_eligible: bool,
    pub max_loan_amount: u64,
    /// Requested amount as a percentage of salary.
    pub ratio: f64,
}

impl EligibilityResult {
    /// Turn an ineligible result into [`EligibilityError::ExceedsCap`].
    pub fn ensure_eligible(&self, requested: u64) -> Result<(), EligibilityError> {
        if self.is_eligible {
            Ok(())
        } else {
            Err(EligibilityError::ExceedsCap {
                requested,
                max_loan_amount: self.max_loan_amount,
            })
        }
    }
}

/// `floor(salary * 0.30)` in exact integer arithmetic.
pub fn max_loan_amount(salary: u64) -> u64 {
    (u128::from(salary) * u128::from(MAX_LOAN_RATIO_PERCENT) / 100) as u64
}

/// Evaluate a loan request against a salary.
pub fn evaluate(salary: u64, requested: u64) -> Result<EligibilityResult, EligibilityError> {
    if salary == 0 {
        return Err(EligibilityError::SalaryUnknown);
    }

    let max_loan_amount = max_loan_amount(salary);
    Ok(EligibilityResult {
        is_eligible: requested <= max_loan_amount,
        max_loan_amount,
        ratio: requested as f64 / salary as f64 * 100.0,
    })
}
