//! Loan circuit: its inputs and its R1CS constraint system.

pub mod inputs;
mod loan_circuit;

pub use inputs::{
    BoundedBytes, BuildError, CircuitInputBuilder, CircuitInputs, DkimVerification, MAX_BODY_LEN,
    MAX_HEADER_LEN,
};
pub use loan_circuit::{LoanAssignment, LoanEligibilityCircuit, AMOUNT_BITS};
