//! Encoding for the loan contract's `takeLoan` / `repayLoan` calls.
//!
//! Both functions take `(bytes proof, bytes32[] publicInputs)`; `takeLoan`
//! additionally takes the amount in token base units. Sending the
//! transaction is the caller's business.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::ProofArtifact;
use crate::hash::scalar_to_bytes32;

/// Decimals of the loan token (USDC).
pub const TOKEN_DECIMALS: u32 = 6;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("public input {index} ({value:?}) does not fit in 32 bytes")]
    InvalidPublicInput { index: usize, value: String },
}

/// Deployment coordinates of the loan contract. Opaque to the proof core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    pub contract_address: Option<String>,
    pub chain_id: Option<u64>,
}

/// Proof and public inputs in contract ABI shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainCalldata {
    pub proof_bytes: Vec<u8>,
    pub public_inputs_bytes32: Vec<[u8; 32]>,
}

impl ChainCalldata {
    pub fn proof_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.proof_bytes))
    }

    /// Each entry is `0x` + 64 hex digits.
    pub fn public_inputs_hex(&self) -> Vec<String> {
        self.public_inputs_bytes32
            .iter()
            .map(|word| format!("0x{}", hex::encode(word)))
            .collect()
    }
}

impl Serialize for ChainCalldata {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("ChainCalldata", 2)?;
        state.serialize_field("proofBytes", &self.proof_hex())?;
        state.serialize_field("publicInputsBytes32", &self.public_inputs_hex())?;
        state.end()
    }
}

/// Zero-pad every public input to a big-endian 32-byte word.
pub fn encode_for_chain(artifact: &ProofArtifact) -> Result<ChainCalldata, ChainError> {
    let public_inputs_bytes32 = artifact
        .public_inputs
        .iter()
        .enumerate()
        .map(|(index, value)| {
            scalar_to_bytes32(value).ok_or_else(|| ChainError::InvalidPublicInput {
                index,
                value: value.clone(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ChainCalldata {
        proof_bytes: artifact.proof.clone(),
        public_inputs_bytes32,
    })
}

/// Whole token units to base units.
pub fn to_base_units(amount: u64) -> u128 {
    u128::from(amount) * 10u128.pow(TOKEN_DECIMALS)
}

/// A contract call ready to hand to a wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoanCall {
    TakeLoan {
        amount_base_units: u128,
        calldata: ChainCalldata,
    },
    RepayLoan {
        calldata: ChainCalldata,
    },
}

impl LoanCall {
    pub fn take_loan(amount: u64, calldata: ChainCalldata) -> Self {
        Self::TakeLoan {
            amount_base_units: to_base_units(amount),
            calldata,
        }
    }

    pub fn repay_loan(calldata: ChainCalldata) -> Self {
        Self::RepayLoan { calldata }
    }

    pub fn function_name(&self) -> &'static str {
        match self {
            Self::TakeLoan { .. } => "takeLoan",
            Self::RepayLoan { .. } => "repayLoan",
        }
    }

    pub fn calldata(&self) -> &ChainCalldata {
        match self {
            Self::TakeLoan { calldata, .. } | Self::RepayLoan { calldata } => calldata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(inputs: [&str; 3]) -> ProofArtifact {
        ProofArtifact {
            proof: vec![0xde, 0xad],
            public_inputs: inputs.map(str::to_string),
        }
    }

    #[test]
    fn test_encodes_three_words() {
        let calldata = encode_for_chain(&artifact(["1", "0x2a", "0x00ff"])).unwrap();

        assert_eq!(calldata.public_inputs_bytes32.len(), 3);
        assert_eq!(calldata.public_inputs_bytes32[0][31], 1);
        assert_eq!(calldata.public_inputs_bytes32[1][31], 0x2a);
        assert_eq!(calldata.public_inputs_bytes32[2][31], 0xff);
        assert!(calldata.public_inputs_bytes32[0][..31].iter().all(|b| *b == 0));

        for word in calldata.public_inputs_hex() {
            assert_eq!(word.strip_prefix("0x").unwrap().len(), 64);
        }
        assert_eq!(calldata.proof_hex(), "0xdead");
    }

    #[test]
    fn test_rejects_oversized_input() {
        let too_big = format!("0x{}", "11".repeat(33));
        let err = encode_for_chain(&artifact(["1", &too_big, "0"])).unwrap_err();
        assert!(matches!(err, ChainError::InvalidPublicInput { index: 1, .. }));
    }

    #[test]
    fn test_take_loan_uses_base_units() {
        let calldata = encode_for_chain(&artifact(["1", "2", "3"])).unwrap();
        let call = LoanCall::take_loan(30_000, calldata.clone());

        assert_eq!(call.function_name(), "takeLoan");
        assert_eq!(
            call,
            LoanCall::TakeLoan {
                amount_base_units: 30_000_000_000,
                calldata: calldata.clone()
            }
        );
        assert_eq!(LoanCall::repay_loan(calldata).function_name(), "repayLoan");
    }

    #[test]
    fn test_calldata_json() {
        let calldata = encode_for_chain(&artifact(["1", "2", "3"])).unwrap();
        let json = serde_json::to_value(&calldata).unwrap();
        assert_eq!(json["proofBytes"], "0xdead");
        assert_eq!(json["publicInputsBytes32"].as_array().unwrap().len(), 3);
    }
}
