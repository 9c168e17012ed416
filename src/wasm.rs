//! WASM bindings for zk-payroll-loan
//!
//! Exposes the loan proof pipeline to JavaScript via wasm-bindgen. A
//! [`LoanProver`] owns its backend; create one per page and reuse it.

use wasm_bindgen::prelude::*;

use crate::config::ProverConfig;
use crate::pipeline::{LoanProof, LoanProofPipeline};
use crate::progress::ProgressEntry;
use crate::LoanError;

// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn to_js_error(e: LoanError) -> JsValue {
    JsValue::from_str(&format!("{}: {e}", e.kind().as_str()))
}

// ============== RESULT TYPES ==============

/// Loan proof result for JavaScript
#[wasm_bindgen]
pub struct LoanProofResult {
    success: bool,
    error_kind: Option<String>,
    error: Option<String>,
    proof: Option<LoanProof>,
}

impl LoanProofResult {
    fn failed(e: &LoanError) -> Self {
        Self {
            success: false,
            error_kind: Some(e.kind().as_str().to_string()),
            error: Some(e.to_string()),
            proof: None,
        }
    }
}

#[wasm_bindgen]
impl LoanProofResult {
    #[wasm_bindgen(getter)]
    pub fn success(&self) -> bool {
        self.success
    }

    #[wasm_bindgen(getter)]
    pub fn proof_hex(&self) -> String {
        self.proof
            .as_ref()
            .map(|p| p.calldata.proof_hex())
            .unwrap_or_default()
    }

    #[wasm_bindgen(getter)]
    pub fn proof_bytes(&self) -> Vec<u8> {
        self.proof
            .as_ref()
            .map(|p| p.calldata.proof_bytes.clone())
            .unwrap_or_default()
    }

    /// `bytes32` public inputs as hex strings.
    #[wasm_bindgen(getter)]
    pub fn public_inputs(&self) -> Vec<JsValue> {
        self.proof
            .as_ref()
            .map(|p| p.calldata.public_inputs_hex())
            .unwrap_or_default()
            .into_iter()
            .map(JsValue::from)
            .collect()
    }

    #[wasm_bindgen(getter)]
    pub fn nullifier(&self) -> String {
        self.proof
            .as_ref()
            .map(|p| p.artifact.nullifier().to_string())
            .unwrap_or_default()
    }

    /// Loan amount in USDC base units, as a decimal string.
    #[wasm_bindgen(getter)]
    pub fn amount_base_units(&self) -> String {
        self.proof
            .as_ref()
            .map(|p| crate::chain::to_base_units(p.eligibility.requested).to_string())
            .unwrap_or_default()
    }

    /// Full result as JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.proof).unwrap_or_else(|_| "null".to_string())
    }

    #[wasm_bindgen(getter)]
    pub fn error_kind(&self) -> Option<String> {
        self.error_kind.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn error(&self) -> Option<String> {
        self.error.clone()
    }
}

// ============== PROVER ==============

#[wasm_bindgen]
pub struct LoanProver {
    pipeline: LoanProofPipeline,
}

impl LoanProver {
    fn with_config(config: &ProverConfig) -> Result<LoanProver, JsValue> {
        let pipeline = LoanProofPipeline::from_config(config).map_err(to_js_error)?;
        web_sys::console::log_1(
            &format!("✓ Loan prover initialized ({})", pipeline.orchestrator().backend_name()).into(),
        );
        Ok(LoanProver { pipeline })
    }
}

#[wasm_bindgen]
impl LoanProver {
    /// Runs Groth16 setup unless `use_mock` is set; that takes a while.
    #[wasm_bindgen(constructor)]
    pub fn new(use_mock: bool) -> Result<LoanProver, JsValue> {
        let config = ProverConfig {
            use_mock_backend: use_mock,
            ..ProverConfig::default()
        };
        Self::with_config(&config)
    }

    /// Build from a JSON `ProverConfig`.
    pub fn from_config_json(json: &str) -> Result<LoanProver, JsValue> {
        let config: ProverConfig = serde_json::from_str(json)
            .map_err(|e| JsValue::from_str(&format!("config_error: {e}")))?;
        Self::with_config(&config)
    }

    #[wasm_bindgen(getter)]
    pub fn backend(&self) -> String {
        self.pipeline.orchestrator().backend_name().to_string()
    }

    /// Parsed salary and DKIM data as JSON.
    pub fn parse_email(&self, raw_email: &str) -> Result<String, JsValue> {
        let parsed = self.pipeline.parse(raw_email).map_err(to_js_error)?;
        serde_json::to_string(&parsed).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Eligibility report as JSON.
    pub fn check_eligibility(&self, raw_email: &str, requested: u64) -> Result<String, JsValue> {
        let report = self
            .pipeline
            .check_eligibility(raw_email, requested)
            .map_err(to_js_error)?;
        serde_json::to_string(&report).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Generate a loan proof. `on_progress` receives one formatted line per
    /// step; pass `undefined` to log to the console instead.
    pub fn prove_loan(
        &self,
        raw_email: &str,
        requested: u64,
        user_secret: &str,
        on_progress: Option<js_sys::Function>,
    ) -> LoanProofResult {
        let mut sink = |entry: &ProgressEntry| {
            let line = JsValue::from_str(&entry.to_string());
            match &on_progress {
                Some(callback) => {
                    // Callback errors are ignored.
                    let _ = callback.call1(&JsValue::NULL, &line);
                }
                None => web_sys::console::log_1(&line),
            }
        };

        match self
            .pipeline
            .prove_loan(raw_email, requested, user_secret, &mut sink)
        {
            Ok(proof) => LoanProofResult {
                success: true,
                error_kind: None,
                error: None,
                proof: Some(proof),
            },
            Err(e) => {
                web_sys::console::error_1(&format!("Loan proof failed: {e}").into());
                LoanProofResult::failed(&e)
            }
        }
    }
}

// ============== UTILITIES ==============

/// Get version info
#[wasm_bindgen]
pub fn get_version() -> String {
    format!("zk-payroll-loan WASM v{} (Groth16/BN254)", env!("CARGO_PKG_VERSION"))
}

/// Maximum loan for a salary under the 30% cap.
#[wasm_bindgen]
pub fn max_loan_amount(salary: u64) -> u64 {
    crate::eligibility::max_loan_amount(salary)
}
