//! Prover configuration.
//!
//! Built once by the caller (JSON file, environment, or `Default`) and passed
//! into constructors. Nothing here is read lazily or stored globally.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chain::ChainConfig;

/// Groth16 setup seed used when none is configured ("ZKLOANS1").
pub const DEFAULT_SETUP_SEED: u64 = 0x5A4B_4C4F_414E_5331;

pub const ENV_USE_MOCK_BACKEND: &str = "ZKLOAN_USE_MOCK_BACKEND";
pub const ENV_SETUP_SEED: &str = "ZKLOAN_SETUP_SEED";
pub const ENV_CONTRACT_ADDRESS: &str = "ZKLOAN_CONTRACT_ADDRESS";
pub const ENV_CHAIN_ID: &str = "ZKLOAN_CHAIN_ID";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid value {value:?} for {name}")]
    InvalidEnv { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProverConfig {
    /// Swap Groth16 for the deterministic mock backend.
    pub use_mock_backend: bool,
    pub setup_seed: u64,
    /// SPKI PEM of the signer's DKIM key. Placeholder limbs when absent.
    pub dkim_public_key_pem: Option<String>,
    pub chain: ChainConfig,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            use_mock_backend: false,
            setup_seed: DEFAULT_SETUP_SEED,
            dkim_public_key_pem: None,
            chain: ChainConfig::default(),
        }
    }
}

impl ProverConfig {
    /// Config for the mock backend, everything else default.
    pub fn mock() -> Self {
        Self {
            use_mock_backend: true,
            ..Self::default()
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Defaults overridden by any `ZKLOAN_*` variable that is set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_USE_MOCK_BACKEND) {
            config.use_mock_backend = match value.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" | "" => false,
                _ => return Err(invalid(ENV_USE_MOCK_BACKEND, value)),
            };
        }
        if let Some(value) = lookup(ENV_SETUP_SEED) {
            config.setup_seed = parse_seed(&value).ok_or_else(|| invalid(ENV_SETUP_SEED, value))?;
        }
        if let Some(value) = lookup(ENV_CONTRACT_ADDRESS).filter(|v| !v.trim().is_empty()) {
            config.chain.contract_address = Some(value.trim().to_string());
        }
        if let Some(value) = lookup(ENV_CHAIN_ID) {
            let chain_id = value
                .trim()
                .parse()
                .map_err(|_| invalid(ENV_CHAIN_ID, value.clone()))?;
            config.chain.chain_id = Some(chain_id);
        }

        Ok(config)
    }
}

fn invalid(name: &'static str, value: String) -> ConfigError {
    ConfigError::InvalidEnv { name, value }
}

/// Decimal or `0x` hex.
fn parse_seed(value: &str) -> Option<u64> {
    let value = value.trim();
    match value.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ProverConfig::default();
        assert!(!config.use_mock_backend);
        assert_eq!(config.setup_seed, DEFAULT_SETUP_SEED);
        assert_eq!(config.chain, ChainConfig::default());
        assert!(ProverConfig::mock().use_mock_backend);
    }

    #[test]
    fn test_env_overrides() {
        let config = ProverConfig::from_lookup(lookup(&[
            (ENV_USE_MOCK_BACKEND, "true"),
            (ENV_SETUP_SEED, "0x2a"),
            (ENV_CONTRACT_ADDRESS, "0x00000000000000000000000000000000000000aa"),
            (ENV_CHAIN_ID, "84532"),
        ]))
        .unwrap();

        assert!(config.use_mock_backend);
        assert_eq!(config.setup_seed, 42);
        assert_eq!(
            config.chain.contract_address.as_deref(),
            Some("0x00000000000000000000000000000000000000aa")
        );
        assert_eq!(config.chain.chain_id, Some(84532));
    }

    #[test]
    fn test_env_rejects_garbage() {
        let err = ProverConfig::from_lookup(lookup(&[(ENV_CHAIN_ID, "mainnet")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { name: ENV_CHAIN_ID, .. }));

        let err = ProverConfig::from_lookup(lookup(&[(ENV_USE_MOCK_BACKEND, "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }

    #[test]
    fn test_json_partial_uses_defaults() {
        let config: ProverConfig =
            serde_json::from_str(r#"{"useMockBackend": true, "chain": {"chainId": 8453}}"#).unwrap();
        assert!(config.use_mock_backend);
        assert_eq!(config.setup_seed, DEFAULT_SETUP_SEED);
        assert_eq!(config.chain.chain_id, Some(8453));
        assert_eq!(config.chain.contract_address, None);
    }

    #[test]
    fn test_json_file() {
        let path = std::env::temp_dir().join(format!("zkloan-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"setupSeed": 7}"#).unwrap();
        let config = ProverConfig::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.setup_seed, 7);

        assert!(matches!(
            ProverConfig::from_json_file(&path),
            Err(ConfigError::Io(_))
        ));
    }
}
