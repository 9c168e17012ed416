//! Nullifier and domain hash derivation.
//!
//! Every value here ends up as a public input of the loan proof, so each
//! digest is reduced into the BN254 scalar field and rendered as `0x` plus
//! 64 hex digits.
//!
//! - `secret_field = SHA-256(SECRET_TAG ‖ len ‖ secret) mod r`
//! - `nullifier    = Poseidon(NULLIFIER_TAG, secret_field, salary)`
//! - `domain_hash  = SHA-256(DOMAIN_TAG ‖ len ‖ lowercase(domain)) mod r`
//!
//! Inputs enter the sponge as separate typed elements, so swapping the
//! secret and the salary never produces the same nullifier.

pub mod field;
pub mod poseidon;

use std::fmt;

use ark_bn254::Fr;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub use field::{bytes_to_field, field_to_bytes32, field_to_hex, parse_field, scalar_to_bytes32};
pub use poseidon::PoseidonHasher;

const SECRET_TAG: &[u8] = b"zkloan/user-secret/v1";
const NULLIFIER_TAG: &[u8] = b"zkloan/nullifier/v1";
const DOMAIN_TAG: &[u8] = b"zkloan/dkim-domain/v1";

/// Double-spend guard for one (secret, salary) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nullifier(#[serde(with = "field_hex")] pub Fr);

/// Binds a proof to the DKIM signing domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainHash(#[serde(with = "field_hex")] pub Fr);

impl Nullifier {
    pub fn to_hex(&self) -> String {
        field_to_hex(&self.0)
    }
}

impl DomainHash {
    pub fn to_hex(&self) -> String {
        field_to_hex(&self.0)
    }
}

impl fmt::Display for Nullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Display for DomainHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// SHA-256 over `tag ‖ u64-be(len(data)) ‖ data`, reduced into the field.
fn tagged_digest(tag: &[u8], data: &[u8]) -> Fr {
    let mut hasher = Sha256::new();
    hasher.update((tag.len() as u64).to_be_bytes());
    hasher.update(tag);
    hasher.update((data.len() as u64).to_be_bytes());
    hasher.update(data);
    bytes_to_field(&hasher.finalize())
}

/// Field element the circuit receives as `user_secret`.
pub fn secret_to_field(user_secret: &str) -> Fr {
    tagged_digest(SECRET_TAG, user_secret.as_bytes())
}

/// Constant first element of the nullifier sponge.
pub fn nullifier_tag() -> Fr {
    tagged_digest(NULLIFIER_TAG, &[])
}

/// Nullifier from an already-derived secret field element.
pub fn nullifier_from_field(secret_field: Fr, salary_amount: u64) -> Nullifier {
    let hasher = PoseidonHasher::new();
    Nullifier(hasher.hash_many(&[nullifier_tag(), secret_field, Fr::from(salary_amount)]))
}

/// Deterministic nullifier for `(user_secret, salary_amount)`.
pub fn nullifier(user_secret: &str, salary_amount: u64) -> Nullifier {
    nullifier_from_field(secret_to_field(user_secret), salary_amount)
}

/// Hash of the DKIM `d=` domain. Domains are case-insensitive.
pub fn domain_hash(domain: &str) -> DomainHash {
    DomainHash(tagged_digest(DOMAIN_TAG, domain.trim().to_lowercase().as_bytes()))
}

mod field_hex {
    use ark_bn254::Fr;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Fr, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::field_to_hex(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Fr, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_field(&raw).ok_or_else(|| D::Error::custom("invalid field element"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nullifier_deterministic() {
        assert_eq!(nullifier("secret", 120_000), nullifier("secret", 120_000));
    }

    #[test]
    fn test_nullifier_changes_with_either_input() {
        let base = nullifier("secret", 120_000);
        assert_ne!(base, nullifier("secret2", 120_000));
        assert_ne!(base, nullifier("secret", 120_001));
    }

    #[test]
    fn test_nullifier_not_concatenation_ambiguous() {
        // "ab" + "c" vs "a" + "bc" would collide under naive concatenation.
        assert_ne!(nullifier("12", 3), nullifier("1", 23));
    }

    #[test]
    fn test_hex_width() {
        let n = nullifier("secret", 1);
        let hex = n.to_hex();
        assert!(hex.starts_with("0x"));
        assert_eq!(hex.len(), 66);
        assert_eq!(domain_hash("techcorp.com").to_hex().len(), 66);
    }

    #[test]
    fn test_domain_hash_case_insensitive() {
        assert_eq!(domain_hash("TechCorp.com"), domain_hash("techcorp.com"));
        assert_ne!(domain_hash("techcorp.com"), domain_hash("othercorp.com"));
    }

    #[test]
    fn test_serde_as_hex() {
        let n = nullifier("secret", 42);
        let json = serde_json::to_string(&n).unwrap();
        assert_eq!(json, format!("\"{}\"", n.to_hex()));
        let back: Nullifier = serde_json::from_str(&json).unwrap();
        assert_eq!(back, n);
    }
}
