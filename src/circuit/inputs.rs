//! Fixed-shape inputs for the loan circuit.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::eligibility::max_loan_amount;
use crate::email::dkim::{self, RsaPubkeyLimbs, Sequence};
use crate::email::{DkimData, SalaryData};
use crate::hash::{self, field_to_hex};

/// Header storage size in bytes.
pub const MAX_HEADER_LEN: usize = 512;
/// Body storage size in bytes.
pub const MAX_BODY_LEN: usize = 1024;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("salary not found")]
    SalaryNotFound,

    #[error("DKIM signature is not valid base64: {0}")]
    InvalidSignature(String),

    #[error("invalid DKIM public key: {0}")]
    InvalidPublicKey(String),
}

/// Zero-padded byte storage of exactly `N` bytes plus its logical length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundedBytes<const N: usize> {
    pub storage: Vec<u8>,
    pub len: usize,
}

impl<const N: usize> BoundedBytes<N> {
    /// Copy as much of `data` as fits; the rest is dropped.
    pub fn from_slice(data: &[u8]) -> Self {
        let len = data.len().min(N);
        let mut storage = vec![0u8; N];
        storage[..len].copy_from_slice(&data[..len]);
        Self { storage, len }
    }

    pub const fn capacity() -> usize {
        N
    }

    /// Meaningful prefix of the storage.
    pub fn as_bytes(&self) -> &[u8] {
        &self.storage[..self.len.min(self.storage.len())]
    }

    /// Storage has exactly `N` bytes and the length fits inside it.
    pub fn is_well_formed(&self) -> bool {
        self.storage.len() == N && self.len <= N && self.storage[self.len..].iter().all(|b| *b == 0)
    }
}

/// This crate never checks the RSA signature; the flag travels with the
/// inputs so nobody mistakes a pattern-matched email for a verified one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DkimVerification {
    NotImplemented,
}

/// Everything the loan circuit consumes. Scalars are field-element strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitInputs {
    pub header: BoundedBytes<MAX_HEADER_LEN>,
    pub body: BoundedBytes<MAX_BODY_LEN>,
    pub pubkey: RsaPubkeyLimbs,
    pub signature: Vec<String>,
    pub body_hash_index: usize,
    pub dkim_header_sequence: Sequence,

    // private
    pub loan_amount: String,
    pub user_secret: String,
    pub expected_salary: String,

    // public, in this order
    pub loan_eligibility: String,
    pub nullifier: String,
    pub domain_hash: String,

    pub dkim_verification: DkimVerification,
}

impl CircuitInputs {
    /// `[loan_eligibility, nullifier, domain_hash]`.
    pub fn public_outputs(&self) -> [String; 3] {
        [
            self.loan_eligibility.clone(),
            self.nullifier.clone(),
            self.domain_hash.clone(),
        ]
    }
}

/// Turns parsed email data plus a loan request into [`CircuitInputs`].
#[derive(Debug, Clone)]
pub struct CircuitInputBuilder {
    pubkey: RsaPubkeyLimbs,
}

impl Default for CircuitInputBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitInputBuilder {
    /// Builder using placeholder key limbs.
    pub fn new() -> Self {
        Self {
            pubkey: RsaPubkeyLimbs::placeholder(),
        }
    }

    /// Use the signer's RSA key given as an SPKI PEM.
    pub fn with_public_key_pem(pem: &str) -> Result<Self, BuildError> {
        let pubkey = RsaPubkeyLimbs::from_pem(pem).map_err(BuildError::InvalidPublicKey)?;
        Ok(Self { pubkey })
    }

    /// Use the `p=` tag of the signer's `_domainkey` TXT record.
    pub fn with_dns_public_key(p_tag: &str) -> Result<Self, BuildError> {
        let pubkey = RsaPubkeyLimbs::from_dns_p_tag(p_tag).map_err(BuildError::InvalidPublicKey)?;
        Ok(Self { pubkey })
    }

    pub fn pubkey(&self) -> &RsaPubkeyLimbs {
        &self.pubkey
    }

    pub fn build(
        &self,
        dkim_data: &DkimData,
        salary_data: &SalaryData,
        requested_amount: u64,
        user_secret: &str,
    ) -> Result<CircuitInputs, BuildError> {
        let salary = salary_data
            .salary_as_integer()
            .ok_or(BuildError::SalaryNotFound)?;

        let signature = dkim::signature_limbs(&dkim_data.signature)
            .map_err(|e| BuildError::InvalidSignature(e.to_string()))?;

        let secret_field = hash::secret_to_field(user_secret);
        let nullifier = hash::nullifier_from_field(secret_field, salary);
        let domain_hash = hash::domain_hash(&dkim_data.domain);
        let eligible = requested_amount <= max_loan_amount(salary);

        let header = BoundedBytes::from_slice(dkim_data.header.as_bytes());
        let body = BoundedBytes::from_slice(dkim_data.body.as_bytes());
        if header.len < dkim_data.header.len() || body.len < dkim_data.body.len() {
            tracing::warn!(
                header_len = dkim_data.header.len(),
                body_len = dkim_data.body.len(),
                "email exceeds circuit storage, truncating"
            );
        }

        Ok(CircuitInputs {
            header,
            body,
            pubkey: self.pubkey.clone(),
            signature,
            body_hash_index: dkim_data.body_hash_index,
            dkim_header_sequence: dkim_data.header_sequence,
            loan_amount: requested_amount.to_string(),
            user_secret: field_to_hex(&secret_field),
            expected_salary: salary.to_string(),
            loan_eligibility: if eligible { "1" } else { "0" }.to_string(),
            nullifier: nullifier.to_hex(),
            domain_hash: domain_hash.to_hex(),
            dkim_verification: DkimVerification::NotImplemented,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::dkim::{KeySource, Sequence, KEY_LIMBS_2048};
    use proptest::prelude::*;

    fn dkim_data(header: &str, body: &str) -> DkimData {
        DkimData {
            header: header.to_string(),
            body: body.to_string(),
            signature: "dGVzdHNpZ25hdHVyZQ==".to_string(),
            domain: "techcorp.com".to_string(),
            selector: "s1".to_string(),
            body_hash: String::new(),
            header_sequence: Sequence::default(),
            body_hash_index: 0,
        }
    }

    fn salary_data(amount: &str) -> SalaryData {
        SalaryData {
            salary_amount: amount.to_string(),
            wallet_address: "0xabc".to_string(),
            employee_name: "Alice".to_string(),
            company_email: "hr@techcorp.com".to_string(),
            position: "Engineer".to_string(),
            company: "TechCorp Inc".to_string(),
            pay_period: "August 2023".to_string(),
            zk_reference: "ZK-1".to_string(),
        }
    }

    #[test]
    fn test_short_content_is_zero_padded() {
        let bytes = BoundedBytes::<8>::from_slice(b"abc");
        assert_eq!(bytes.storage, vec![b'a', b'b', b'c', 0, 0, 0, 0, 0]);
        assert_eq!(bytes.len, 3);
        assert_eq!(bytes.as_bytes(), b"abc");
        assert!(bytes.is_well_formed());
    }

    #[test]
    fn test_long_content_is_truncated() {
        let bytes = BoundedBytes::<4>::from_slice(b"abcdefgh");
        assert_eq!(bytes.storage, b"abcd".to_vec());
        assert_eq!(bytes.len, 4);
    }

    #[test]
    fn test_build_outputs() {
        let builder = CircuitInputBuilder::new();
        let inputs = builder
            .build(&dkim_data("From: hr@techcorp.com", "body"), &salary_data("120000"), 30_000, "secret")
            .unwrap();

        assert_eq!(inputs.header.storage.len(), MAX_HEADER_LEN);
        assert_eq!(inputs.body.storage.len(), MAX_BODY_LEN);
        assert_eq!(inputs.header.len, "From: hr@techcorp.com".len());
        assert_eq!(inputs.loan_amount, "30000");
        assert_eq!(inputs.expected_salary, "120000");
        assert_eq!(inputs.loan_eligibility, "1");
        assert_eq!(inputs.nullifier, hash::nullifier("secret", 120_000).to_hex());
        assert_eq!(inputs.domain_hash, hash::domain_hash("techcorp.com").to_hex());
        assert_eq!(
            inputs.public_outputs(),
            [inputs.loan_eligibility.clone(), inputs.nullifier.clone(), inputs.domain_hash.clone()]
        );
        assert_eq!(inputs.signature.len(), KEY_LIMBS_2048);
        assert_eq!(inputs.pubkey.source, KeySource::Placeholder);
        assert_eq!(&inputs.pubkey, CircuitInputBuilder::new().pubkey());
        assert_eq!(inputs.dkim_verification, DkimVerification::NotImplemented);
    }

    #[test]
    fn test_offsets_follow_chosen_signature() {
        let raw = "DKIM-Signature: v=1; a=rsa-sha256; c=simple/simple; d=esp-mailer.net;\n\tbh=ESPHASH=; b=RVNQ\n\
DKIM-Signature: v=1; a=rsa-sha256; c=relaxed/relaxed; d=techcorp.com;\n\tbh=CORPHASH=; b=Q09SUA==\n\
\nSALARY_AMOUNT: 120000\n";
        let parsed = crate::email::SalaryEmailParser::parse(raw).unwrap();
        let inputs = CircuitInputBuilder::new()
            .build(&parsed.dkim_data, &parsed.salary_data, 30_000, "s")
            .unwrap();

        let header = inputs.header.as_bytes();
        let seq = inputs.dkim_header_sequence;
        let field = std::str::from_utf8(&header[seq.index..seq.index + seq.length]).unwrap();
        assert!(field.contains("d=techcorp.com"));
        assert!(header[inputs.body_hash_index..].starts_with(b"CORPHASH="));
        assert_eq!(inputs.domain_hash, hash::domain_hash("techcorp.com").to_hex());
    }

    #[test]
    fn test_secret_not_embedded_raw() {
        let inputs = CircuitInputBuilder::new()
            .build(&dkim_data("h", "b"), &salary_data("1000"), 1, "hunter2")
            .unwrap();
        assert!(!inputs.user_secret.contains("hunter2"));
        assert!(!format!("{inputs:?}").contains("hunter2"));
    }

    #[test]
    fn test_ineligible_flag() {
        let inputs = CircuitInputBuilder::new()
            .build(&dkim_data("h", "b"), &salary_data("120000"), 40_000, "s")
            .unwrap();
        assert_eq!(inputs.loan_eligibility, "0");
    }

    #[test]
    fn test_salary_not_found() {
        let builder = CircuitInputBuilder::new();
        let err = builder
            .build(&dkim_data("h", "b"), &salary_data(""), 1, "s")
            .unwrap_err();
        assert_eq!(err, BuildError::SalaryNotFound);
        assert_eq!(err.to_string(), "salary not found");

        let err = builder
            .build(&dkim_data("h", "b"), &salary_data("lots"), 1, "s")
            .unwrap_err();
        assert_eq!(err, BuildError::SalaryNotFound);
    }

    #[test]
    fn test_invalid_signature() {
        let mut dkim = dkim_data("h", "b");
        dkim.signature = "%%%".to_string();
        let err = CircuitInputBuilder::new()
            .build(&dkim, &salary_data("1000"), 1, "s")
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidSignature(_)));
    }

    #[test]
    fn test_invalid_public_key() {
        assert!(matches!(
            CircuitInputBuilder::with_public_key_pem("not a pem"),
            Err(BuildError::InvalidPublicKey(_))
        ));
        assert!(matches!(
            CircuitInputBuilder::with_dns_public_key("AAAA"),
            Err(BuildError::InvalidPublicKey(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_buffers_always_full_size(header in ".{0,700}", body in ".{0,1400}") {
            let inputs = CircuitInputBuilder::new()
                .build(&dkim_data(&header, &body), &salary_data("50000"), 100, "s")
                .unwrap();
            prop_assert_eq!(inputs.header.storage.len(), MAX_HEADER_LEN);
            prop_assert_eq!(inputs.body.storage.len(), MAX_BODY_LEN);
            prop_assert_eq!(inputs.header.len, header.len().min(MAX_HEADER_LEN));
            prop_assert_eq!(inputs.body.len, body.len().min(MAX_BODY_LEN));
            prop_assert!(inputs.header.is_well_formed());
            prop_assert!(inputs.body.is_well_formed());
        }
    }
}
