//! Salary verification emails.
//!
//! An employer sends a DKIM-signed `.eml` carrying the salary either in
//! custom `X-` headers or as `KEY: value` lines in the body. This module
//! splits the message, pattern-matches the DKIM signature and resolves
//! every salary field independently through header → body → default.

pub mod dkim;

use mailparse::{MailHeader, MailHeaderMap};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use dkim::{DkimTags, Sequence, DEFAULT_SELECTOR};

/// Errors raised while reading a salary email.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// No blank line separates headers from body.
    #[error("malformed email: no blank line between headers and body; re-export the original .eml")]
    MalformedEmail,

    #[error("malformed email headers: {0}")]
    InvalidHeaders(String),

    /// No `DKIM-Signature` of the form `v=1; a=rsa-sha256; c=relaxed/relaxed; d=..; b=..`.
    #[error("missing DKIM signature: the email must be exported with its DKIM-Signature header intact")]
    MissingDkimSignature,
}

/// Salary facts extracted from the email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryData {
    pub salary_amount: String,
    pub wallet_address: String,
    pub employee_name: String,
    pub company_email: String,
    pub position: String,
    pub company: String,
    pub pay_period: String,
    pub zk_reference: String,
}

impl SalaryData {
    /// Salary as an integer. Tolerates a leading `$` and `,` separators.
    pub fn salary_as_integer(&self) -> Option<u64> {
        let cleaned: String = self
            .salary_amount
            .trim()
            .trim_start_matches('$')
            .chars()
            .filter(|c| *c != ',')
            .collect();
        if cleaned.is_empty() || !cleaned.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        cleaned.parse().ok()
    }
}

/// DKIM-related pieces of the email, passed through to the circuit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DkimData {
    pub header: String,
    pub body: String,
    pub signature: String,
    pub domain: String,
    pub selector: String,
    pub body_hash: String,
    /// Span of the chosen `DKIM-Signature` field inside `header`.
    pub header_sequence: Sequence,
    /// Offset of that field's `bh=` value inside `header`; 0 when absent.
    pub body_hash_index: usize,
}

/// Result of [`SalaryEmailParser::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedSalaryEmail {
    pub salary_data: SalaryData,
    pub dkim_data: DkimData,
}

/// One salary field and where to look for it.
struct FieldSource {
    header: &'static str,
    body_key: &'static str,
    default: &'static str,
}

const SALARY_AMOUNT: FieldSource = FieldSource { header: "X-Salary-Amount", body_key: "SALARY_AMOUNT", default: "" };
const WALLET_ADDRESS: FieldSource = FieldSource { header: "X-Wallet-Address", body_key: "WALLET_ADDRESS", default: "" };
const EMPLOYEE_NAME: FieldSource = FieldSource { header: "X-Employee-Name", body_key: "EMPLOYEE_NAME", default: "" };
const COMPANY_EMAIL: FieldSource = FieldSource { header: "X-Company-Email", body_key: "COMPANY_EMAIL", default: "" };
const POSITION: FieldSource = FieldSource { header: "X-Position", body_key: "POSITION", default: "Senior Software Engineer" };
const COMPANY: FieldSource = FieldSource { header: "X-Company-Name", body_key: "COMPANY_NAME", default: "TechCorp Inc" };
const PAY_PERIOD: FieldSource = FieldSource { header: "X-Salary-Month", body_key: "SALARY_MONTH", default: "August 2023" };
const ZK_REFERENCE: FieldSource = FieldSource { header: "X-ZK-Reference", body_key: "ZK_REFERENCE", default: "ZK-VERIFY-DEFAULT" };

/// Parser for DKIM-signed salary emails.
pub struct SalaryEmailParser;

impl SalaryEmailParser {
    /// Parse a raw `.eml` into salary and DKIM data.
    pub fn parse(raw_email: &str) -> Result<ParsedSalaryEmail, ParseError> {
        let (header, body) = split_header_body(raw_email).ok_or(ParseError::MalformedEmail)?;

        // mailparse stops at the first blank line, so terminate the block.
        let header_block = format!("{header}\n\n");
        let (headers, _) = mailparse::parse_headers(header_block.as_bytes())
            .map_err(|e| ParseError::InvalidHeaders(e.to_string()))?;

        let dkim_data = Self::extract_dkim(header, body)?;

        let resolve = |source: &FieldSource| resolve_field(&headers, body, source);
        let salary_data = SalaryData {
            salary_amount: resolve_salary(&headers, body),
            wallet_address: resolve(&WALLET_ADDRESS),
            employee_name: resolve(&EMPLOYEE_NAME),
            company_email: resolve(&COMPANY_EMAIL),
            position: resolve(&POSITION),
            company: resolve(&COMPANY),
            pay_period: resolve(&PAY_PERIOD),
            zk_reference: resolve(&ZK_REFERENCE),
        };

        tracing::debug!(
            domain = %dkim_data.domain,
            selector = %dkim_data.selector,
            header_len = header.len(),
            body_len = body.len(),
            "parsed salary email"
        );

        Ok(ParsedSalaryEmail {
            salary_data,
            dkim_data,
        })
    }

    /// First `DKIM-Signature` field that passes the structural checks. Its
    /// span and `bh=` offset are recorded against the same field.
    fn extract_dkim(header: &str, body: &str) -> Result<DkimData, ParseError> {
        let (header_sequence, tags) = dkim::dkim_header_sequences(header)
            .into_iter()
            .filter_map(|span| Some((span, DkimTags::from_field(span.slice(header)?))))
            .find(|(_, tags)| {
                tags.is_relaxed_rsa_sha256()
                    && tags.get("d").map_or(false, |d| !d.is_empty())
                    && tags.compact("b").is_some()
            })
            .ok_or(ParseError::MissingDkimSignature)?;

        let domain = tags.get("d").unwrap_or_default().to_string();
        let signature = tags.compact("b").unwrap_or_default();
        let selector = tags
            .get("s")
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SELECTOR)
            .to_string();
        let body_hash = tags.compact("bh").unwrap_or_default();

        Ok(DkimData {
            header: header.to_string(),
            body: body.to_string(),
            signature,
            domain,
            selector,
            body_hash,
            body_hash_index: dkim::body_hash_index(header, header_sequence).unwrap_or(0),
            header_sequence,
        })
    }
}

/// Split at the first blank line, LF or CRLF.
fn split_header_body(raw: &str) -> Option<(&str, &str)> {
    let lf = raw.find("\n\n").map(|i| (i, 2));
    let crlf = raw.find("\r\n\r\n").map(|i| (i, 4));
    let (at, separator_len) = match (lf, crlf) {
        (Some(a), Some(b)) => {
            if a.0 <= b.0 {
                a
            } else {
                b
            }
        }
        (a, b) => a.or(b)?,
    };
    Some((&raw[..at], &raw[at + separator_len..]))
}

fn resolve_field(headers: &[MailHeader], body: &str, source: &FieldSource) -> String {
    lookup_field(headers, body, source).unwrap_or_else(|| source.default.to_string())
}

fn lookup_field(headers: &[MailHeader], body: &str, source: &FieldSource) -> Option<String> {
    headers
        .get_first_value(source.header)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| body_value(body, source.body_key))
}

/// Salary has one more fallback before the default: prose lines such as
/// `Annual salary: $120,000`.
fn resolve_salary(headers: &[MailHeader], body: &str) -> String {
    lookup_field(headers, body, &SALARY_AMOUNT)
        .or_else(|| salary_from_prose(body))
        .unwrap_or_else(|| SALARY_AMOUNT.default.to_string())
}

/// Tried in order; the first label followed by a number wins.
const SALARY_PROSE_LABELS: [&str; 4] = ["ANNUAL SALARY", "SALARY", "GROSS PAY", "INCOME"];

/// Digits after a salary label, `$` and `,` stripped.
fn salary_from_prose(body: &str) -> Option<String> {
    SALARY_PROSE_LABELS.iter().find_map(|label| {
        let pattern = format!(r"(?i){}[:\s]+\$?([0-9][0-9,]*)", regex::escape(label));
        let re = Regex::new(&pattern).ok()?;
        re.captures(body)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().replace(',', ""))
    })
}

/// First `KEY: value` line in the body (case-insensitive key).
fn body_value(body: &str, key: &str) -> Option<String> {
    let pattern = format!(r"(?mi)^[ \t]*{}[ \t]*:[ \t]*(.+?)[ \t\r]*$", regex::escape(key));
    let re = Regex::new(&pattern).ok()?;
    re.captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|v| !v.is_empty())
}
