//! Conversions between BN254 scalars and the string forms the circuit and
//! the contract exchange.

use ark_bn254::Fr;
use ark_ff::{BigInt, BigInteger, PrimeField};
use num_bigint::BigUint;

/// Reduce big-endian bytes into the scalar field.
pub fn bytes_to_field(bytes: &[u8]) -> Fr {
    Fr::from_be_bytes_mod_order(bytes)
}

/// Canonical 32-byte big-endian encoding of a field element.
pub fn field_to_bytes32(value: &Fr) -> [u8; 32] {
    let be = value.into_bigint().to_bytes_be();
    let mut out = [0u8; 32];
    out[32 - be.len()..].copy_from_slice(&be);
    out
}

/// `0x` followed by exactly 64 lowercase hex digits.
pub fn field_to_hex(value: &Fr) -> String {
    format!("0x{}", hex::encode(field_to_bytes32(value)))
}

/// Left-pad a big-endian scalar string to 32 bytes.
///
/// Accepts `0x`-prefixed hex or plain decimal. Returns `None` when the value
/// does not fit in 32 bytes or is not a number.
pub fn scalar_to_bytes32(value: &str) -> Option<[u8; 32]> {
    let value = value.trim();
    if let Some(digits) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        let digits = digits.trim_start_matches('0');
        let padded = if digits.len() % 2 == 1 {
            format!("0{digits}")
        } else {
            digits.to_string()
        };
        let bytes = hex::decode(padded).ok()?;
        if bytes.len() > 32 {
            return None;
        }
        let mut out = [0u8; 32];
        out[32 - bytes.len()..].copy_from_slice(&bytes);
        return Some(out);
    }

    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let decimal = BigUint::parse_bytes(value.as_bytes(), 10)?;
    // 4 limbs = 256 bits; anything wider fails the conversion.
    let limbs = BigInt::<4>::try_from(decimal).ok()?;
    let mut out = [0u8; 32];
    out.copy_from_slice(&limbs.to_bytes_be());
    Some(out)
}

/// Parse a field-element string (hex or decimal) into the scalar field.
///
/// Values at or above the modulus are rejected rather than reduced.
pub fn parse_field(value: &str) -> Option<Fr> {
    let bytes = scalar_to_bytes32(value)?;
    let field = bytes_to_field(&bytes);
    (field_to_bytes32(&field) == bytes).then_some(field)
}
