//! `DKIM-Signature` tag parsing and the numeric forms the circuit expects.
//!
//! Nothing here verifies a signature. Tags are matched structurally, the
//! `b=` value is decoded into limbs and the header offsets are located so
//! that a DKIM-verifying circuit can be fed later.

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rsa::{
    pkcs8::DecodePublicKey,
    traits::PublicKeyParts,
    RsaPublicKey,
};
use serde::{Deserialize, Serialize};

/// Limb width used by the RSA gadgets.
pub const LIMB_BITS: usize = 120;
/// Limbs for a 2048-bit modulus or signature (`ceil(2048 / 120)`).
pub const KEY_LIMBS_2048: usize = 18;
/// Exponent used by every placeholder key.
pub const DEFAULT_EXPONENT: u64 = 65537;

/// Selector used when the signature has no `s=` tag.
pub const DEFAULT_SELECTOR: &str = "s1";

/// Parsed `tag=value` list of a DKIM-Signature header.
#[derive(Debug, Clone, Default)]
pub struct DkimTags {
    tags: HashMap<String, String>,
}

impl DkimTags {
    /// Split an unfolded header value on `;` into lowercase tag names.
    pub fn parse(value: &str) -> Self {
        let tags = value
            .split(';')
            .filter_map(|part| part.split_once('='))
            .map(|(name, value)| (name.trim().to_lowercase(), value.trim().to_string()))
            .filter(|(name, _)| !name.is_empty())
            .collect();
        Self { tags }
    }

    /// Tags of a raw `DKIM-Signature: ...` field, folded lines included.
    pub fn from_field(field: &str) -> Self {
        Self::parse(field.split_once(':').map_or(field, |(_, value)| value))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(String::as_str)
    }

    /// Tag value with all whitespace removed (for base64 tags like `b=`).
    pub fn compact(&self, name: &str) -> Option<String> {
        self.get(name)
            .map(|v| v.chars().filter(|c| !c.is_whitespace()).collect::<String>())
            .filter(|v| !v.is_empty())
    }

    /// `v=1; a=rsa-sha256; c=relaxed/relaxed` are all present.
    pub fn is_relaxed_rsa_sha256(&self) -> bool {
        self.get("v") == Some("1")
            && self.get("a").map(str::to_lowercase).as_deref() == Some("rsa-sha256")
            && self.get("c").map(str::to_lowercase).as_deref() == Some("relaxed/relaxed")
    }
}

/// Where the RSA key limbs came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySource {
    /// Filler limbs; the proof does not bind any real DKIM key.
    Placeholder,
    /// Limbs derived from a caller-supplied DKIM public key.
    Supplied,
}

/// RSA public key as circuit limbs (little-endian, decimal strings).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsaPubkeyLimbs {
    pub modulus: Vec<String>,
    pub exponent: String,
    pub source: KeySource,
}

impl RsaPubkeyLimbs {
    pub fn placeholder() -> Self {
        Self {
            modulus: vec!["1".to_string(); KEY_LIMBS_2048],
            exponent: DEFAULT_EXPONENT.to_string(),
            source: KeySource::Placeholder,
        }
    }

    /// From an SPKI PEM (`-----BEGIN PUBLIC KEY-----`).
    pub fn from_pem(pem: &str) -> Result<Self, String> {
        let key = RsaPublicKey::from_public_key_pem(pem).map_err(|e| e.to_string())?;
        Ok(Self::from_key(&key))
    }

    /// From the base64 `p=` tag of a `_domainkey` DNS TXT record.
    pub fn from_dns_p_tag(p: &str) -> Result<Self, String> {
        let compact: String = p.chars().filter(|c| !c.is_whitespace()).collect();
        let der = STANDARD.decode(compact).map_err(|e| e.to_string())?;
        let key = RsaPublicKey::from_public_key_der(&der).map_err(|e| e.to_string())?;
        Ok(Self::from_key(&key))
    }

    fn from_key(key: &RsaPublicKey) -> Self {
        Self {
            modulus: limbs_to_strings(&bytes_to_limbs(&key.n().to_bytes_be(), KEY_LIMBS_2048)),
            exponent: key.e().to_string(),
            source: KeySource::Supplied,
        }
    }
}

/// Decode the base64 `b=` value into signature limbs.
pub fn signature_limbs(signature_b64: &str) -> Result<Vec<String>, base64::DecodeError> {
    let compact: String = signature_b64.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD.decode(compact)?;
    Ok(limbs_to_strings(&bytes_to_limbs(&bytes, KEY_LIMBS_2048)))
}

/// Split a big-endian integer into `count` little-endian limbs of
/// [`LIMB_BITS`] bits. Bits beyond `count * LIMB_BITS` are dropped.
pub fn bytes_to_limbs(be_bytes: &[u8], count: usize) -> Vec<u128> {
    let mut limbs = vec![0u128; count];
    for (byte_index, byte) in be_bytes.iter().rev().enumerate() {
        for bit in 0..8 {
            if (byte >> bit) & 1 == 0 {
                continue;
            }
            let position = byte_index * 8 + bit;
            if let Some(limb) = limbs.get_mut(position / LIMB_BITS) {
                *limb |= 1u128 << (position % LIMB_BITS);
            }
        }
    }
    limbs
}

fn limbs_to_strings(limbs: &[u128]) -> Vec<String> {
    limbs.iter().map(u128::to_string).collect()
}

/// Byte span of one header field inside the raw header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    pub index: usize,
    pub length: usize,
}

impl Sequence {
    pub fn slice<'a>(&self, header: &'a str) -> Option<&'a str> {
        header.get(self.index..self.index + self.length)
    }
}

/// Spans of every `DKIM-Signature` field in header order, each running from
/// the field name through its last folded line, excluding the terminator.
pub fn dkim_header_sequences(header: &str) -> Vec<Sequence> {
    field_starts(header, "dkim-signature:")
        .into_iter()
        .map(|index| Sequence {
            index,
            length: field_end(header, index) - index,
        })
        .collect()
}

/// Offset of the `bh=` value inside the field at `sequence`.
pub fn body_hash_index(header: &str, sequence: Sequence) -> Option<usize> {
    let field = sequence.slice(header)?;
    let mut search_from = 0;
    while let Some(found) = field[search_from..].find("bh=") {
        let at = search_from + found;
        let preceded_ok = at == 0
            || matches!(field.as_bytes()[at - 1], b';' | b' ' | b'\t' | b'\n' | b'\r' | b':');
        if preceded_ok {
            return Some(sequence.index + at + 3);
        }
        search_from = at + 3;
    }
    None
}

/// Offsets of header fields whose name starts a line (case-insensitive).
fn field_starts(header: &str, name_with_colon: &str) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut offset = 0;
    for line in header.split_inclusive('\n') {
        if line
            .get(..name_with_colon.len())
            .map_or(false, |prefix| prefix.eq_ignore_ascii_case(name_with_colon))
        {
            starts.push(offset);
        }
        offset += line.len();
    }
    starts
}

/// End of the field starting at `index`, following folded lines.
fn field_end(header: &str, index: usize) -> usize {
    let bytes = header.as_bytes();
    let mut end = index;
    loop {
        let line_end = header[end..].find('\n').map_or(header.len(), |i| end + i);
        let next = line_end + 1;
        let folded = bytes.get(next).map_or(false, |b| *b == b' ' || *b == b'\t');
        if !folded {
            return if line_end > index && bytes.get(line_end - 1) == Some(&b'\r') {
                line_end - 1
            } else {
                line_end
            };
        }
        end = next;
    }
}
