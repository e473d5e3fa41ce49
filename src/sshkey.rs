//! OpenSSH public key parsing
//!
//! An authorized_keys line is `<algorithm> <base64-blob> [comment]`.
//! The decoded blob is a sequence of SSH wire `string`s: a 4-byte
//! big-endian length followed by that many payload bytes (RFC 4251).
//! For `ssh-rsa` the blob holds exactly three strings: the algorithm
//! name, the public exponent e, and the modulus N (RFC 4253 §6.6).
//!
//! N is signed-magnitude: a leading 0x00 sign pad is present exactly
//! when the high bit of the first value byte is set, and is stripped
//! here to produce the canonical modulus.
//!
//! Parsing a key never fails the run. Non-RSA algorithms are skipped,
//! and malformed keys (bad base64, truncated framing, wrong string
//! count) are skipped and counted.

use crate::modulus::Modulus;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Algorithm prefix for RSA keys
const SSH_RSA_PREFIX: &str = "ssh-rsa";

/// An RSA public key recovered from the wire encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPublicKey {
    /// Public exponent bytes, as encoded (not re-validated)
    pub exponent: Vec<u8>,

    /// Canonical modulus
    pub modulus: Modulus,
}

/// Outcome of parsing one authorized_keys line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// An RSA key with its recovered modulus
    Rsa(RsaPublicKey),

    /// A different algorithm; skipped, not an error
    NotRsa,

    /// Unparseable as an RSA key; skipped and counted
    Malformed,
}

impl KeyOutcome {
    /// Returns true for a successfully parsed RSA key
    pub fn is_rsa(&self) -> bool {
        matches!(self, KeyOutcome::Rsa(_))
    }
}

/// Read one SSH wire `string` starting at `*pos`, advancing past it.
/// Returns None when the length prefix is truncated or the declared
/// length exceeds the remaining bytes.
fn read_string<'a>(blob: &'a [u8], pos: &mut usize) -> Option<&'a [u8]> {
    let len_end = pos.checked_add(4)?;
    if len_end > blob.len() {
        return None;
    }
    let len = u32::from_be_bytes([blob[*pos], blob[*pos + 1], blob[*pos + 2], blob[*pos + 3]])
        as usize;
    let payload_end = len_end.checked_add(len)?;
    if payload_end > blob.len() {
        return None;
    }
    let payload = &blob[len_end..payload_end];
    *pos = payload_end;
    Some(payload)
}

/// Split a decoded blob into its wire strings. None on bad framing.
fn split_strings(blob: &[u8]) -> Option<Vec<&[u8]>> {
    let mut parts = Vec::new();
    let mut pos = 0;
    while pos < blob.len() {
        parts.push(read_string(blob, &mut pos)?);
    }
    Some(parts)
}

/// Parse one authorized_keys line.
pub fn parse_public_key_line(line: &str) -> KeyOutcome {
    if !line.starts_with("ssh-rsa ") {
        return KeyOutcome::NotRsa;
    }

    let mut tokens = line.split_whitespace();
    let _algorithm = tokens.next();
    let blob64 = match tokens.next() {
        Some(t) => t,
        None => return KeyOutcome::Malformed,
    };

    let blob = match STANDARD.decode(blob64) {
        Ok(b) => b,
        Err(_) => return KeyOutcome::Malformed,
    };

    let parts = match split_strings(&blob) {
        Some(p) => p,
        None => return KeyOutcome::Malformed,
    };

    // algorithm name, exponent, modulus
    if parts.len() != 3 {
        return KeyOutcome::Malformed;
    }

    let exponent = parts[1].to_vec();
    let mut n = parts[2];
    if n.first() == Some(&0x00) {
        n = &n[1..];
    }

    match Modulus::from_be_bytes(n) {
        Some(modulus) => KeyOutcome::Rsa(RsaPublicKey { exponent, modulus }),
        None => KeyOutcome::Malformed,
    }
}

/// Wire-encode a sequence of SSH strings
fn encode_strings(parts: &[&[u8]]) -> Vec<u8> {
    let total: usize = parts.iter().map(|p| 4 + p.len()).sum();
    let mut out = Vec::with_capacity(total);
    for part in parts {
        out.extend_from_slice(&(part.len() as u32).to_be_bytes());
        out.extend_from_slice(part);
    }
    out
}

/// Re-encode an RSA public key to its wire blob. The sign pad is
/// reinserted when the modulus high bit is set, so a well-formed key
/// round-trips to its original blob.
pub fn encode_rsa_blob(key: &RsaPublicKey) -> Vec<u8> {
    let mut n = Vec::with_capacity(key.modulus.as_bytes().len() + 1);
    if key.modulus.high_bit_set() {
        n.push(0x00);
    }
    n.extend_from_slice(key.modulus.as_bytes());

    encode_strings(&[SSH_RSA_PREFIX.as_bytes(), &key.exponent, &n])
}

/// Re-encode an RSA public key to a full authorized_keys line body
/// (`ssh-rsa <base64>`).
pub fn encode_rsa_line(key: &RsaPublicKey) -> String {
    format!("{} {}", SSH_RSA_PREFIX, STANDARD.encode(encode_rsa_blob(key)))
}

/// The algorithm token of an authorized_keys line, for statistics
pub fn algorithm_of(line: &str) -> Option<&str> {
    line.split_whitespace().next()
}
