//! Canonical moduli and modulus list serialization
//!
//! A canonical modulus is the minimal-length big-endian encoding of N:
//! no sign-pad byte, no leading zeros. The audit refers to moduli by
//! their position in the extracted list, so serialization must keep
//! order stable.
//!
//! Two list forms exist on disk:
//! - hex: one lowercase hex integer per LF-terminated line (written)
//! - packed: per modulus, a 4-byte little-endian length followed by
//!   that many big-endian bytes (accepted on read)
//!
//! Reads auto-detect the form: a file whose bytes are all hex digits
//! and LFs is the hex form, anything else is packed.

use crate::error::ModulusListError;
use num_bigint::BigUint;
use num_traits::One;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// A canonical RSA modulus: minimal big-endian bytes, no sign pad
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Modulus(Vec<u8>);

impl Modulus {
    /// Build from big-endian bytes, normalizing away leading zeros.
    ///
    /// Returns None for an empty or all-zero input: a zero modulus is
    /// not a usable RSA key and would break the exact divisions in the
    /// GCD pass.
    pub fn from_be_bytes(bytes: &[u8]) -> Option<Self> {
        let start = bytes.iter().position(|&b| b != 0)?;
        Some(Self(bytes[start..].to_vec()))
    }

    /// The canonical big-endian bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Bit length of the modulus
    pub fn bits(&self) -> u64 {
        let first = self.0[0];
        (self.0.len() as u64 - 1) * 8 + (8 - first.leading_zeros() as u64)
    }

    /// Whether the most significant bit of the leading byte is set.
    /// SSH's signed-magnitude encoding inserts a 0x00 pad exactly when
    /// this is true.
    pub fn high_bit_set(&self) -> bool {
        self.0[0] & 0x80 != 0
    }

    /// Convert to an arbitrary-precision integer
    pub fn to_biguint(&self) -> BigUint {
        BigUint::from_bytes_be(&self.0)
    }

    /// Minimal lowercase hex, no 0x prefix, no leading-zero pad
    pub fn to_hex(&self) -> String {
        format!("{:x}", self.to_biguint())
    }
}

impl fmt::Debug for Modulus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Modulus({} bits, {})", self.bits(), self.to_hex())
    }
}

/// Right-pad with 1 entries to the next power of two.
///
/// The product tree requires a power-of-two leaf count; 1 is the
/// multiplicative identity, so pad entries never produce a match.
/// Returns the padded length.
pub fn pad_to_power_of_two(moduli: &mut Vec<BigUint>) -> usize {
    let target = moduli.len().max(1).next_power_of_two();
    while moduli.len() < target {
        moduli.push(BigUint::one());
    }
    target
}

/// Write the hex form of a modulus list
pub fn write_hex_list(path: &Path, moduli: &[Modulus]) -> Result<(), ModulusListError> {
    let mut out = fs::File::create(path).map_err(|e| ModulusListError::WriteFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut buf = String::new();
    for m in moduli {
        buf.push_str(&m.to_hex());
        buf.push('\n');
        if buf.len() >= 1 << 20 {
            out.write_all(buf.as_bytes())
                .map_err(|e| ModulusListError::WriteFailed {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
            buf.clear();
        }
    }
    out.write_all(buf.as_bytes())
        .map_err(|e| ModulusListError::WriteFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    Ok(())
}

/// Read a modulus list, accepting both the hex and packed forms.
pub fn read_modulus_list(path: &Path) -> Result<Vec<BigUint>, ModulusListError> {
    let data = fs::read(path).map_err(|e| ModulusListError::ReadFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let is_hex = !data.is_empty()
        && data
            .iter()
            .all(|&b| b == b'\n' || b.is_ascii_hexdigit());

    let moduli = if is_hex {
        debug!(path = %path.display(), "Reading hex modulus list");
        parse_hex_list(&data)?
    } else {
        debug!(path = %path.display(), "Reading packed modulus list");
        parse_packed_list(&data)?
    };

    if moduli.is_empty() {
        return Err(ModulusListError::Empty);
    }
    Ok(moduli)
}

fn parse_hex_list(data: &[u8]) -> Result<Vec<BigUint>, ModulusListError> {
    let mut moduli = Vec::new();
    for (i, line) in data.split(|&b| b == b'\n').enumerate() {
        if line.is_empty() {
            continue;
        }
        let m = BigUint::parse_bytes(line, 16).ok_or(ModulusListError::BadHex {
            line: i as u64 + 1,
        })?;
        moduli.push(m);
    }
    Ok(moduli)
}

fn parse_packed_list(data: &[u8]) -> Result<Vec<BigUint>, ModulusListError> {
    let mut moduli = Vec::new();
    let mut pos = 0usize;
    while pos < data.len() {
        let index = moduli.len();
        if pos + 4 > data.len() {
            return Err(ModulusListError::Truncated { index });
        }
        let len = u32::from_le_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
            as usize;
        pos += 4;
        if pos + len > data.len() {
            return Err(ModulusListError::Truncated { index });
        }
        moduli.push(BigUint::from_bytes_be(&data[pos..pos + len]));
        pos += len;
    }
    Ok(moduli)
}
