//! # Field Elements
//!
//! A [`FieldElement`] is a 256-bit unsigned integer held as 32 big-endian
//! bytes. Tree indices, leaf values, node hashes, identity ids, and proof
//! public signals are all field elements.
//!
//! Ordering is numeric because the derived byte-wise ordering of a big-endian
//! array matches integer ordering. Bit positions count from the least
//! significant bit, which is the order a sparse Merkle tree walks an index.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::hex;

/// Error parsing a field element from its textual form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldElementError {
    /// Input contained a non-hex character.
    #[error("invalid hex field element: {0:?}")]
    InvalidHex(String),
    /// Input encodes more than 32 bytes.
    #[error("field element too wide: {0} bytes")]
    TooWide(usize),
}

/// A 256-bit value in big-endian byte order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FieldElement([u8; 32]);

impl FieldElement {
    /// The zero element. Doubles as the empty-node hash and the "absent"
    /// sentinel returned by history lookups.
    pub const ZERO: Self = Self([0u8; 32]);

    /// The element `1`, used as the leaf marker in leaf hashes.
    pub const ONE: Self = Self::from_u64(1);

    /// Build from a `u64`.
    pub const fn from_u64(v: u64) -> Self {
        let b = v.to_be_bytes();
        let mut out = [0u8; 32];
        let mut i = 0;
        while i < 8 {
            out[24 + i] = b[i];
            i += 1;
        }
        Self(out)
    }

    /// Build from a `u128`.
    pub const fn from_u128(v: u128) -> Self {
        let b = v.to_be_bytes();
        let mut out = [0u8; 32];
        let mut i = 0;
        while i < 16 {
            out[16 + i] = b[i];
            i += 1;
        }
        Self(out)
    }

    /// Wrap 32 big-endian bytes.
    pub const fn from_be_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Interpret 32 bytes as a little-endian integer.
    pub fn from_le_bytes(mut bytes: [u8; 32]) -> Self {
        bytes.reverse();
        Self(bytes)
    }

    /// Big-endian byte representation.
    pub const fn to_be_bytes(&self) -> [u8; 32] {
        self.0
    }

    /// Little-endian byte representation.
    pub fn to_le_bytes(&self) -> [u8; 32] {
        let mut out = self.0;
        out.reverse();
        out
    }

    /// Borrow the big-endian bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Bit `i`, counted from the least significant bit. Bits at or above
    /// 256 read as zero.
    pub fn bit(&self, i: usize) -> bool {
        if i >= 256 {
            return false;
        }
        let byte = self.0[31 - i / 8];
        (byte >> (i % 8)) & 1 == 1
    }

    /// The low 64 bits, or `None` if any higher bit is set.
    pub fn to_u64(&self) -> Option<u64> {
        if self.0[..24].iter().any(|b| *b != 0) {
            return None;
        }
        let mut low = [0u8; 8];
        low.copy_from_slice(&self.0[24..]);
        Some(u64::from_be_bytes(low))
    }

    /// `0x`-prefixed, 64-digit lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.0))
    }

    /// Parse hex with or without a `0x` prefix. Short inputs are
    /// left-padded with zeros.
    pub fn from_hex(s: &str) -> Result<Self, FieldElementError> {
        let bytes = hex::decode(s).ok_or_else(|| FieldElementError::InvalidHex(s.to_string()))?;
        let significant: Vec<u8> = bytes.iter().copied().skip_while(|b| *b == 0).collect();
        if significant.len() > 32 {
            return Err(FieldElementError::TooWide(significant.len()));
        }
        let mut out = [0u8; 32];
        out[32 - significant.len()..].copy_from_slice(&significant);
        Ok(Self(out))
    }
}

impl From<u64> for FieldElement {
    fn from(v: u64) -> Self {
        Self::from_u64(v)
    }
}

impl From<[u8; 32]> for FieldElement {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldElement({})", self.to_hex())
    }
}

impl std::str::FromStr for FieldElement {
    type Err = FieldElementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for FieldElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for FieldElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
