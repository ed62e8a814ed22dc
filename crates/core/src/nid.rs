//! NID values, the hashing primitive, and name-shape predicates.
//!
//! A NID is the 32-bit export key of a symbol, nominally derived from the
//! symbol's name: the first four bytes of `SHA-1(name)` read little-endian,
//! conventionally written as eight uppercase hex digits.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use thiserror::Error;

/// A 32-bit export identifier.
///
/// Displayed and serialized as eight uppercase hex digits (e.g. `109F50BC`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Nid(pub u32);

impl Nid {
    /// The canonical eight-digit uppercase hex form.
    pub fn hex(self) -> String {
        format!("{self}")
    }
}

impl fmt::Display for Nid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

/// Error parsing a NID from its hex form.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid NID '{input}': expected 8 hex digits (optionally 0x-prefixed)")]
pub struct ParseNidError {
    pub input: String,
}

impl FromStr for Nid {
    type Err = ParseNidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
        if digits.len() != 8 {
            return Err(ParseNidError { input: s.to_string() });
        }
        u32::from_str_radix(digits, 16)
            .map(Nid)
            .map_err(|_| ParseNidError { input: s.to_string() })
    }
}

impl Serialize for Nid {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.hex())
    }
}

impl<'de> Deserialize<'de> for Nid {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Hashing primitive used to derive a NID from a candidate name.
///
/// The engine only ever calls this through the trait so tests can drive the
/// classifier and detector with a deterministic fake.
pub trait NidHasher: Send + Sync {
    fn compute(&self, name: &str) -> Nid;
}

/// Default hasher: first four bytes of `SHA-1(name)`, little-endian.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha1Hasher;

impl NidHasher for Sha1Hasher {
    fn compute(&self, name: &str) -> Nid {
        let digest = Sha1::digest(name.as_bytes());
        Nid(u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]))
    }
}

/// Check whether `name` explains `nid` under the given hasher.
pub fn verify(hasher: &dyn NidHasher, name: &str, nid: Nid) -> bool {
    hasher.compute(name) == nid
}

/// Check whether `name` is a synthetic placeholder that merely encodes the
/// NID itself (e.g. `SysMemForKernel_91DE343C`).
///
/// This is a string-level predicate, independent of hashing, and takes
/// priority over hash verification during classification. The suffix check
/// case-folds the name; placeholder names embed the NID in upper hex.
pub fn is_placeholder(name: &str, nid: Nid) -> bool {
    name.to_ascii_uppercase().ends_with(&nid.hex())
}
