//! Strong type definitions for CPIX documents.
//!
//! Identifiers are newtypes so that a key id can never be confused with a
//! certificate fingerprint at compile time.

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// Decode a hex string into a fixed-size array.
///
/// `field` names the value in the error so parse failures point at the
/// offending document member.
pub fn decode_hex_array<const N: usize>(field: &'static str, s: &str) -> Result<[u8; N]> {
    let bytes = hex::decode(s).map_err(|e| CoreError::InvalidHex {
        field,
        reason: e.to_string(),
    })?;
    bytes_to_array(field, &bytes)
}

/// Copy a slice into a fixed-size array, checking the length.
pub fn bytes_to_array<const N: usize>(field: &'static str, bytes: &[u8]) -> Result<[u8; N]> {
    bytes.try_into().map_err(|_| CoreError::InvalidLength {
        field,
        expected: N,
        actual: bytes.len(),
    })
}

/// A 128-bit content key identifier, unique within one document.
///
/// Rendered in the familiar `8-4-4-4-12` hyphenated hex form.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KeyId(pub [u8; 16]);

impl KeyId {
    /// Create a KeyId from raw bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Generate a random key id from the given source.
    pub fn generate_with<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut bytes = [0u8; 16];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Convert to bare hex (32 characters, no hyphens).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let h = self.to_hex();
        write!(
            f,
            "{}-{}-{}-{}-{}",
            &h[0..8],
            &h[8..12],
            &h[12..16],
            &h[16..20],
            &h[20..32]
        )
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyId({})", self)
    }
}

impl FromStr for KeyId {
    type Err = CoreError;

    /// Accepts both the hyphenated `8-4-4-4-12` and the bare 32-character hex form.
    fn from_str(s: &str) -> Result<Self> {
        const HYPHENS: [usize; 4] = [8, 13, 18, 23];

        let compact: String = s.chars().filter(|c| *c != '-').collect();
        if compact.len() != s.len() {
            let placed = s.len() == 36
                && s.bytes()
                    .enumerate()
                    .all(|(i, b)| (b == b'-') == HYPHENS.contains(&i));
            if !placed {
                return Err(CoreError::InvalidKeyId(s.to_string()));
            }
        }
        let bytes = hex::decode(&compact).map_err(|_| CoreError::InvalidKeyId(s.to_string()))?;
        let arr: [u8; 16] = bytes
            .try_into()
            .map_err(|_| CoreError::InvalidKeyId(s.to_string()))?;
        Ok(Self(arr))
    }
}

impl From<[u8; 16]> for KeyId {
    fn from(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for KeyId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// The identity of a certificate: a domain-separated Blake3 hash of its
/// canonical encoding.
///
/// Wrapped key entries are addressed by the fingerprint of the recipient
/// certificate, and signer observations are compared by fingerprint.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fingerprint(pub [u8; 32]);

impl Fingerprint {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        decode_hex_array("fingerprint", s).map(Self)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl AsRef<[u8]> for Fingerprint {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
