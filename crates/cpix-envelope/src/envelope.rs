//! Encrypted value envelope.
//!
//! A content key value that must not travel in the clear is sealed under the
//! document key and carried in an [`EncryptedValue`]. The key id of the
//! entry is bound in as associated data, so an envelope cannot be moved to a
//! different entry without failing authentication.

use rand::{CryptoRng, RngCore};

use crate::crypto::{EncryptionKey, EncryptionNonce};
use crate::error::Result;

/// Format identifier for encrypted values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EncryptionFormat {
    /// ChaCha20-Poly1305 with 256-bit key.
    ChaCha20Poly1305 = 1,
}

impl EncryptionFormat {
    /// Convert to u8 for serialization.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Try to parse from u8.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::ChaCha20Poly1305),
            _ => None,
        }
    }
}

/// An encrypted value envelope.
///
/// Holds the ciphertext (including the 16-byte authentication tag) and the
/// metadata needed to open it with the right key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedValue {
    /// Encryption algorithm used.
    pub format: EncryptionFormat,

    /// Nonce used for encryption (unique per encryption).
    pub nonce: EncryptionNonce,

    /// The encrypted data (includes authentication tag).
    pub ciphertext: Vec<u8>,
}

impl EncryptedValue {
    /// Seal `plaintext` under `key`, binding `aad`.
    pub fn seal<R: RngCore + CryptoRng>(
        plaintext: &[u8],
        aad: &[u8],
        key: &EncryptionKey,
        rng: &mut R,
    ) -> Result<Self> {
        let nonce = EncryptionNonce::generate_with(rng);
        let ciphertext = key.encrypt(plaintext, aad, &nonce)?;

        Ok(Self {
            format: EncryptionFormat::ChaCha20Poly1305,
            nonce,
            ciphertext,
        })
    }

    /// Open with the given key and associated data.
    pub fn open(&self, aad: &[u8], key: &EncryptionKey) -> Result<Vec<u8>> {
        match self.format {
            EncryptionFormat::ChaCha20Poly1305 => key.decrypt(&self.ciphertext, aad, &self.nonce),
        }
    }

    /// Get the size of the ciphertext.
    pub fn ciphertext_len(&self) -> usize {
        self.ciphertext.len()
    }
}
