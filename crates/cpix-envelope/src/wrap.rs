//! Per-recipient key wrapping via X25519 key agreement.
//!
//! The document key is wrapped once for every recipient certificate. Each
//! wrapped entry names its recipient by certificate fingerprint so a loader
//! can pick the entry that matches its own credential without trial
//! decryption.
//!
//! Wrapping: a fresh ephemeral X25519 key agrees with the recipient's
//! encryption key; the shared secret, the recipient fingerprint and the
//! ephemeral public key are fed through Blake3 derive-key to get the
//! key-encryption key; the document key is sealed under it with
//! ChaCha20-Poly1305 (recipient fingerprint as associated data).

use cpix_core::{Certificate, Credential, Fingerprint, SharedKey, X25519PublicKey};
use rand::{CryptoRng, RngCore};

use crate::crypto::{EncryptionKey, EncryptionNonce, EphemeralKeyPair};
use crate::error::{EnvelopeError, Result};

/// Blake3 derive-key context for key-encryption keys.
pub const WRAP_CONTEXT: &str = "cpix 2024 document key wrap v1";

/// A symmetric key wrapped for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedKey {
    /// Fingerprint of the recipient certificate this entry targets.
    pub recipient: Fingerprint,

    /// Ephemeral X25519 public key (sender's side of ECDH).
    pub ephemeral_public: X25519PublicKey,

    /// Nonce used for encryption.
    pub nonce: EncryptionNonce,

    /// The wrapped key, including the authentication tag.
    pub ciphertext: Vec<u8>,
}

impl WrappedKey {
    /// Wrap `key` for the holder of `recipient`.
    pub fn wrap_for<R: RngCore + CryptoRng>(
        recipient: &Certificate,
        key: &EncryptionKey,
        rng: &mut R,
    ) -> Result<Self> {
        let recipient_fp = recipient.fingerprint()?;

        let ephemeral = EphemeralKeyPair::generate_with(rng);
        let ephemeral_public = ephemeral.public_key();
        let shared = ephemeral.diffie_hellman(&recipient.encryption_key);
        if !shared.is_contributory() {
            return Err(EnvelopeError::EncryptionError(
                "recipient encryption key is a low-order point".into(),
            ));
        }

        let kek = derive_kek(&shared, &recipient_fp, &ephemeral_public);
        let nonce = EncryptionNonce::generate_with(rng);
        let ciphertext = kek.encrypt(key.as_bytes(), recipient_fp.as_bytes(), &nonce)?;

        tracing::trace!(recipient = %recipient_fp, "wrapped document key");

        Ok(Self {
            recipient: recipient_fp,
            ephemeral_public,
            nonce,
            ciphertext,
        })
    }

    /// Whether this entry was wrapped for `fingerprint`.
    pub fn is_for(&self, fingerprint: &Fingerprint) -> bool {
        &self.recipient == fingerprint
    }

    /// Unwrap with `credential`.
    ///
    /// Returns `Ok(None)` when the entry targets a different recipient; that
    /// is the normal outcome for a party the key was not shared with. Returns
    /// an error only when the entry does target this credential but cannot
    /// be opened, which means the entry was corrupted or tampered with.
    pub fn unwrap_with(&self, credential: &Credential) -> Result<Option<EncryptionKey>> {
        if !self.is_for(&credential.fingerprint()?) {
            return Ok(None);
        }

        let shared = credential.diffie_hellman(&self.ephemeral_public);
        if !shared.is_contributory() {
            return Err(EnvelopeError::DecryptionError(
                "ephemeral key is a low-order point".into(),
            ));
        }

        let kek = derive_kek(&shared, &self.recipient, &self.ephemeral_public);
        let key_bytes = kek.decrypt(&self.ciphertext, self.recipient.as_bytes(), &self.nonce)?;

        let arr: [u8; 32] = key_bytes.as_slice().try_into().map_err(|_| {
            EnvelopeError::DecryptionError(format!(
                "invalid key length: expected 32, got {}",
                key_bytes.len()
            ))
        })?;
        Ok(Some(EncryptionKey::from_bytes(arr)))
    }
}

/// Unwrap the first entry in `entries` that targets one of `credentials`.
///
/// `Ok(None)` means none of the credentials is a recipient.
pub fn unwrap_any(entries: &[WrappedKey], credentials: &[Credential]) -> Result<Option<EncryptionKey>> {
    for credential in credentials {
        let fingerprint = credential.fingerprint()?;
        if let Some(entry) = entries.iter().find(|e| e.is_for(&fingerprint)) {
            return entry.unwrap_with(credential);
        }
    }
    Ok(None)
}

fn derive_kek(
    shared: &SharedKey,
    recipient: &Fingerprint,
    ephemeral_public: &X25519PublicKey,
) -> EncryptionKey {
    let mut info = Vec::with_capacity(64);
    info.extend_from_slice(recipient.as_bytes());
    info.extend_from_slice(ephemeral_public.as_bytes());
    EncryptionKey::from_bytes(shared.derive_key_bytes(WRAP_CONTEXT, &info))
}
