//! Certificates and credentials.
//!
//! A [`Certificate`] is the public, shareable half of a party's identity. It
//! names the party and carries two public keys: an Ed25519 key that verifies
//! scope signatures, and an X25519 key that recipients are addressed with.
//! A [`Credential`] holds the matching private keys.
//!
//! Certificates are compared by [`Fingerprint`]. Whether a given certificate
//! is trustworthy is always the caller's decision; nothing in this crate
//! asserts trust.

use ciborium::value::Value;
use rand::{CryptoRng, RngCore};
use std::fmt;

use crate::canonical::{self, bytes, entry, text, FINGERPRINT_CONTEXT};
use crate::crypto::{
    Blake3Hash, Ed25519PublicKey, Ed25519Signature, Keypair, SharedKey, X25519PublicKey,
    X25519StaticSecret,
};
use crate::error::Result;
use crate::types::Fingerprint;

/// Blake3 derive-key context used to split one seed into two key pairs.
const SEED_CONTEXT: &str = "cpix 2024 credential seed expansion v1";

/// Certificate field keys for the canonical encoding.
mod keys {
    pub const SUBJECT: u64 = 0;
    pub const SIGNING_KEY: u64 = 1;
    pub const ENCRYPTION_KEY: u64 = 2;
}

/// A public-key credential.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Certificate {
    /// Human-readable name of the holder.
    pub subject: String,

    /// Key that verifies this party's signatures.
    pub signing_key: Ed25519PublicKey,

    /// Key that content is wrapped for when this party is a recipient.
    pub encryption_key: X25519PublicKey,
}

impl Certificate {
    /// Create a certificate from its parts.
    pub fn new(
        subject: impl Into<String>,
        signing_key: Ed25519PublicKey,
        encryption_key: X25519PublicKey,
    ) -> Self {
        Self {
            subject: subject.into(),
            signing_key,
            encryption_key,
        }
    }

    /// Lower the certificate to a CBOR value for canonical encoding.
    pub fn to_cbor_value(&self) -> Value {
        Value::Map(vec![
            entry(keys::SUBJECT, text(&self.subject)),
            entry(keys::SIGNING_KEY, bytes(self.signing_key.as_bytes())),
            entry(keys::ENCRYPTION_KEY, bytes(self.encryption_key.as_bytes())),
        ])
    }

    /// Compute the certificate fingerprint.
    pub fn fingerprint(&self) -> Result<Fingerprint> {
        let encoded = canonical::canonical_bytes(&self.to_cbor_value())?;
        Ok(Fingerprint(Blake3Hash::derive(FINGERPRINT_CONTEXT, &encoded).0))
    }

    /// Verify a signature made by this certificate's holder.
    pub fn verify(&self, message: &[u8], signature: &Ed25519Signature) -> Result<()> {
        self.signing_key.verify(message, signature)
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject)
            .field("signing_key", &self.signing_key)
            .finish()
    }
}

/// A credential with private key material.
///
/// Producers use it to sign scopes; consumers supply it to `load` so that
/// document keys wrapped for them can be recovered.
#[derive(Clone)]
pub struct Credential {
    certificate: Certificate,
    keypair: Keypair,
    encryption_secret: X25519StaticSecret,
}

impl Credential {
    /// Generate a fresh credential from a cryptographically secure source.
    pub fn generate_with<R: RngCore + CryptoRng>(subject: impl Into<String>, rng: &mut R) -> Self {
        let keypair = Keypair::generate_with(rng);
        let encryption_secret = X25519StaticSecret::generate_with(rng);
        Self::from_parts(subject, keypair, encryption_secret)
    }

    /// Derive a credential deterministically from a 32-byte seed.
    pub fn from_seed(subject: impl Into<String>, seed: &[u8; 32]) -> Self {
        let keypair = Keypair::from_seed(seed);
        let encryption_secret =
            X25519StaticSecret::from_bytes(blake3::derive_key(SEED_CONTEXT, seed));
        Self::from_parts(subject, keypair, encryption_secret)
    }

    /// Assemble a credential from existing key material.
    pub fn from_parts(
        subject: impl Into<String>,
        keypair: Keypair,
        encryption_secret: X25519StaticSecret,
    ) -> Self {
        let certificate = Certificate::new(
            subject,
            keypair.public_key(),
            encryption_secret.public_key(),
        );
        Self {
            certificate,
            keypair,
            encryption_secret,
        }
    }

    /// The public certificate for this credential.
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// Fingerprint of the public certificate.
    pub fn fingerprint(&self) -> Result<Fingerprint> {
        self.certificate.fingerprint()
    }

    /// Sign a message with the Ed25519 key.
    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        self.keypair.sign(message)
    }

    /// Perform X25519 key agreement with a peer's public key.
    pub fn diffie_hellman(&self, peer_public: &X25519PublicKey) -> SharedKey {
        self.encryption_secret.diffie_hellman(peer_public)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({:?})", self.certificate.subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn test_seeded_credential_is_deterministic() {
        let a = Credential::from_seed("Producer", &[0x01; 32]);
        let b = Credential::from_seed("Producer", &[0x01; 32]);
        assert_eq!(a.certificate(), b.certificate());
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }

    #[test]
    fn test_fingerprint_covers_every_field() {
        let cred = Credential::from_seed("Producer", &[0x01; 32]);
        let cert = cred.certificate().clone();
        let fp = cert.fingerprint().unwrap();

        let mut renamed = cert.clone();
        renamed.subject = "Someone else".into();
        assert_ne!(renamed.fingerprint().unwrap(), fp);

        let mut rekeyed = cert;
        rekeyed.encryption_key = X25519PublicKey::from_bytes([9; 32]);
        assert_ne!(rekeyed.fingerprint().unwrap(), fp);
    }

    #[test]
    fn test_signing_and_encryption_keys_differ() {
        let cred = Credential::generate_with("Consumer", &mut OsRng);
        let cert = cred.certificate();
        assert_ne!(cert.signing_key.as_bytes(), cert.encryption_key.as_bytes());
    }

    #[test]
    fn test_certificate_verifies_credential_signature() {
        let cred = Credential::from_seed("Producer", &[0x02; 32]);
        let sig = cred.sign(b"usage rules");
        cred.certificate().verify(b"usage rules", &sig).unwrap();

        let other = Credential::from_seed("Other", &[0x03; 32]);
        assert!(other.certificate().verify(b"usage rules", &sig).is_err());
    }

    #[test]
    fn test_debug_does_not_leak_secrets() {
        let cred = Credential::from_seed("Producer", &[0x04; 32]);
        assert_eq!(format!("{:?}", cred), "Credential(\"Producer\")");
    }
}
