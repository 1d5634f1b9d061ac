//! # CPIX Envelope
//!
//! Confidentiality for content key values.
//!
//! ## Encryption Model
//!
//! Key material uses a two-layer model:
//!
//! 1. **Document Key**: a random ChaCha20-Poly1305 key, generated once per
//!    saved document, that seals every content key value
//!    ([`EncryptedValue`])
//! 2. **Wrapped Keys**: the document key is wrapped once per recipient via
//!    ephemeral X25519 ECDH ([`WrappedKey`])
//!
//! This bounds asymmetric work to one operation per recipient no matter how
//! many content keys the document carries.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cpix_core::Credential;
//! use cpix_envelope::{EncryptedValue, EncryptionKey, WrappedKey};
//! use rand::rngs::OsRng;
//!
//! let recipient = Credential::generate_with("Player", &mut OsRng);
//! let document_key = EncryptionKey::generate_with(&mut OsRng);
//!
//! let sealed = EncryptedValue::seal(&[0u8; 16], b"kid", &document_key, &mut OsRng).unwrap();
//! let wrapped = WrappedKey::wrap_for(recipient.certificate(), &document_key, &mut OsRng).unwrap();
//!
//! let recovered = wrapped.unwrap_with(&recipient).unwrap().unwrap();
//! let value = sealed.open(b"kid", &recovered).unwrap();
//! ```

pub mod crypto;
pub mod envelope;
pub mod error;
pub mod wrap;

pub use crypto::{EncryptionKey, EncryptionNonce, EphemeralKeyPair};
pub use envelope::{EncryptedValue, EncryptionFormat};
pub use error::{EnvelopeError, Result};
pub use wrap::{unwrap_any, WrappedKey, WRAP_CONTEXT};
