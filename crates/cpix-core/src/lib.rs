//! # CPIX Core
//!
//! Pure primitives for the CPIX document engine: identifiers, certificates,
//! credentials and canonical encoding.
//!
//! This crate contains no I/O. It is pure computation over cryptographic
//! data structures; randomness is always supplied by the caller.
//!
//! ## Key Types
//!
//! - [`KeyId`] - 128-bit content key identifier
//! - [`Fingerprint`] - Identity of a [`Certificate`]
//! - [`Certificate`] - Public signing and key-agreement keys of one party
//! - [`Credential`] - A certificate plus its private keys
//!
//! ## Canonicalization
//!
//! Signed content is encoded using deterministic CBOR. See [`canonical`] module.

pub mod canonical;
pub mod certificate;
pub mod crypto;
pub mod error;
pub mod types;

pub use canonical::{canonical_bytes, sign_message, SIGN_DOMAIN};
pub use certificate::{Certificate, Credential};
pub use crypto::{
    Blake3Hash, Ed25519PublicKey, Ed25519Signature, Keypair, SharedKey, X25519PublicKey,
    X25519StaticSecret,
};
pub use error::{CoreError, Result};
pub use types::{bytes_to_array, decode_hex_array, Fingerprint, KeyId};
