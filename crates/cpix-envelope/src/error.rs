//! Error types for the envelope module.

use thiserror::Error;

/// Errors that can occur while sealing or opening key material.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// Encryption error.
    #[error("encryption error: {0}")]
    EncryptionError(String),

    /// Decryption error: authentication failed or the recovered material is malformed.
    #[error("decryption error: {0}")]
    DecryptionError(String),

    /// Core error.
    #[error("core error: {0}")]
    CoreError(#[from] cpix_core::CoreError),
}

/// Result type for envelope operations.
pub type Result<T> = std::result::Result<T, EnvelopeError>;
