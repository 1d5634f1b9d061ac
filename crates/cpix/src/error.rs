//! Error types for the document engine.

use cpix_core::{CoreError, KeyId};
use cpix_envelope::EnvelopeError;
use thiserror::Error;

/// Errors that can occur while building, saving or loading a document.
///
/// Only structural and integrity failures are errors. A key the caller
/// cannot decrypt is an absent value, and a signature that fails to verify is
/// reported in the document's signature report.
#[derive(Debug, Error)]
pub enum CpixError {
    /// The artifact is malformed.
    #[error("parse error: {0}")]
    Parse(String),

    /// A wrapped key or sealed value addressed to the caller failed to open.
    /// Signals corruption or tampering.
    #[error("decryption error: {0}")]
    Decryption(String),

    /// Sealing key material failed.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Reading the source or writing the sink failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A content key with this id is already in the document.
    #[error("duplicate content key id: {0}")]
    DuplicateKeyId(KeyId),

    /// The content key carries no value, so it cannot be added to a document.
    ///
    /// Returned by `add_content_key`. Saving checks again, but every key in a
    /// building document already has a value.
    #[error("content key {0} has no value")]
    MissingKeyValue(KeyId),

    /// Loaded documents cannot be modified or re-saved.
    #[error("document is read-only after load")]
    ReadOnly,

    /// No content key's usage rules match the context.
    #[error("no content key matches the given context")]
    NoMatchingKey,

    /// More than one content key's usage rules match the context.
    #[error("{0} content keys match the given context")]
    AmbiguousKeyResolution(usize),

    /// Rendering the artifact failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Core error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

impl From<EnvelopeError> for CpixError {
    fn from(e: EnvelopeError) -> Self {
        match e {
            EnvelopeError::DecryptionError(msg) => CpixError::Decryption(msg),
            EnvelopeError::EncryptionError(msg) => CpixError::Encryption(msg),
            EnvelopeError::CoreError(e) => CpixError::Core(e),
        }
    }
}

/// Result type for document operations.
pub type Result<T> = std::result::Result<T, CpixError>;
