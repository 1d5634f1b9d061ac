//! # CPIX
//!
//! Content key exchange documents: a producer hands symmetric content keys
//! to one or more consumers over an untrusted channel.
//!
//! - **Confidentiality.** Key values are sealed under a per-save document
//!   key, which is wrapped once for each recipient certificate.
//! - **Authenticity.** The content keys section, the usage rules section and
//!   the whole document are signed independently, each by any number of
//!   signers.
//!
//! Loading never decides trust. A consumer that is not a recipient gets the
//! document with key values absent, and every signature outcome, valid or
//! not, is reported for the caller's own policy to judge.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cpix::{ContentKey, CpixDocument};
//! use cpix_core::{Credential, KeyId};
//! use rand::rngs::OsRng;
//!
//! # fn main() -> cpix::Result<()> {
//! let producer = Credential::generate_with("Packager", &mut OsRng);
//! let player = Credential::generate_with("Player", &mut OsRng);
//!
//! let mut document = CpixDocument::new();
//! document.add_content_key(ContentKey::generate_with(&mut OsRng))?;
//! document.add_recipient(player.certificate().clone())?;
//! document.set_document_signer(producer.clone())?;
//!
//! let artifact = document.to_bytes()?;
//!
//! let loaded = CpixDocument::from_bytes(&artifact, &[player])?;
//! assert_eq!(loaded.document_signed_by(), Some(producer.certificate()));
//! assert!(loaded.content_keys()[0].has_value());
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod document;
pub mod error;
pub mod model;
pub mod scope;
pub mod signer;

pub use cpix_core as core;
pub use cpix_envelope as envelope;

pub use codec::{DocumentModel, FORMAT_VERSION};
pub use config::{DocumentConfig, DEFAULT_MAX_ARTIFACT_LEN};
pub use document::{CpixDocument, DocumentState};
pub use error::{CpixError, Result};
pub use model::{
    ContentKey, ContentKeyContext, ContentKeyValue, TrackKind, UsageFilter, UsageRule,
    CONTENT_KEY_LEN,
};
pub use scope::Scope;
pub use signer::{
    ScopeSignatures, SignatureOutcome, SignatureRecord, SignatureReport, SignerObservation,
};
