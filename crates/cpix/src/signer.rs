//! Scope signatures and signer observations.
//!
//! Each signable scope of a document carries zero or more detached
//! [`SignatureRecord`]s. A record embeds the signer's certificate so it can
//! be verified without any outside lookup. Verification never fails hard: a
//! record either validates ([`SignatureOutcome::Valid`]) or it does not
//! ([`SignatureOutcome::Invalid`]), and both outcomes are reported to the
//! caller. Deciding whether a signer is trusted is left to the caller.

use cpix_core::{sign_message, Certificate, Credential, Ed25519Signature};

/// A detached signature over one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureRecord {
    /// The signer's certificate.
    pub certificate: Certificate,
    /// Ed25519 signature over the domain-separated canonical scope bytes.
    pub signature: Ed25519Signature,
}

impl SignatureRecord {
    /// Sign canonical scope content.
    pub fn create(content: &[u8], signer: &Credential) -> Self {
        let message = sign_message(content);
        Self {
            certificate: signer.certificate().clone(),
            signature: signer.sign(&message),
        }
    }

    /// Verify against canonical scope content.
    pub fn verify(&self, content: &[u8]) -> SignatureOutcome {
        let message = sign_message(content);
        match self.certificate.verify(&message, &self.signature) {
            Ok(()) => SignatureOutcome::Valid(self.certificate.clone()),
            Err(_) => SignatureOutcome::Invalid(self.certificate.clone()),
        }
    }
}

/// The result of verifying one signature record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureOutcome {
    /// The signature validates for the embedded certificate.
    Valid(Certificate),
    /// The signature does not validate. The certificate is only what the
    /// record claims.
    Invalid(Certificate),
}

impl SignatureOutcome {
    /// Whether the signature validated.
    pub fn is_valid(&self) -> bool {
        matches!(self, SignatureOutcome::Valid(_))
    }
}

/// Who signed the whole document, as observed on load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SignerObservation {
    /// No document signature present.
    #[default]
    Unsigned,
    /// A document signature validated for this certificate.
    Valid(Certificate),
    /// A document signature was present but failed to validate.
    Invalid(Certificate),
}

impl SignerObservation {
    /// The signer, if the signature validated.
    pub fn signer(&self) -> Option<&Certificate> {
        match self {
            SignerObservation::Valid(cert) => Some(cert),
            _ => None,
        }
    }

    /// Whether `certificate` produced a valid document signature.
    pub fn is_signed_by(&self, certificate: &Certificate) -> bool {
        self.signer() == Some(certificate)
    }
}

impl From<SignatureOutcome> for SignerObservation {
    fn from(outcome: SignatureOutcome) -> Self {
        match outcome {
            SignatureOutcome::Valid(cert) => SignerObservation::Valid(cert),
            SignatureOutcome::Invalid(cert) => SignerObservation::Invalid(cert),
        }
    }
}

/// Signers observed on one section scope.
///
/// Both lists have set semantics: a certificate appears at most once in each.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeSignatures {
    valid: Vec<Certificate>,
    invalid: Vec<Certificate>,
}

impl ScopeSignatures {
    /// Record one verification outcome.
    pub fn record(&mut self, outcome: SignatureOutcome) {
        let (list, cert) = match outcome {
            SignatureOutcome::Valid(cert) => (&mut self.valid, cert),
            SignatureOutcome::Invalid(cert) => (&mut self.invalid, cert),
        };
        if !list.contains(&cert) {
            list.push(cert);
        }
    }

    /// Certificates whose signatures validated.
    pub fn signed_by(&self) -> &[Certificate] {
        &self.valid
    }

    /// Certificates named by signatures that failed to validate.
    pub fn invalid(&self) -> &[Certificate] {
        &self.invalid
    }

    /// Whether `certificate` produced a valid signature on this scope.
    pub fn is_signed_by(&self, certificate: &Certificate) -> bool {
        self.valid.contains(certificate)
    }

    /// No signature was present at all.
    pub fn is_unsigned(&self) -> bool {
        self.valid.is_empty() && self.invalid.is_empty()
    }
}

/// Signature observations for every scope of a loaded document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureReport {
    /// Whole-document scope.
    pub document: SignerObservation,
    /// Content keys scope.
    pub content_keys: ScopeSignatures,
    /// Usage rules scope.
    pub usage_rules: ScopeSignatures,
}

impl SignatureReport {
    /// Whether any signature on any scope failed to validate.
    pub fn has_invalid(&self) -> bool {
        matches!(self.document, SignerObservation::Invalid(_))
            || !self.content_keys.invalid().is_empty()
            || !self.usage_rules.invalid().is_empty()
    }
}
