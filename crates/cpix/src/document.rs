//! The document orchestrator.
//!
//! [`CpixDocument`] is built by a producer, then saved; or it is loaded by a
//! consumer from artifact bytes and a list of credentials, after which it is
//! read-only.
//!
//! ## Save
//!
//! 1. With recipients: one fresh document key seals every content key value
//!    and is wrapped once per recipient. Without recipients values are
//!    stored in the clear.
//! 2. The usage rules scope is signed (when there are rules), then the
//!    content keys scope.
//! 3. The whole-document scope is signed last, covering both section
//!    signatures.
//! 4. The artifact is rendered in memory and written with one `write_all`.
//!
//! ## Load
//!
//! Parse failures and integrity failures on material addressed to the
//! caller abort the load. Everything else is data: a key the caller is not a
//! recipient of has no value, and every signature outcome is in the
//! [`SignatureReport`].

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use std::io::{Read, Write};

use cpix_core::{Certificate, Credential, KeyId};
use cpix_envelope::{unwrap_any, EncryptedValue, EncryptionKey, WrappedKey};

use crate::codec::{self, DeliveryEntry, DocumentModel, KeyEntry, StoredValue};
use crate::config::DocumentConfig;
use crate::error::{CpixError, Result};
use crate::model::{ContentKey, ContentKeyContext, ContentKeyValue, UsageRule};
use crate::scope::Scope;
use crate::signer::{ScopeSignatures, SignatureRecord, SignatureReport, SignerObservation};

/// Lifecycle state of a document instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    /// Constructed locally; mutable and saveable.
    Building,
    /// Constructed by a load; read-only.
    Loaded,
}

/// A content key exchange document.
#[derive(Debug, Clone)]
pub struct CpixDocument {
    state: DocumentState,
    content_keys: Vec<ContentKey>,
    recipients: Vec<Certificate>,
    usage_rules: Vec<UsageRule>,
    document_signer: Option<Credential>,
    content_keys_signers: Vec<Credential>,
    usage_rules_signers: Vec<Credential>,
    signatures: Option<SignatureReport>,
}

impl Default for CpixDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl CpixDocument {
    /// An empty document, ready to be populated.
    pub fn new() -> Self {
        Self {
            state: DocumentState::Building,
            content_keys: Vec::new(),
            recipients: Vec::new(),
            usage_rules: Vec::new(),
            document_signer: None,
            content_keys_signers: Vec::new(),
            usage_rules_signers: Vec::new(),
            signatures: None,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Construction
    // ─────────────────────────────────────────────────────────────────────

    fn ensure_building(&self) -> Result<()> {
        match self.state {
            DocumentState::Building => Ok(()),
            DocumentState::Loaded => Err(CpixError::ReadOnly),
        }
    }

    /// Add a content key. Its id must be new to the document and its value
    /// must be known.
    pub fn add_content_key(&mut self, key: ContentKey) -> Result<()> {
        self.ensure_building()?;
        if key.value.is_none() {
            return Err(CpixError::MissingKeyValue(key.id));
        }
        if self.content_key(&key.id).is_some() {
            return Err(CpixError::DuplicateKeyId(key.id));
        }
        self.content_keys.push(key);
        Ok(())
    }

    /// Add a recipient. Adding the same certificate twice has no effect.
    pub fn add_recipient(&mut self, certificate: Certificate) -> Result<()> {
        self.ensure_building()?;
        if !self.recipients.contains(&certificate) {
            self.recipients.push(certificate);
        }
        Ok(())
    }

    /// Add a usage rule. The referenced key does not have to exist.
    pub fn add_usage_rule(&mut self, rule: UsageRule) -> Result<()> {
        self.ensure_building()?;
        self.usage_rules.push(rule);
        Ok(())
    }

    /// Set the document signer. It signs the whole document and every
    /// section present.
    pub fn set_document_signer(&mut self, signer: Credential) -> Result<()> {
        self.ensure_building()?;
        self.document_signer = Some(signer);
        Ok(())
    }

    /// Add a signer for the content keys scope only.
    pub fn add_content_keys_signer(&mut self, signer: Credential) -> Result<()> {
        self.ensure_building()?;
        self.content_keys_signers.push(signer);
        Ok(())
    }

    /// Add a signer for the usage rules scope only.
    pub fn add_usage_rules_signer(&mut self, signer: Credential) -> Result<()> {
        self.ensure_building()?;
        self.usage_rules_signers.push(signer);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Save
    // ─────────────────────────────────────────────────────────────────────

    /// Write the artifact to `sink` using the operating system RNG.
    pub fn save<W: Write>(&self, sink: W) -> Result<()> {
        self.save_with_config(&mut OsRng, &DocumentConfig::default(), sink)
    }

    /// Write the artifact to `sink` using `rng` for keys and nonces.
    pub fn save_with_rng<R, W>(&self, rng: &mut R, sink: W) -> Result<()>
    where
        R: RngCore + CryptoRng,
        W: Write,
    {
        self.save_with_config(rng, &DocumentConfig::default(), sink)
    }

    /// Write the artifact to `sink` with explicit settings.
    pub fn save_with_config<R, W>(
        &self,
        rng: &mut R,
        config: &DocumentConfig,
        mut sink: W,
    ) -> Result<()>
    where
        R: RngCore + CryptoRng,
        W: Write,
    {
        let bytes = self.to_bytes_with_config(rng, config)?;
        sink.write_all(&bytes)?;
        sink.flush()?;
        Ok(())
    }

    /// Render the artifact using the operating system RNG.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.to_bytes_with_config(&mut OsRng, &DocumentConfig::default())
    }

    /// Render the artifact using `rng` for keys and nonces.
    pub fn to_bytes_with_rng<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Result<Vec<u8>> {
        self.to_bytes_with_config(rng, &DocumentConfig::default())
    }

    /// Render the artifact with explicit settings.
    pub fn to_bytes_with_config<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        config: &DocumentConfig,
    ) -> Result<Vec<u8>> {
        self.ensure_building()?;
        let model = self.seal(rng)?;
        codec::encode(&model, config)
    }

    fn seal<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Result<DocumentModel> {
        tracing::debug!(
            keys = self.content_keys.len(),
            recipients = self.recipients.len(),
            rules = self.usage_rules.len(),
            "saving document"
        );

        let mut model = DocumentModel::new();

        if self.recipients.is_empty() {
            for key in &self.content_keys {
                let value = key.value.clone().ok_or(CpixError::MissingKeyValue(key.id))?;
                model.content_keys.push(KeyEntry {
                    id: key.id,
                    value: StoredValue::Plain(value),
                });
            }
        } else {
            let document_key = EncryptionKey::generate_with(rng);

            for recipient in &self.recipients {
                let wrapped_key = WrappedKey::wrap_for(recipient, &document_key, rng)?;
                model.delivery.push(DeliveryEntry {
                    recipient: recipient.clone(),
                    wrapped_key,
                });
            }

            for key in &self.content_keys {
                let value = key.value.as_ref().ok_or(CpixError::MissingKeyValue(key.id))?;
                let sealed =
                    EncryptedValue::seal(value.as_bytes(), key.id.as_bytes(), &document_key, rng)?;
                model.content_keys.push(KeyEntry {
                    id: key.id,
                    value: StoredValue::Encrypted(sealed),
                });
            }
        }

        model.usage_rules = self.usage_rules.clone();

        // Section scopes first: the whole-document scope covers their signatures.
        if !model.usage_rules.is_empty() {
            let content = model.scope_bytes(Scope::UsageRules)?;
            model.usage_rule_signatures = self
                .section_signers(&self.usage_rules_signers)
                .map(|signer| SignatureRecord::create(&content, signer))
                .collect();
        }

        let content = model.scope_bytes(Scope::ContentKeys)?;
        model.content_key_signatures = self
            .section_signers(&self.content_keys_signers)
            .map(|signer| SignatureRecord::create(&content, signer))
            .collect();

        if let Some(signer) = &self.document_signer {
            let content = model.scope_bytes(Scope::WholeDocument)?;
            model.document_signature = Some(SignatureRecord::create(&content, signer));
        }

        tracing::debug!(
            content_key_signatures = model.content_key_signatures.len(),
            usage_rule_signatures = model.usage_rule_signatures.len(),
            document_signed = model.document_signature.is_some(),
            "document sealed"
        );

        Ok(model)
    }

    /// The document signer followed by the section's own signers, each
    /// certificate once.
    fn section_signers<'a>(
        &'a self,
        extra: &'a [Credential],
    ) -> impl Iterator<Item = &'a Credential> + 'a {
        let mut seen: Vec<&'a Certificate> = Vec::new();
        self.document_signer
            .iter()
            .chain(extra.iter())
            .filter(move |signer: &&'a Credential| {
                let cert: &'a Certificate = (*signer).certificate();
                if seen.contains(&cert) {
                    false
                } else {
                    seen.push(cert);
                    true
                }
            })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Load
    // ─────────────────────────────────────────────────────────────────────

    /// Read an artifact from `source`.
    ///
    /// `credentials` are tried against the delivery list by fingerprint. An
    /// empty list is valid: plain values are still available and signatures
    /// are still verified.
    pub fn load<R: Read>(source: R, credentials: &[Credential]) -> Result<Self> {
        Self::load_with_config(source, credentials, &DocumentConfig::default())
    }

    /// Read an artifact from `source` with explicit settings.
    pub fn load_with_config<R: Read>(
        source: R,
        credentials: &[Credential],
        config: &DocumentConfig,
    ) -> Result<Self> {
        let limit = u64::try_from(config.max_artifact_len)
            .unwrap_or(u64::MAX)
            .saturating_add(1);
        let mut bytes = Vec::new();
        source.take(limit).read_to_end(&mut bytes)?;
        Self::from_bytes_with_config(&bytes, credentials, config)
    }

    /// Parse an in-memory artifact.
    pub fn from_bytes(bytes: &[u8], credentials: &[Credential]) -> Result<Self> {
        Self::from_bytes_with_config(bytes, credentials, &DocumentConfig::default())
    }

    /// Parse an in-memory artifact with explicit settings.
    pub fn from_bytes_with_config(
        bytes: &[u8],
        credentials: &[Credential],
        config: &DocumentConfig,
    ) -> Result<Self> {
        if bytes.len() > config.max_artifact_len {
            return Err(CpixError::Parse(format!(
                "artifact exceeds {} bytes",
                config.max_artifact_len
            )));
        }

        let model = codec::decode(bytes)?;
        tracing::debug!(
            keys = model.content_keys.len(),
            recipients = model.delivery.len(),
            rules = model.usage_rules.len(),
            credentials = credentials.len(),
            "loading document"
        );

        let signatures = verify_signatures(&model)?;
        let document_key = recover_document_key(&model, credentials)?;

        let mut content_keys = Vec::with_capacity(model.content_keys.len());
        for entry in model.content_keys {
            let value = match (entry.value, &document_key) {
                (StoredValue::Plain(value), _) => Some(value),
                (StoredValue::Encrypted(sealed), Some(key)) => {
                    let plaintext = sealed.open(entry.id.as_bytes(), key)?;
                    let value = ContentKeyValue::from_slice(&plaintext).map_err(|_| {
                        CpixError::Decryption(format!(
                            "content key {} decrypted to {} bytes",
                            entry.id,
                            plaintext.len()
                        ))
                    })?;
                    Some(value)
                }
                (StoredValue::Encrypted(_), None) => None,
            };
            content_keys.push(ContentKey {
                id: entry.id,
                value,
            });
        }

        let document = Self {
            state: DocumentState::Loaded,
            content_keys,
            recipients: model.delivery.into_iter().map(|d| d.recipient).collect(),
            usage_rules: model.usage_rules,
            document_signer: None,
            content_keys_signers: Vec::new(),
            usage_rules_signers: Vec::new(),
            signatures: Some(signatures),
        };

        for rule in document.dangling_usage_rules() {
            tracing::warn!(kid = %rule.key_id, "usage rule references unknown content key");
        }

        tracing::debug!(
            available = document.content_keys.iter().filter(|k| k.has_value()).count(),
            "document loaded"
        );

        Ok(document)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Inspection
    // ─────────────────────────────────────────────────────────────────────

    /// Current lifecycle state.
    pub fn state(&self) -> DocumentState {
        self.state
    }

    /// Content keys in insertion order. After a load, values are `None`
    /// for keys the caller could not decrypt.
    pub fn content_keys(&self) -> &[ContentKey] {
        &self.content_keys
    }

    /// Look up a content key by id.
    pub fn content_key(&self, id: &KeyId) -> Option<&ContentKey> {
        self.content_keys.iter().find(|k| &k.id == id)
    }

    /// Recipient certificates.
    pub fn recipients(&self) -> &[Certificate] {
        &self.recipients
    }

    /// Usage rules in insertion order.
    pub fn usage_rules(&self) -> &[UsageRule] {
        &self.usage_rules
    }

    /// Usage rules for one content key.
    pub fn usage_rules_for<'a>(&'a self, id: &'a KeyId) -> impl Iterator<Item = &'a UsageRule> {
        self.usage_rules.iter().filter(move |r| &r.key_id == id)
    }

    /// Usage rules whose key id names no content key in this document.
    pub fn dangling_usage_rules(&self) -> Vec<&UsageRule> {
        self.usage_rules
            .iter()
            .filter(|r| self.content_key(&r.key_id).is_none())
            .collect()
    }

    /// Signature observations. `None` unless the document was loaded.
    pub fn signatures(&self) -> Option<&SignatureReport> {
        self.signatures.as_ref()
    }

    /// The certificate that validly signed the whole document, if any.
    pub fn document_signed_by(&self) -> Option<&Certificate> {
        self.signatures.as_ref().and_then(|s| s.document.signer())
    }

    /// Certificates that validly signed the content keys scope.
    pub fn content_keys_signed_by(&self) -> &[Certificate] {
        match &self.signatures {
            Some(report) => report.content_keys.signed_by(),
            None => &[],
        }
    }

    /// Certificates that validly signed the usage rules scope.
    pub fn usage_rules_signed_by(&self) -> &[Certificate] {
        match &self.signatures {
            Some(report) => report.usage_rules.signed_by(),
            None => &[],
        }
    }

    /// The single content key whose usage rules match `context`.
    ///
    /// A key matches when at least one of its rules matches. Keys without
    /// rules never match, and rules for unknown keys are skipped.
    pub fn resolve_content_key(&self, context: &ContentKeyContext) -> Result<&ContentKey> {
        let matching: Vec<&ContentKey> = self
            .content_keys
            .iter()
            .filter(|key| self.usage_rules_for(&key.id).any(|r| r.matches(context)))
            .collect();

        match matching.as_slice() {
            [key] => Ok(key),
            [] => Err(CpixError::NoMatchingKey),
            many => Err(CpixError::AmbiguousKeyResolution(many.len())),
        }
    }
}

fn verify_scope(
    model: &DocumentModel,
    scope: Scope,
    records: &[SignatureRecord],
) -> Result<ScopeSignatures> {
    let mut observed = ScopeSignatures::default();
    if records.is_empty() {
        return Ok(observed);
    }

    let content = model.scope_bytes(scope)?;
    for record in records {
        let outcome = record.verify(&content);
        if !outcome.is_valid() {
            tracing::warn!(
                ?scope,
                signer = %record.certificate.subject,
                "signature failed to verify"
            );
        }
        observed.record(outcome);
    }
    Ok(observed)
}

fn verify_signatures(model: &DocumentModel) -> Result<SignatureReport> {
    let content_keys = verify_scope(model, Scope::ContentKeys, &model.content_key_signatures)?;
    let usage_rules = verify_scope(model, Scope::UsageRules, &model.usage_rule_signatures)?;

    let document = match &model.document_signature {
        None => SignerObservation::Unsigned,
        Some(record) => {
            let outcome = record.verify(&model.scope_bytes(Scope::WholeDocument)?);
            if !outcome.is_valid() {
                tracing::warn!(
                    signer = %record.certificate.subject,
                    "document signature failed to verify"
                );
            }
            outcome.into()
        }
    };

    Ok(SignatureReport {
        document,
        content_keys,
        usage_rules,
    })
}

fn recover_document_key(
    model: &DocumentModel,
    credentials: &[Credential],
) -> Result<Option<EncryptionKey>> {
    if model.delivery.is_empty() {
        return Ok(None);
    }

    let entries: Vec<WrappedKey> = model
        .delivery
        .iter()
        .map(|d| d.wrapped_key.clone())
        .collect();
    let key = unwrap_any(&entries, credentials)?;
    if key.is_none() {
        tracing::debug!("no supplied credential is a recipient of this document");
    }
    Ok(key)
}
