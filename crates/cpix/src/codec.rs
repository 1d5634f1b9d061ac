//! Document codec: the text artifact format.
//!
//! [`DocumentModel`] is the stored form of a document: key values as they
//! travel (plain or sealed), wrapped document keys, usage rules and
//! signature records. This module converts it to and from JSON and does no
//! cryptography. Byte fields are lowercase hex.
//!
//! Unknown members are ignored so that newer producers can add fields.
//! Anything the engine needs that is missing, mistyped or the wrong length
//! is a [`CpixError::Parse`].

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use cpix_core::{
    decode_hex_array, Certificate, CoreError, Ed25519PublicKey, Ed25519Signature, KeyId,
    X25519PublicKey,
};
use cpix_envelope::{EncryptedValue, EncryptionFormat, EncryptionNonce, WrappedKey};

use crate::config::DocumentConfig;
use crate::error::{CpixError, Result};
use crate::model::{ContentKeyValue, UsageFilter, UsageRule};
use crate::signer::SignatureRecord;

/// The artifact format version this engine reads and writes.
pub const FORMAT_VERSION: u32 = 1;

/// How a content key value is stored in the artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredValue {
    /// In the clear (document has no recipients).
    Plain(ContentKeyValue),
    /// Sealed under the document key.
    Encrypted(EncryptedValue),
}

/// A stored content key entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEntry {
    /// Key identifier.
    pub id: KeyId,
    /// Stored value.
    pub value: StoredValue,
}

/// The document key wrapped for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryEntry {
    /// Recipient certificate.
    pub recipient: Certificate,
    /// Document key wrapped for that recipient.
    pub wrapped_key: WrappedKey,
}

/// The logical document tree, as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentModel {
    /// Format version.
    pub version: u32,
    /// One entry per recipient.
    pub delivery: Vec<DeliveryEntry>,
    /// Content key entries, in insertion order.
    pub content_keys: Vec<KeyEntry>,
    /// Signatures over the content keys scope.
    pub content_key_signatures: Vec<SignatureRecord>,
    /// Usage rules, in insertion order.
    pub usage_rules: Vec<UsageRule>,
    /// Signatures over the usage rules scope.
    pub usage_rule_signatures: Vec<SignatureRecord>,
    /// Signature over the whole document.
    pub document_signature: Option<SignatureRecord>,
}

impl DocumentModel {
    /// An empty model at the current format version.
    pub fn new() -> Self {
        Self {
            version: FORMAT_VERSION,
            delivery: Vec::new(),
            content_keys: Vec::new(),
            content_key_signatures: Vec::new(),
            usage_rules: Vec::new(),
            usage_rule_signatures: Vec::new(),
            document_signature: None,
        }
    }
}

impl Default for DocumentModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a model to artifact bytes.
pub fn encode(model: &DocumentModel, config: &DocumentConfig) -> Result<Vec<u8>> {
    let wire = WireDocument::from_model(model);
    let rendered = if config.pretty {
        serde_json::to_vec_pretty(&wire)
    } else {
        serde_json::to_vec(&wire)
    };
    rendered.map_err(|e| CpixError::Encoding(e.to_string()))
}

/// Parse artifact bytes into a model.
pub fn decode(bytes: &[u8]) -> Result<DocumentModel> {
    let wire: WireDocument =
        serde_json::from_slice(bytes).map_err(|e| CpixError::Parse(e.to_string()))?;
    wire.into_model()
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct WireDocument {
    version: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    delivery: Vec<WireDelivery>,
    content_keys: WireContentKeys,
    #[serde(default)]
    usage_rules: WireUsageRules,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signature: Option<WireSignature>,
}

#[derive(Serialize, Deserialize)]
struct WireCertificate {
    subject: String,
    signing_key: String,
    encryption_key: String,
}

#[derive(Serialize, Deserialize)]
struct WireDelivery {
    recipient: WireCertificate,
    wrapped_key: WireWrappedKey,
}

#[derive(Serialize, Deserialize)]
struct WireWrappedKey {
    ephemeral_public: String,
    nonce: String,
    ciphertext: String,
}

#[derive(Serialize, Deserialize)]
struct WireContentKeys {
    keys: Vec<WireContentKey>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    signatures: Vec<WireSignature>,
}

#[derive(Serialize, Deserialize)]
struct WireContentKey {
    kid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    plain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    encrypted: Option<WireEncryptedValue>,
}

#[derive(Serialize, Deserialize)]
struct WireEncryptedValue {
    format: u8,
    nonce: String,
    ciphertext: String,
}

#[derive(Default, Serialize, Deserialize)]
struct WireUsageRules {
    #[serde(default)]
    rules: Vec<WireUsageRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    signatures: Vec<WireSignature>,
}

#[derive(Serialize, Deserialize)]
struct WireUsageRule {
    kid: String,
    #[serde(default)]
    filters: Vec<UsageFilter>,
}

#[derive(Serialize, Deserialize)]
struct WireSignature {
    certificate: WireCertificate,
    value: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Model -> wire
// ─────────────────────────────────────────────────────────────────────────────

impl WireDocument {
    fn from_model(model: &DocumentModel) -> Self {
        Self {
            version: model.version,
            delivery: model
                .delivery
                .iter()
                .map(|d| WireDelivery {
                    recipient: WireCertificate::from_cert(&d.recipient),
                    wrapped_key: WireWrappedKey {
                        ephemeral_public: d.wrapped_key.ephemeral_public.to_hex(),
                        nonce: hex::encode(d.wrapped_key.nonce.as_bytes()),
                        ciphertext: hex::encode(&d.wrapped_key.ciphertext),
                    },
                })
                .collect(),
            content_keys: WireContentKeys {
                keys: model.content_keys.iter().map(WireContentKey::from_entry).collect(),
                signatures: model
                    .content_key_signatures
                    .iter()
                    .map(WireSignature::from_record)
                    .collect(),
            },
            usage_rules: WireUsageRules {
                rules: model
                    .usage_rules
                    .iter()
                    .map(|r| WireUsageRule {
                        kid: r.key_id.to_string(),
                        filters: r.filters.clone(),
                    })
                    .collect(),
                signatures: model
                    .usage_rule_signatures
                    .iter()
                    .map(WireSignature::from_record)
                    .collect(),
            },
            signature: model.document_signature.as_ref().map(WireSignature::from_record),
        }
    }
}

impl WireCertificate {
    fn from_cert(cert: &Certificate) -> Self {
        Self {
            subject: cert.subject.clone(),
            signing_key: cert.signing_key.to_hex(),
            encryption_key: cert.encryption_key.to_hex(),
        }
    }
}

impl WireContentKey {
    fn from_entry(entry: &KeyEntry) -> Self {
        let kid = entry.id.to_string();
        match &entry.value {
            StoredValue::Plain(value) => Self {
                kid,
                plain: Some(hex::encode(value.as_bytes())),
                encrypted: None,
            },
            StoredValue::Encrypted(sealed) => Self {
                kid,
                plain: None,
                encrypted: Some(WireEncryptedValue {
                    format: sealed.format.to_u8(),
                    nonce: hex::encode(sealed.nonce.as_bytes()),
                    ciphertext: hex::encode(&sealed.ciphertext),
                }),
            },
        }
    }
}

impl WireSignature {
    fn from_record(record: &SignatureRecord) -> Self {
        Self {
            certificate: WireCertificate::from_cert(&record.certificate),
            value: record.signature.to_hex(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire -> model
// ─────────────────────────────────────────────────────────────────────────────

fn parse_err(e: CoreError) -> CpixError {
    CpixError::Parse(e.to_string())
}

fn decode_hex_vec(field: &str, s: &str) -> Result<Vec<u8>> {
    hex::decode(s).map_err(|e| CpixError::Parse(format!("invalid hex in {field}: {e}")))
}

impl WireDocument {
    fn into_model(self) -> Result<DocumentModel> {
        if self.version != FORMAT_VERSION {
            return Err(CpixError::Parse(format!(
                "unsupported format version {} (expected {FORMAT_VERSION})",
                self.version
            )));
        }

        let delivery = self
            .delivery
            .into_iter()
            .map(WireDelivery::into_entry)
            .collect::<Result<Vec<_>>>()?;

        let mut seen = HashSet::new();
        let mut content_keys = Vec::with_capacity(self.content_keys.keys.len());
        for wire in self.content_keys.keys {
            let entry = wire.into_entry()?;
            if !seen.insert(entry.id) {
                return Err(CpixError::Parse(format!("duplicate content key id {}", entry.id)));
            }
            if matches!(entry.value, StoredValue::Encrypted(_)) && delivery.is_empty() {
                return Err(CpixError::Parse(format!(
                    "content key {} is encrypted but the document has no delivery data",
                    entry.id
                )));
            }
            content_keys.push(entry);
        }

        let content_key_signatures = self
            .content_keys
            .signatures
            .into_iter()
            .map(WireSignature::into_record)
            .collect::<Result<Vec<_>>>()?;

        let usage_rules = self
            .usage_rules
            .rules
            .into_iter()
            .map(|r| {
                Ok(UsageRule {
                    key_id: r.kid.parse().map_err(parse_err)?,
                    filters: r.filters,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let usage_rule_signatures = self
            .usage_rules
            .signatures
            .into_iter()
            .map(WireSignature::into_record)
            .collect::<Result<Vec<_>>>()?;

        let document_signature = self.signature.map(WireSignature::into_record).transpose()?;

        Ok(DocumentModel {
            version: self.version,
            delivery,
            content_keys,
            content_key_signatures,
            usage_rules,
            usage_rule_signatures,
            document_signature,
        })
    }
}

impl WireCertificate {
    fn into_cert(self) -> Result<Certificate> {
        Ok(Certificate::new(
            self.subject,
            Ed25519PublicKey::from_hex(&self.signing_key).map_err(parse_err)?,
            X25519PublicKey::from_hex(&self.encryption_key).map_err(parse_err)?,
        ))
    }
}

impl WireDelivery {
    fn into_entry(self) -> Result<DeliveryEntry> {
        let recipient = self.recipient.into_cert()?;
        let wrapped_key = WrappedKey {
            recipient: recipient.fingerprint()?,
            ephemeral_public: X25519PublicKey::from_hex(&self.wrapped_key.ephemeral_public)
                .map_err(parse_err)?,
            nonce: EncryptionNonce::from_bytes(
                decode_hex_array("wrapped key nonce", &self.wrapped_key.nonce)
                    .map_err(parse_err)?,
            ),
            ciphertext: decode_hex_vec("wrapped key ciphertext", &self.wrapped_key.ciphertext)?,
        };
        Ok(DeliveryEntry {
            recipient,
            wrapped_key,
        })
    }
}

impl WireContentKey {
    fn into_entry(self) -> Result<KeyEntry> {
        let id: KeyId = self.kid.parse().map_err(parse_err)?;
        let value = match (self.plain, self.encrypted) {
            (Some(plain), None) => StoredValue::Plain(
                ContentKeyValue::from_slice(&decode_hex_vec("content key value", &plain)?)
                    .map_err(parse_err)?,
            ),
            (None, Some(sealed)) => {
                let format = EncryptionFormat::from_u8(sealed.format).ok_or_else(|| {
                    CpixError::Parse(format!("unknown encryption format {}", sealed.format))
                })?;
                StoredValue::Encrypted(EncryptedValue {
                    format,
                    nonce: EncryptionNonce::from_bytes(
                        decode_hex_array("content key nonce", &sealed.nonce).map_err(parse_err)?,
                    ),
                    ciphertext: decode_hex_vec("content key ciphertext", &sealed.ciphertext)?,
                })
            }
            (Some(_), Some(_)) => {
                return Err(CpixError::Parse(format!(
                    "content key {id} has both a plain and an encrypted value"
                )))
            }
            (None, None) => {
                return Err(CpixError::Parse(format!("content key {id} has no value")))
            }
        };
        Ok(KeyEntry { id, value })
    }
}

impl WireSignature {
    fn into_record(self) -> Result<SignatureRecord> {
        Ok(SignatureRecord {
            certificate: self.certificate.into_cert()?,
            signature: Ed25519Signature::from_hex(&self.value).map_err(parse_err)?,
        })
    }
}
