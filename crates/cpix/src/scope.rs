//! Signable scopes and their canonical form.
//!
//! Every scope is lowered from the [`DocumentModel`] to a CBOR value with
//! integer keys and encoded deterministically. The scope discriminant is key
//! 0 of every scope value, so a signature made for one scope never verifies
//! for another.
//!
//! The whole-document scope covers the delivery list, both section scopes
//! and their signatures. Section signatures therefore have to exist before
//! the document signature is computed.
//!
//! **CRITICAL**: The key layout below is FROZEN. Changes break all existing
//! signatures.

use ciborium::value::Value;
use cpix_core::canonical::{bytes, entry, opt_uint, text, uint};
use cpix_core::canonical_bytes;

use crate::codec::{DeliveryEntry, DocumentModel, KeyEntry, StoredValue};
use crate::error::Result;
use crate::model::{UsageFilter, UsageRule};
use crate::signer::SignatureRecord;

/// An independently signable section of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Scope {
    /// The content keys section.
    ContentKeys = 1,
    /// The usage rules section.
    UsageRules = 2,
    /// Everything except the document signature itself.
    WholeDocument = 3,
}

impl Scope {
    /// Numeric discriminant embedded in the canonical value.
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

mod keys {
    pub const SCOPE: u64 = 0;

    // Section scopes
    pub const ITEMS: u64 = 1;

    // Whole document
    pub const VERSION: u64 = 1;
    pub const DELIVERY: u64 = 2;
    pub const CONTENT_KEYS: u64 = 3;
    pub const CONTENT_KEY_SIGNATURES: u64 = 4;
    pub const USAGE_RULES: u64 = 5;
    pub const USAGE_RULE_SIGNATURES: u64 = 6;
}

mod value_kind {
    pub const PLAIN: u64 = 0;
    pub const ENCRYPTED: u64 = 1;
}

mod filter_kind {
    pub const VIDEO: u64 = 0;
    pub const AUDIO: u64 = 1;
    pub const BITRATE: u64 = 2;
    pub const LABEL: u64 = 3;
}

impl DocumentModel {
    /// Canonical bytes of `scope`, the input to signing and verification.
    pub fn scope_bytes(&self, scope: Scope) -> Result<Vec<u8>> {
        Ok(canonical_bytes(&self.scope_value(scope))?)
    }

    fn scope_value(&self, scope: Scope) -> Value {
        let tag = entry(keys::SCOPE, uint(scope.to_u8().into()));
        match scope {
            Scope::ContentKeys => {
                Value::Map(vec![tag, entry(keys::ITEMS, content_keys_value(&self.content_keys))])
            }
            Scope::UsageRules => {
                Value::Map(vec![tag, entry(keys::ITEMS, usage_rules_value(&self.usage_rules))])
            }
            Scope::WholeDocument => Value::Map(vec![
                tag,
                entry(keys::VERSION, uint(self.version.into())),
                entry(
                    keys::DELIVERY,
                    Value::Array(self.delivery.iter().map(delivery_value).collect()),
                ),
                entry(keys::CONTENT_KEYS, content_keys_value(&self.content_keys)),
                entry(
                    keys::CONTENT_KEY_SIGNATURES,
                    signatures_value(&self.content_key_signatures),
                ),
                entry(keys::USAGE_RULES, usage_rules_value(&self.usage_rules)),
                entry(
                    keys::USAGE_RULE_SIGNATURES,
                    signatures_value(&self.usage_rule_signatures),
                ),
            ]),
        }
    }
}

fn content_keys_value(entries: &[KeyEntry]) -> Value {
    Value::Array(
        entries
            .iter()
            .map(|e| {
                let stored = match &e.value {
                    StoredValue::Plain(value) => Value::Map(vec![
                        entry(0, uint(value_kind::PLAIN)),
                        entry(1, bytes(value.as_bytes())),
                    ]),
                    StoredValue::Encrypted(sealed) => Value::Map(vec![
                        entry(0, uint(value_kind::ENCRYPTED)),
                        entry(1, uint(sealed.format.to_u8().into())),
                        entry(2, bytes(sealed.nonce.as_bytes())),
                        entry(3, bytes(&sealed.ciphertext)),
                    ]),
                };
                Value::Map(vec![entry(0, bytes(e.id.as_bytes())), entry(1, stored)])
            })
            .collect(),
    )
}

fn usage_rules_value(rules: &[UsageRule]) -> Value {
    Value::Array(
        rules
            .iter()
            .map(|r| {
                Value::Map(vec![
                    entry(0, bytes(r.key_id.as_bytes())),
                    entry(1, Value::Array(r.filters.iter().map(filter_value).collect())),
                ])
            })
            .collect(),
    )
}

fn filter_value(filter: &UsageFilter) -> Value {
    let (kind, fields) = match filter {
        UsageFilter::Video {
            min_pixels,
            max_pixels,
        } => (
            filter_kind::VIDEO,
            vec![entry(1, opt_uint(*min_pixels)), entry(2, opt_uint(*max_pixels))],
        ),
        UsageFilter::Audio {
            min_channels,
            max_channels,
        } => (
            filter_kind::AUDIO,
            vec![entry(1, opt_uint(*min_channels)), entry(2, opt_uint(*max_channels))],
        ),
        UsageFilter::Bitrate { min_bps, max_bps } => (
            filter_kind::BITRATE,
            vec![entry(1, opt_uint(*min_bps)), entry(2, opt_uint(*max_bps))],
        ),
        UsageFilter::Label { label } => (filter_kind::LABEL, vec![entry(1, text(label))]),
    };

    let mut map = vec![entry(0, uint(kind))];
    map.extend(fields);
    Value::Map(map)
}

fn delivery_value(d: &DeliveryEntry) -> Value {
    Value::Map(vec![
        entry(0, d.recipient.to_cbor_value()),
        entry(1, bytes(d.wrapped_key.ephemeral_public.as_bytes())),
        entry(2, bytes(d.wrapped_key.nonce.as_bytes())),
        entry(3, bytes(&d.wrapped_key.ciphertext)),
    ])
}

fn signatures_value(records: &[SignatureRecord]) -> Value {
    Value::Array(
        records
            .iter()
            .map(|r| {
                Value::Map(vec![
                    entry(0, r.certificate.to_cbor_value()),
                    entry(1, bytes(r.signature.as_bytes())),
                ])
            })
            .collect(),
    )
}
