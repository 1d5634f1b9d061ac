//! Proptest generators for property-based testing.

use proptest::prelude::*;

use cpix::{ContentKey, ContentKeyValue, CpixDocument, UsageFilter, UsageRule};
use cpix_core::{Credential, KeyId};

/// Generate a KeyId.
pub fn key_id() -> impl Strategy<Value = KeyId> {
    any::<[u8; 16]>().prop_map(KeyId::from_bytes)
}

/// Generate a content key value.
pub fn key_value() -> impl Strategy<Value = ContentKeyValue> {
    any::<[u8; 16]>().prop_map(ContentKeyValue::from_bytes)
}

/// Generate a credential from a random seed.
pub fn credential() -> impl Strategy<Value = Credential> {
    ("[A-Z][a-z]{2,11}", any::<[u8; 32]>())
        .prop_map(|(subject, seed)| Credential::from_seed(subject, &seed))
}

fn bound() -> impl Strategy<Value = Option<u64>> {
    prop::option::of(0u64..=10_000_000)
}

/// Generate a usage filter of any kind.
pub fn usage_filter() -> impl Strategy<Value = UsageFilter> {
    prop_oneof![
        (bound(), bound()).prop_map(|(min_pixels, max_pixels)| UsageFilter::Video {
            min_pixels,
            max_pixels
        }),
        (bound(), bound()).prop_map(|(min_channels, max_channels)| UsageFilter::Audio {
            min_channels,
            max_channels
        }),
        (bound(), bound()).prop_map(|(min_bps, max_bps)| UsageFilter::Bitrate { min_bps, max_bps }),
        "[a-z]{1,12}".prop_map(|label| UsageFilter::Label { label }),
    ]
}

/// Generate a usage rule for `key_id`.
pub fn usage_rule_for(key_id: KeyId) -> impl Strategy<Value = UsageRule> {
    prop::collection::vec(usage_filter(), 0..4).prop_map(move |filters| UsageRule { key_id, filters })
}

/// Parameters for building a document.
#[derive(Debug, Clone)]
pub struct DocumentParams {
    pub keys: Vec<(KeyId, [u8; 16])>,
    pub recipients: Vec<Credential>,
    pub signer: Option<Credential>,
    pub rules: Vec<UsageRule>,
}

impl Arbitrary for DocumentParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            prop::collection::btree_map(any::<[u8; 16]>(), any::<[u8; 16]>(), 0..6),
            prop::collection::vec(credential(), 0..4),
            prop::option::of(credential()),
        )
            .prop_flat_map(|(keys, recipients, signer)| {
                let keys: Vec<(KeyId, [u8; 16])> = keys
                    .into_iter()
                    .map(|(id, value)| (KeyId::from_bytes(id), value))
                    .collect();
                let ids: Vec<KeyId> = keys.iter().map(|(id, _)| *id).collect();
                let rules = if ids.is_empty() {
                    Just(Vec::new()).boxed()
                } else {
                    prop::collection::vec(
                        prop::sample::select(ids).prop_flat_map(usage_rule_for),
                        0..4,
                    )
                    .boxed()
                };
                (Just(keys), Just(recipients), Just(signer), rules)
            })
            .prop_map(|(keys, recipients, signer, rules)| DocumentParams {
                keys,
                recipients,
                signer,
                rules,
            })
            .boxed()
    }
}

/// Build a document from parameters.
pub fn document_from_params(params: &DocumentParams) -> CpixDocument {
    let mut doc = CpixDocument::new();
    for (id, value) in &params.keys {
        doc.add_content_key(ContentKey::new(*id, *value))
            .expect("generated key ids are distinct");
    }
    for recipient in &params.recipients {
        doc.add_recipient(recipient.certificate().clone())
            .expect("fresh document");
    }
    if let Some(signer) = &params.signer {
        doc.set_document_signer(signer.clone())
            .expect("fresh document");
    }
    for rule in &params.rules {
        doc.add_usage_rule(rule.clone()).expect("fresh document");
    }
    doc
}
