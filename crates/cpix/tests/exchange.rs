//! End-to-end key exchange between a producer and consumers.

use anyhow::Result;
use cpix::{ContentKey, ContentKeyValue, CpixDocument, SignerObservation, UsageRule};
use cpix_core::{Credential, KeyId};

const KEY_A: KeyId = KeyId::from_bytes([0xaa; 16]);
const KEY_B: KeyId = KeyId::from_bytes([0xbb; 16]);
const VALUE_A: [u8; 16] = *b"0123456789abcdef";
const VALUE_B: [u8; 16] = *b"fedcba9876543210";

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn credential(subject: &str, seed: u8) -> Credential {
    Credential::from_seed(subject, &[seed; 32])
}

fn two_keys() -> Result<CpixDocument> {
    let mut doc = CpixDocument::new();
    doc.add_content_key(ContentKey::new(KEY_A, VALUE_A))?;
    doc.add_content_key(ContentKey::new(KEY_B, VALUE_B))?;
    Ok(doc)
}

fn value_of(doc: &CpixDocument, id: KeyId) -> Option<ContentKeyValue> {
    doc.content_key(&id).and_then(|k| k.value.clone())
}

#[test]
fn unsigned_plain_document_loads_without_credentials() -> Result<()> {
    init_tracing();

    let bytes = two_keys()?.to_bytes()?;
    let loaded = CpixDocument::from_bytes(&bytes, &[])?;

    assert_eq!(value_of(&loaded, KEY_A), Some(ContentKeyValue::from_bytes(VALUE_A)));
    assert_eq!(value_of(&loaded, KEY_B), Some(ContentKeyValue::from_bytes(VALUE_B)));

    let report = loaded.signatures().expect("loaded documents carry a report");
    assert_eq!(report.document, SignerObservation::Unsigned);
    assert!(report.content_keys.is_unsigned());
    assert!(report.usage_rules.is_unsigned());
    Ok(())
}

#[test]
fn signed_document_for_two_recipients() -> Result<()> {
    init_tracing();

    let signer = credential("Producer", 1);
    let r1 = credential("Recipient 1", 2);
    let r2 = credential("Recipient 2", 3);
    let outsider = credential("Outsider", 4);

    let mut doc = two_keys()?;
    doc.set_document_signer(signer.clone())?;
    doc.add_recipient(r1.certificate().clone())?;
    doc.add_recipient(r2.certificate().clone())?;
    let bytes = doc.to_bytes()?;

    // Either recipient recovers every key.
    for holder in [&r1, &r2] {
        let loaded = CpixDocument::from_bytes(&bytes, std::slice::from_ref(holder))?;
        assert_eq!(value_of(&loaded, KEY_A), Some(ContentKeyValue::from_bytes(VALUE_A)));
        assert_eq!(value_of(&loaded, KEY_B), Some(ContentKeyValue::from_bytes(VALUE_B)));
        assert_eq!(loaded.content_keys_signed_by(), [signer.certificate().clone()]);
    }

    // An unrelated credential gets the structure and signatures, not the values.
    let loaded = CpixDocument::from_bytes(&bytes, &[outsider])?;
    assert_eq!(loaded.content_keys().len(), 2);
    assert!(loaded.content_keys().iter().all(|k| k.value.is_none()));
    assert_eq!(loaded.content_keys_signed_by(), [signer.certificate().clone()]);
    assert_eq!(loaded.document_signed_by(), Some(signer.certificate()));

    // So does a loader with no credentials at all.
    let loaded = CpixDocument::from_bytes(&bytes, &[])?;
    assert!(loaded.content_keys().iter().all(|k| !k.has_value()));
    assert_eq!(loaded.content_keys_signed_by(), [signer.certificate().clone()]);
    Ok(())
}

#[test]
fn first_matching_credential_among_many_is_used() -> Result<()> {
    let r1 = credential("Recipient 1", 2);
    let mut doc = two_keys()?;
    doc.add_recipient(r1.certificate().clone())?;
    let bytes = doc.to_bytes()?;

    let keyring = [credential("Other A", 10), r1, credential("Other B", 11)];
    let loaded = CpixDocument::from_bytes(&bytes, &keyring)?;
    assert!(loaded.content_keys().iter().all(ContentKey::has_value));
    Ok(())
}

#[test]
fn content_keys_signer_without_document_signer() -> Result<()> {
    let signer = credential("Key Signer", 5);
    let mut doc = two_keys()?;
    doc.add_content_keys_signer(signer.clone())?;

    let loaded = CpixDocument::from_bytes(&doc.to_bytes()?, &[])?;
    assert_eq!(loaded.document_signed_by(), None);
    assert_eq!(
        loaded.signatures().map(|s| s.document.clone()),
        Some(SignerObservation::Unsigned)
    );
    assert!(loaded.signatures().is_some_and(|s| s.content_keys.is_signed_by(signer.certificate())));
    Ok(())
}

#[test]
fn distinct_signers_per_scope() -> Result<()> {
    let document_signer = credential("Publisher", 6);
    let keys_signer = credential("Key Server", 7);
    let rules_signer = credential("Rights Manager", 8);

    let mut doc = two_keys()?;
    doc.add_usage_rule(UsageRule::new(KEY_A))?;
    doc.set_document_signer(document_signer.clone())?;
    doc.add_content_keys_signer(keys_signer.clone())?;
    doc.add_usage_rules_signer(rules_signer.clone())?;

    let loaded = CpixDocument::from_bytes(&doc.to_bytes()?, &[])?;
    assert_eq!(loaded.document_signed_by(), Some(document_signer.certificate()));
    assert_eq!(
        loaded.content_keys_signed_by(),
        [
            document_signer.certificate().clone(),
            keys_signer.certificate().clone()
        ]
    );
    assert_eq!(
        loaded.usage_rules_signed_by(),
        [
            document_signer.certificate().clone(),
            rules_signer.certificate().clone()
        ]
    );
    Ok(())
}

#[test]
fn no_recipients_means_plain_values_for_everyone() -> Result<()> {
    let signer = credential("Producer", 1);
    let mut doc = two_keys()?;
    doc.set_document_signer(signer)?;
    let bytes = doc.to_bytes()?;

    let json: serde_json::Value = serde_json::from_slice(&bytes)?;
    assert!(json.get("delivery").is_none());

    for credentials in [vec![], vec![credential("Anyone", 9)]] {
        let loaded = CpixDocument::from_bytes(&bytes, &credentials)?;
        assert_eq!(value_of(&loaded, KEY_A), Some(ContentKeyValue::from_bytes(VALUE_A)));
        assert_eq!(value_of(&loaded, KEY_B), Some(ContentKeyValue::from_bytes(VALUE_B)));
    }
    Ok(())
}

#[test]
fn each_save_uses_a_fresh_document_key() -> Result<()> {
    let r1 = credential("Recipient 1", 2);
    let mut doc = two_keys()?;
    doc.add_recipient(r1.certificate().clone())?;

    let first = doc.to_bytes()?;
    let second = doc.to_bytes()?;
    assert_ne!(first, second);

    for bytes in [first, second] {
        let loaded = CpixDocument::from_bytes(&bytes, std::slice::from_ref(&r1))?;
        assert_eq!(value_of(&loaded, KEY_A), Some(ContentKeyValue::from_bytes(VALUE_A)));
    }
    Ok(())
}

#[test]
fn key_values_never_appear_in_encrypted_artifact() -> Result<()> {
    let mut doc = two_keys()?;
    doc.add_recipient(credential("Recipient 1", 2).certificate().clone())?;
    let text = String::from_utf8(doc.to_bytes()?)?;

    assert!(!text.contains(&hex::encode(VALUE_A)));
    assert!(!text.contains(&hex::encode(VALUE_B)));
    assert!(text.contains(&KEY_A.to_string()));
    Ok(())
}
