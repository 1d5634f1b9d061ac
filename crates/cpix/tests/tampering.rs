//! Corruption, tampering and re-formatting of saved artifacts.

use anyhow::Result;
use serde_json::Value;

use cpix::{
    ContentKey, ContentKeyValue, CpixDocument, CpixError, SignerObservation, UsageFilter,
    UsageRule,
};
use cpix_core::{Credential, KeyId};

const KEY_A: KeyId = KeyId::from_bytes([0xaa; 16]);
const KEY_B: KeyId = KeyId::from_bytes([0xbb; 16]);

fn credential(subject: &str, seed: u8) -> Credential {
    Credential::from_seed(subject, &[seed; 32])
}

struct Setup {
    signer: Credential,
    r1: Credential,
    r2: Credential,
    json: Value,
}

fn setup(with_recipients: bool) -> Result<Setup> {
    let signer = credential("Producer", 1);
    let r1 = credential("Recipient 1", 2);
    let r2 = credential("Recipient 2", 3);

    let mut doc = CpixDocument::new();
    doc.add_content_key(ContentKey::new(KEY_A, [0x11; 16]))?;
    doc.add_content_key(ContentKey::new(KEY_B, [0x22; 16]))?;
    doc.add_usage_rule(UsageRule::new(KEY_A).with_filter(UsageFilter::Label {
        label: "main".into(),
    }))?;
    doc.set_document_signer(signer.clone())?;
    if with_recipients {
        doc.add_recipient(r1.certificate().clone())?;
        doc.add_recipient(r2.certificate().clone())?;
    }

    let json = serde_json::from_slice(&doc.to_bytes()?)?;
    Ok(Setup { signer, r1, r2, json })
}

/// Flip one bit of the byte at `index` inside a hex string member.
fn flip_hex_bit(field: &mut Value, index: usize, bit: u8) -> Result<()> {
    let text = field.as_str().ok_or_else(|| anyhow::anyhow!("not a string"))?;
    let mut bytes = hex::decode(text)?;
    let index = index % bytes.len();
    bytes[index] ^= 1 << (bit % 8);
    *field = Value::String(hex::encode(bytes));
    Ok(())
}

fn load(json: &Value, credentials: &[Credential]) -> cpix::Result<CpixDocument> {
    let bytes = serde_json::to_vec(json).map_err(|e| CpixError::Encoding(e.to_string()))?;
    CpixDocument::from_bytes(&bytes, credentials)
}

#[test]
fn any_bit_flip_in_own_wrapped_key_is_decryption_error() -> Result<()> {
    let base = setup(true)?;
    let wrapped = base.json["delivery"][0]["wrapped_key"]["ciphertext"].as_str();
    assert_eq!(hex::decode(wrapped.unwrap_or_default())?.len(), 48);

    for index in [0, 7, 31, 32, 47] {
        for bit in [0, 3, 7] {
            let mut json = base.json.clone();
            flip_hex_bit(&mut json["delivery"][0]["wrapped_key"]["ciphertext"], index, bit)?;

            let err = load(&json, std::slice::from_ref(&base.r1)).unwrap_err();
            assert!(matches!(err, CpixError::Decryption(_)), "byte {index} bit {bit}: {err}");
        }
    }
    Ok(())
}

#[test]
fn flipped_wrapped_key_nonce_is_decryption_error() -> Result<()> {
    let base = setup(true)?;
    let mut json = base.json.clone();
    flip_hex_bit(&mut json["delivery"][1]["wrapped_key"]["nonce"], 5, 2)?;

    assert!(matches!(
        load(&json, std::slice::from_ref(&base.r2)),
        Err(CpixError::Decryption(_))
    ));
    Ok(())
}

#[test]
fn damage_to_another_recipients_entry_is_only_a_signature_failure() -> Result<()> {
    let base = setup(true)?;
    let mut json = base.json.clone();
    flip_hex_bit(&mut json["delivery"][1]["wrapped_key"]["ciphertext"], 0, 0)?;

    let loaded = load(&json, std::slice::from_ref(&base.r1))?;
    assert!(loaded.content_keys().iter().all(ContentKey::has_value));

    let report = loaded.signatures().expect("loaded");
    assert_eq!(
        report.document,
        SignerObservation::Invalid(base.signer.certificate().clone())
    );
    assert!(report.content_keys.is_signed_by(base.signer.certificate()));
    Ok(())
}

#[test]
fn flipped_content_key_ciphertext_is_decryption_error() -> Result<()> {
    let base = setup(true)?;
    let mut json = base.json.clone();
    flip_hex_bit(
        &mut json["content_keys"]["keys"][1]["encrypted"]["ciphertext"],
        20,
        6,
    )?;

    assert!(matches!(
        load(&json, std::slice::from_ref(&base.r1)),
        Err(CpixError::Decryption(_))
    ));

    // A non-recipient never opens the value, so the damage shows up only as
    // invalid signatures.
    let loaded = load(&json, &[])?;
    assert!(loaded.signatures().expect("loaded").has_invalid());
    Ok(())
}

#[test]
fn swapped_encrypted_values_fail_authentication() -> Result<()> {
    let base = setup(true)?;
    let mut json = base.json.clone();
    let keys = &mut json["content_keys"]["keys"];
    let a = keys[0]["encrypted"].take();
    let b = keys[1]["encrypted"].take();
    keys[0]["encrypted"] = b;
    keys[1]["encrypted"] = a;

    assert!(matches!(
        load(&json, std::slice::from_ref(&base.r1)),
        Err(CpixError::Decryption(_))
    ));
    Ok(())
}

#[test]
fn altered_plain_value_invalidates_signatures_but_loads() -> Result<()> {
    let base = setup(false)?;
    let mut json = base.json.clone();
    flip_hex_bit(&mut json["content_keys"]["keys"][0]["plain"], 0, 0)?;

    let loaded = load(&json, &[])?;
    let mut altered = [0x11; 16];
    altered[0] ^= 1;
    let value = loaded.content_key(&KEY_A).and_then(|k| k.value.clone());
    assert_eq!(value, Some(ContentKeyValue::from_bytes(altered)));

    let report = loaded.signatures().expect("loaded");
    let signer = base.signer.certificate();
    assert_eq!(report.document, SignerObservation::Invalid(signer.clone()));
    assert_eq!(report.content_keys.invalid(), [signer.clone()]);
    assert!(report.content_keys.signed_by().is_empty());
    assert!(report.usage_rules.is_signed_by(signer));
    assert_eq!(loaded.document_signed_by(), None);
    Ok(())
}

#[test]
fn altered_usage_rule_invalidates_rule_and_document_signatures() -> Result<()> {
    let base = setup(false)?;
    let mut json = base.json.clone();
    json["usage_rules"]["rules"][0]["filters"][0]["label"] = Value::from("extra");

    let loaded = load(&json, &[])?;
    let report = loaded.signatures().expect("loaded");
    let signer = base.signer.certificate();
    assert_eq!(report.usage_rules.invalid(), [signer.clone()]);
    assert!(report.content_keys.is_signed_by(signer));
    assert!(matches!(report.document, SignerObservation::Invalid(_)));
    Ok(())
}

#[test]
fn forged_signer_certificate_is_reported_invalid() -> Result<()> {
    let base = setup(false)?;
    let impostor = credential("Producer", 99);
    let mut json = base.json.clone();
    json["signature"]["certificate"]["signing_key"] =
        Value::from(impostor.certificate().signing_key.to_hex());

    let loaded = load(&json, &[])?;
    assert!(matches!(
        &loaded.signatures().expect("loaded").document,
        SignerObservation::Invalid(cert) if cert.signing_key == impostor.certificate().signing_key
    ));
    assert_eq!(loaded.document_signed_by(), None);
    Ok(())
}

#[test]
fn removing_document_signature_reads_as_unsigned() -> Result<()> {
    let base = setup(false)?;
    let mut json = base.json.clone();
    json.as_object_mut()
        .ok_or_else(|| anyhow::anyhow!("artifact is not an object"))?
        .remove("signature");

    let loaded = load(&json, &[])?;
    let report = loaded.signatures().expect("loaded");
    assert_eq!(report.document, SignerObservation::Unsigned);
    assert!(report.content_keys.is_signed_by(base.signer.certificate()));
    Ok(())
}

#[test]
fn reformatting_keeps_signatures_valid() -> Result<()> {
    let base = setup(true)?;

    // Compact output with members re-ordered alphabetically.
    let compact = serde_json::to_vec(&base.json)?;
    // Deeply indented output with an unknown member added.
    let mut extended = base.json.clone();
    extended["comment"] = Value::from("re-exported by a relay");
    let pretty = serde_json::to_vec_pretty(&extended)?;

    for bytes in [compact, pretty] {
        let loaded = CpixDocument::from_bytes(&bytes, std::slice::from_ref(&base.r1))?;
        let report = loaded.signatures().expect("loaded");
        assert!(!report.has_invalid());
        assert_eq!(loaded.document_signed_by(), Some(base.signer.certificate()));
        assert!(loaded.content_keys().iter().all(ContentKey::has_value));
    }
    Ok(())
}

#[test]
fn structural_damage_is_parse_error() -> Result<()> {
    let base = setup(true)?;

    let mut truncated = serde_json::to_vec(&base.json)?;
    truncated.truncate(truncated.len() / 2);
    assert!(matches!(
        CpixDocument::from_bytes(&truncated, &[]),
        Err(CpixError::Parse(_))
    ));

    let mut bad_kid = base.json.clone();
    bad_kid["content_keys"]["keys"][0]["kid"] = Value::from("not-a-key-id");
    assert!(matches!(load(&bad_kid, &[]), Err(CpixError::Parse(_))));

    let mut bad_filter = base.json.clone();
    bad_filter["usage_rules"]["rules"][0]["filters"][0]["type"] = Value::from("hologram");
    assert!(matches!(load(&bad_filter, &[]), Err(CpixError::Parse(_))));

    let mut no_delivery = base.json.clone();
    no_delivery["delivery"] = Value::Array(vec![]);
    assert!(matches!(load(&no_delivery, &[]), Err(CpixError::Parse(_))));
    Ok(())
}
