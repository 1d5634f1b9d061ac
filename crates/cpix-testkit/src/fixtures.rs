//! Test fixtures and helpers.
//!
//! Deterministic parties and ready-made documents for integration tests.

use cpix::{ContentKey, CpixDocument, UsageFilter, UsageRule};
use cpix_core::{Certificate, Credential, KeyId};

/// Key id used for the first sample key ("A").
pub const KEY_A: KeyId = KeyId::from_bytes([
    0x0a, 0x0a, 0x0a, 0x0a, 0x0a, 0x0a, 0x0a, 0x0a, 0x0a, 0x0a, 0x0a, 0x0a, 0x0a, 0x0a, 0x0a, 0x0a,
]);

/// Key id used for the second sample key ("B").
pub const KEY_B: KeyId = KeyId::from_bytes([
    0x0b, 0x0b, 0x0b, 0x0b, 0x0b, 0x0b, 0x0b, 0x0b, 0x0b, 0x0b, 0x0b, 0x0b, 0x0b, 0x0b, 0x0b, 0x0b,
]);

/// Value of sample key A.
pub const VALUE_A: [u8; 16] = [0xa1; 16];

/// Value of sample key B.
pub const VALUE_B: [u8; 16] = [0xb2; 16];

/// A producer and two recipients, all derived from fixed seeds.
pub struct TestFixture {
    pub signer: Credential,
    pub recipient1: Credential,
    pub recipient2: Credential,
}

impl TestFixture {
    /// Create the standard fixture.
    pub fn new() -> Self {
        Self {
            signer: Credential::from_seed("Producer", &[0x51; 32]),
            recipient1: Credential::from_seed("Recipient 1", &[0x52; 32]),
            recipient2: Credential::from_seed("Recipient 2", &[0x53; 32]),
        }
    }

    /// A credential unrelated to any sample document.
    pub fn outsider(&self) -> Credential {
        Credential::from_seed("Outsider", &[0x5f; 32])
    }

    /// The producer's public certificate.
    pub fn signer_certificate(&self) -> &Certificate {
        self.signer.certificate()
    }

    /// Keys A and B only: no signer, no recipients, no rules.
    pub fn plain_document(&self) -> CpixDocument {
        let mut doc = CpixDocument::new();
        for key in sample_keys() {
            doc.add_content_key(key)
                .expect("sample keys have distinct ids and known values");
        }
        doc
    }

    /// Keys A and B, signed by the producer, for both recipients.
    pub fn signed_encrypted_document(&self) -> CpixDocument {
        let mut doc = self.plain_document();
        doc.set_document_signer(self.signer.clone())
            .expect("fresh document");
        doc.add_recipient(self.recipient1.certificate().clone())
            .expect("fresh document");
        doc.add_recipient(self.recipient2.certificate().clone())
            .expect("fresh document");
        doc
    }

    /// The signed, encrypted document plus an SD/HD usage rule split:
    /// A for video up to 576p, B for anything larger and for audio.
    pub fn document_with_rules(&self) -> CpixDocument {
        let mut doc = self.signed_encrypted_document();
        for rule in sample_rules() {
            doc.add_usage_rule(rule).expect("fresh document");
        }
        doc
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Sample keys A and B.
pub fn sample_keys() -> Vec<ContentKey> {
    vec![
        ContentKey::new(KEY_A, VALUE_A),
        ContentKey::new(KEY_B, VALUE_B),
    ]
}

/// Usage rules splitting A and B by resolution.
pub fn sample_rules() -> Vec<UsageRule> {
    vec![
        UsageRule::new(KEY_A).with_filter(UsageFilter::Video {
            min_pixels: None,
            max_pixels: Some(SD_PIXELS),
        }),
        UsageRule::new(KEY_B).with_filter(UsageFilter::Video {
            min_pixels: Some(SD_PIXELS + 1),
            max_pixels: None,
        }),
        UsageRule::new(KEY_B).with_filter(UsageFilter::Audio {
            min_channels: None,
            max_channels: None,
        }),
    ]
}

/// Pixels per frame of a 720x576 picture.
pub const SD_PIXELS: u64 = 720 * 576;

/// Create `count` distinct recipient credentials.
pub fn multi_party_credentials(count: usize) -> Vec<Credential> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[..8].copy_from_slice(&(i as u64).to_le_bytes());
            seed[31] = 0xc0;
            Credential::from_seed(format!("Party {i}"), &seed)
        })
        .collect()
}
