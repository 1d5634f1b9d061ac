//! Named document scenarios.
//!
//! Each scenario fixes every input of a save, including the random source,
//! so rendering it twice must produce byte-identical artifacts. The same
//! scenarios drive the benchmarks.

use rand::rngs::StdRng;
use rand::SeedableRng;

use cpix::{ContentKey, CpixDocument, DocumentConfig, Result, UsageRule};
use cpix_core::{Credential, KeyId};

use crate::fixtures::multi_party_credentials;

/// A reproducible document setup.
#[derive(Debug, Clone)]
pub struct Scenario {
    /// Human-readable name.
    pub name: &'static str,
    /// Number of content keys.
    pub keys: usize,
    /// Number of recipients.
    pub recipients: usize,
    /// Whether a document signer is set.
    pub signed: bool,
    /// Whether every key gets an unconditional usage rule.
    pub rules: bool,
    /// Seed for the save-time random source.
    pub rng_seed: u64,
}

/// All scenarios.
pub fn all_scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "plain, unsigned",
            keys: 2,
            recipients: 0,
            signed: false,
            rules: false,
            rng_seed: 1,
        },
        Scenario {
            name: "plain, signed with rules",
            keys: 2,
            recipients: 0,
            signed: true,
            rules: true,
            rng_seed: 2,
        },
        Scenario {
            name: "two recipients, signed",
            keys: 2,
            recipients: 2,
            signed: true,
            rules: false,
            rng_seed: 3,
        },
        Scenario {
            name: "many keys, many recipients",
            keys: 32,
            recipients: 16,
            signed: true,
            rules: true,
            rng_seed: 4,
        },
    ]
}

impl Scenario {
    /// The recipient credentials of this scenario.
    pub fn recipient_credentials(&self) -> Vec<Credential> {
        multi_party_credentials(self.recipients)
    }

    /// The signer, when the scenario is signed.
    pub fn signer(&self) -> Option<Credential> {
        self.signed
            .then(|| Credential::from_seed("Scenario Signer", &[0x77; 32]))
    }

    /// Build the document.
    pub fn build(&self) -> Result<CpixDocument> {
        let mut doc = CpixDocument::new();
        for i in 0..self.keys {
            let mut id = [0u8; 16];
            id[..8].copy_from_slice(&(i as u64).to_be_bytes());
            let key_id = KeyId::from_bytes(id);

            doc.add_content_key(ContentKey::new(key_id, [i as u8; 16]))?;
            if self.rules {
                doc.add_usage_rule(UsageRule::new(key_id))?;
            }
        }
        for recipient in self.recipient_credentials() {
            doc.add_recipient(recipient.certificate().clone())?;
        }
        if let Some(signer) = self.signer() {
            doc.set_document_signer(signer)?;
        }
        Ok(doc)
    }

    /// Build and render the document with the scenario's seeded RNG.
    pub fn render(&self) -> Result<Vec<u8>> {
        let mut rng = StdRng::seed_from_u64(self.rng_seed);
        self.build()?
            .to_bytes_with_config(&mut rng, &DocumentConfig::compact())
    }
}

/// Render every scenario twice and check that the outputs agree.
pub fn verify_all_scenarios() -> Result<Vec<(&'static str, bool)>> {
    all_scenarios()
        .iter()
        .map(|s| Ok((s.name, s.render()? == s.render()?)))
        .collect()
}
