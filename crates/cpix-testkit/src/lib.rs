//! # CPIX Testkit
//!
//! Testing utilities for the CPIX document engine.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: deterministic parties and sample documents
//! - **Scenarios**: reproducible saves with a seeded random source
//! - **Generators**: Proptest strategies for property-based testing
//!
//! ## Test Fixtures
//!
//! ```rust
//! use cpix::CpixDocument;
//! use cpix_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let bytes = fixture.signed_encrypted_document().to_bytes().unwrap();
//!
//! let loaded = CpixDocument::from_bytes(&bytes, &[fixture.recipient1.clone()]).unwrap();
//! assert_eq!(loaded.document_signed_by(), Some(fixture.signer_certificate()));
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use cpix_testkit::generators::{document_from_params, DocumentParams};
//!
//! proptest! {
//!     #[test]
//!     fn saves_always_load(params: DocumentParams) {
//!         let bytes = document_from_params(&params).to_bytes().unwrap();
//!         prop_assert!(cpix::CpixDocument::from_bytes(&bytes, &params.recipients).is_ok());
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_party_credentials, TestFixture};
pub use generators::{document_from_params, DocumentParams};
pub use vectors::{all_scenarios, verify_all_scenarios, Scenario};
