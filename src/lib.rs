//! `c2pa-core`: JUMBF, manifest, and COSE core for reading, writing, and
//! validating C2PA content provenance manifests.
//!
//! # Layout
//!
//! - [`jumbf`] — the recursive JUMBF box codec (C3).
//! - [`assets`] — per-format embedding: JPEG, PNG, BMFF/HEIC, TIFF, MP3, GIF (C4).
//! - [`claim`], [`manifest`], [`manifest_builder`], [`signature`],
//!   [`hashed_uri`] — the manifest data model and its builder (C5).
//! - [`crypto`], [`cose`], [`cert`], [`timestamp`] — the cryptographic
//!   adapter, COSE_Sign1 codec, certificate policy, and RFC 3161
//!   timestamping (C2, C6, C7, C8).
//! - [`validation`] — the end-to-end validation pipeline (C9).
//!
//! # Example
//!
//! ```no_run
//! use c2pa_core::assets::Asset;
//! use c2pa_core::manifest::ManifestStore;
//!
//! # fn main() -> c2pa_core::Result<()> {
//! let bytes = std::fs::read("photo.jpg")?;
//! let asset = Asset::parse(bytes)?;
//! if let Some(jumbf) = asset.get_manifest_jumbf()? {
//!     let root = c2pa_core::jumbf::parse(&jumbf)?;
//!     let store = ManifestStore::read(root)?;
//!     println!("active manifest: {}", store.active_manifest().unwrap().label);
//! }
//! # Ok(())
//! # }
//! ```

pub mod assertions;
pub mod assets;
pub mod binary;
pub mod cert;
pub mod claim;
pub mod cose;
pub mod crypto;
pub mod der;
pub mod error;
pub mod hash_exclusion;
pub mod hashed_uri;
pub mod jumbf;
pub mod manifest;
pub mod manifest_builder;
pub mod signature;
pub mod timestamp;
pub mod validation;

pub use assets::{Asset, AssetHandler};
pub use claim::Claim;
pub use error::{Error, Result};
pub use manifest::{Manifest, ManifestStore};
pub use manifest_builder::ManifestBuilderConfig;
pub use signature::Signature;
pub use validation::{validate_manifest, StatusCode, ValidationResult, ValidationStatus};
