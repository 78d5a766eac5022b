//! Error types for c2pa-core
//!
//! Two categories per the validation/error design: parse-time failures
//! (`Error`, this module) and policy-level validation failures, which are
//! never thrown and instead accumulate as entries in a `ValidationResult`
//! (see [`crate::validation`]).

use std::io;

/// Result type for c2pa-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing, building, or signing C2PA data.
///
/// Parsing a single malformed assertion does not propagate one of these —
/// it is recorded as an opaque assertion instead (see [`crate::assertions`]).
/// These errors represent failures that abort the current operation: a
/// malformed JUMBF box, a `write_manifest_jumbf` size mismatch, or a signing
/// precondition that wasn't met.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error reading or writing asset bytes.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A JUMBF box, claim, or assertion did not parse as well-formed content.
    #[error("Malformed content: {0}")]
    MalformedContent(String),

    /// File format not recognized by any registered asset handler.
    #[error("Unsupported asset format")]
    UnsupportedFormat,

    /// `write_manifest_jumbf` was called with data whose length doesn't
    /// match the space reserved by `ensure_manifest_space`.
    #[error("Manifest JUMBF is {actual} bytes, but {expected} bytes were reserved")]
    ReservedSpaceMismatch { expected: usize, actual: usize },

    /// A JUMBF box, CBOR map, or COSE structure referenced a hashed URI that
    /// could not be resolved against the manifest store.
    #[error("Could not resolve hashed URI: {0}")]
    UnresolvedUri(String),

    /// The claim or a `Signer` did not declare a signing algorithm.
    #[error("Signing algorithm not specified")]
    MissingAlgorithm,

    /// A `Signer` did not supply a certificate for the `x5chain` header.
    #[error("Signer did not supply a certificate chain")]
    MissingCertificate,

    /// The requested signing/hash algorithm is not one C2PA recognizes.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Producing the padded COSE_Sign1 failed (e.g. reserved box too small).
    #[error("COSE signature error: {0}")]
    CoseSignature(String),

    /// The configured `TimestampProvider` could not be contacted or
    /// returned a malformed `TimeStampResp`.
    #[error("Timestamp provider error: {0}")]
    TimestampProvider(String),

    /// CBOR encode/decode failure.
    #[error("CBOR error: {0}")]
    Cbor(String),

    /// JSON encode/decode failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ciborium::de::Error<io::Error>> for Error {
    fn from(e: ciborium::de::Error<io::Error>) -> Self {
        Error::Cbor(e.to_string())
    }
}

impl From<ciborium::ser::Error<io::Error>> for Error {
    fn from(e: ciborium::ser::Error<io::Error>) -> Self {
        Error::Cbor(e.to_string())
    }
}
