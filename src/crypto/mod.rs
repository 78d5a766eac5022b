//! Crypto adapter (C2).
//!
//! The core never implements cryptographic primitives itself — digest,
//! sign, and verify are specified here as traits, per spec.md §1's
//! "primitive cryptographic engine ... specified by interface only". A
//! `sha2`-backed [`Sha2Digester`] is provided because every other subsystem
//! needs a concrete digest to round-trip against in tests; signing is left
//! fully abstract via [`Signer`], with concrete implementations gated behind
//! the `test-signer` feature for use in tests and examples only.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Hash algorithms recognized by C2PA. Internally represented by this
/// string form; mapped to the CBOR short forms (`sha256`, `sha384`,
/// `sha512`) at the claim/assertion boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HashAlgorithm {
    Sha256,
    Sha384,
    Sha512,
}

impl TryFrom<String> for HashAlgorithm {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::from_c2pa_name(&value)
    }
}

impl From<HashAlgorithm> for String {
    fn from(value: HashAlgorithm) -> Self {
        value.c2pa_name().to_string()
    }
}

impl HashAlgorithm {
    /// The digest's output length in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }

    /// The C2PA short form used in CBOR (`sha256`, `sha384`, `sha512`).
    pub fn c2pa_name(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha384 => "sha384",
            HashAlgorithm::Sha512 => "sha512",
        }
    }

    /// Parse from the C2PA short form used in CBOR.
    pub fn from_c2pa_name(name: &str) -> Result<Self> {
        match name {
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha384" => Ok(HashAlgorithm::Sha384),
            "sha512" => Ok(HashAlgorithm::Sha512),
            other => Err(Error::UnsupportedAlgorithm(other.to_string())),
        }
    }

    /// The long internal string form used in `DataHashAssertion::algorithm`.
    pub fn internal_name(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "SHA-256",
            HashAlgorithm::Sha384 => "SHA-384",
            HashAlgorithm::Sha512 => "SHA-512",
        }
    }
}

impl Default for HashAlgorithm {
    fn default() -> Self {
        HashAlgorithm::Sha256
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.internal_name())
    }
}

/// A streaming digest session, updated possibly across many awaited range
/// reads. One session is owned by exactly one sign/validate flow (see
/// spec.md §5).
pub trait Digest {
    /// Feed more bytes into the running digest.
    fn update(&mut self, data: &[u8]);

    /// Consume the session and produce the final digest bytes.
    fn finish(self: Box<Self>) -> Vec<u8>;
}

/// Produces [`Digest`] sessions for a given algorithm, and one-shot digests.
pub trait Digester: Send + Sync {
    /// The algorithm this digester implements.
    fn algorithm(&self) -> HashAlgorithm;

    /// Start a new streaming digest session.
    fn start(&self) -> Box<dyn Digest>;

    /// Digest an entire buffer in one call.
    fn digest(&self, data: &[u8]) -> Vec<u8> {
        let mut session = self.start();
        session.update(data);
        session.finish()
    }
}

/// COSE signing algorithm, combining the COSE integer identifier with (for
/// ECDSA) the curve actually present on the signing certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningAlg {
    Es256,
    Es384,
    Es512,
    Ps256,
    Ps384,
    Ps512,
    Ed25519,
}

impl SigningAlg {
    /// The COSE (RFC 8152 / IANA) signed integer algorithm identifier.
    pub fn cose_id(&self) -> i64 {
        match self {
            SigningAlg::Es256 => -7,
            SigningAlg::Es384 => -35,
            SigningAlg::Es512 => -36,
            SigningAlg::Ps256 => -37,
            SigningAlg::Ps384 => -38,
            SigningAlg::Ps512 => -39,
            SigningAlg::Ed25519 => -8,
        }
    }

    /// Parse from a COSE integer algorithm identifier.
    pub fn from_cose_id(id: i64) -> Result<Self> {
        match id {
            -7 => Ok(SigningAlg::Es256),
            -35 => Ok(SigningAlg::Es384),
            -36 => Ok(SigningAlg::Es512),
            -37 => Ok(SigningAlg::Ps256),
            -38 => Ok(SigningAlg::Ps384),
            -39 => Ok(SigningAlg::Ps512),
            -8 => Ok(SigningAlg::Ed25519),
            other => Err(Error::UnsupportedAlgorithm(format!("COSE alg {other}"))),
        }
    }

    /// The digest algorithm this signing algorithm is paired with.
    pub fn hash_algorithm(&self) -> HashAlgorithm {
        match self {
            SigningAlg::Es256 | SigningAlg::Ps256 => HashAlgorithm::Sha256,
            SigningAlg::Es384 | SigningAlg::Ps384 => HashAlgorithm::Sha384,
            SigningAlg::Es512 | SigningAlg::Ps512 => HashAlgorithm::Sha512,
            // Ed25519 uses SHA-512 internally but C2PA timestamps over the
            // claim bytes directly; SHA-256 is used for message imprints.
            SigningAlg::Ed25519 => HashAlgorithm::Sha256,
        }
    }
}

/// External signing service: produces a raw signature over the bytes the
/// caller gives it (the caller is responsible for building the correct
/// `Sig_structure1` to-be-signed bytes; see [`crate::cose::sign`]).
pub trait Signer: Send + Sync {
    /// The signing algorithm this signer produces signatures for.
    fn alg(&self) -> SigningAlg;

    /// DER-encoded certificate chain: `certs()[0]` is the signing
    /// certificate, the rest are the chain up to (not including) the root.
    fn certs(&self) -> Result<Vec<Vec<u8>>>;

    /// Sign `data`, returning the raw signature bytes (no DER/COSE wrapping).
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// An RFC 3161 time authority URL, if this signer should attach a
    /// timestamp token. `None` means the manifest is produced without one.
    fn time_authority_url(&self) -> Option<String> {
        None
    }

    /// Upper bound on the produced COSE_Sign1 size, used to size-check
    /// `ensure_manifest_space` requests before any signing work happens.
    fn reserve_size(&self) -> usize {
        10_000
    }
}

/// Verifies a raw signature against the public key carried in a certificate.
/// Implemented per algorithm family by the certificate policy layer (C7),
/// which already has the parsed `x509_parser::X509Certificate` in hand.
pub trait SignatureVerifier {
    /// Verify `signature` over `data` using `public_key_der` (SPKI DER).
    fn verify(
        &self,
        alg: SigningAlg,
        public_key_der: &[u8],
        data: &[u8],
        signature: &[u8],
    ) -> Result<bool>;
}

/// BMFF v3 Merkle-tree hashing (spec.md §1 Non-goals: the tree algorithm
/// itself is out of scope, but the interface is named explicitly and must
/// exist). A caller that needs fragmented/streamed BMFF hashing plugs in
/// their own tree builder; [`NotImplemented`] is the only provided impl.
pub trait MerkleHashProvider: Send + Sync {
    /// Build a Merkle tree over `leaf_hashes` and return its root digest.
    fn merkle_root(&self, leaf_hashes: &[Vec<u8>]) -> Result<Vec<u8>>;
}

/// The only [`MerkleHashProvider`] this crate ships: always fails, so a
/// caller that wires one in by mistake gets a clear error instead of a
/// silently wrong root hash.
pub struct NotImplemented;

impl MerkleHashProvider for NotImplemented {
    fn merkle_root(&self, _leaf_hashes: &[Vec<u8>]) -> Result<Vec<u8>> {
        Err(Error::UnsupportedAlgorithm("BMFF v3 Merkle hashing".to_string()))
    }
}

pub mod sha2_digest;

#[cfg(feature = "test-signer")]
pub mod test_signer;

pub use sha2_digest::Sha2Digester;
#[cfg(feature = "test-signer")]
pub use test_signer::{EphemeralSigner, X509Verifier};
