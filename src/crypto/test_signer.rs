//! Concrete `Signer`/`SignatureVerifier` implementations used only by tests
//! and examples to exercise the sign → embed → validate round trip without
//! a production KMS or HSM in the loop. Gated behind `test-signer` so the
//! public `Signer`/`SignatureVerifier` traits never depend on a specific
//! crypto backend.

use ed25519_dalek::{Signer as _, SigningKey, VerifyingKey};
use p256::ecdsa::{signature::Verifier as _, Signature as P256Signature};
use rand_core::OsRng;
use rsa::pkcs1::{DecodeRsaPublicKey, EncodeRsaPublicKey};
use rsa::signature::Verifier as _;

use crate::crypto::{SignatureVerifier, Signer, SigningAlg};
use crate::error::{Error, Result};

/// An in-memory Ed25519 signer that self-signs its own leaf certificate's
/// public key — suitable for unit tests, never for production signing.
pub struct EphemeralSigner {
    signing_key: SigningKey,
    certs: Vec<Vec<u8>>,
    time_authority_url: Option<String>,
}

impl EphemeralSigner {
    /// Build a new signer with a freshly generated key and a placeholder
    /// single-entry certificate chain (a real SPKI-wrapped DER blob, not a
    /// full X.509 certificate — enough to drive the sign/pad/verify paths
    /// exercised by this crate's tests).
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let spki = ed25519_spki_der(&signing_key.verifying_key());
        Self {
            signing_key,
            certs: vec![spki],
            time_authority_url: None,
        }
    }

    /// Enable RFC 3161 counter-signing against the given time authority URL.
    pub fn with_time_authority(mut self, url: impl Into<String>) -> Self {
        self.time_authority_url = Some(url.into());
        self
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }
}

impl Signer for EphemeralSigner {
    fn alg(&self) -> SigningAlg {
        SigningAlg::Ed25519
    }

    fn certs(&self) -> Result<Vec<Vec<u8>>> {
        Ok(self.certs.clone())
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(self.signing_key.sign(data).to_bytes().to_vec())
    }

    fn time_authority_url(&self) -> Option<String> {
        self.time_authority_url.clone()
    }
}

/// Minimal SPKI DER wrapper around a raw Ed25519 public key, so the test
/// signer can exercise the same `certs()[0]` SPKI-extraction path that a
/// real X.509 leaf certificate's `subjectPublicKeyInfo` would produce.
fn ed25519_spki_der(key: &VerifyingKey) -> Vec<u8> {
    // SEQUENCE { AlgorithmIdentifier { OID 1.3.101.112 }, BIT STRING <raw key> }
    let alg_id: &[u8] = &[0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70];
    let raw = key.to_bytes();
    let mut bit_string = Vec::with_capacity(raw.len() + 2);
    bit_string.push(0x03); // BIT STRING tag
    bit_string.push((raw.len() + 1) as u8);
    bit_string.push(0x00); // no unused bits
    bit_string.extend_from_slice(&raw);

    let mut inner = Vec::new();
    inner.extend_from_slice(alg_id);
    inner.extend_from_slice(&bit_string);

    let mut seq = vec![0x30, inner.len() as u8];
    seq.extend_from_slice(&inner);
    seq
}

/// Verifies signatures against the raw public-key bytes carried in an
/// SPKI's `subjectPublicKey` BIT STRING, dispatching on [`SigningAlg`].
pub struct X509Verifier;

impl SignatureVerifier for X509Verifier {
    fn verify(
        &self,
        alg: SigningAlg,
        public_key_der: &[u8],
        data: &[u8],
        signature: &[u8],
    ) -> Result<bool> {
        match alg {
            SigningAlg::Ed25519 => {
                let key_bytes: [u8; 32] = public_key_der
                    .try_into()
                    .map_err(|_| Error::MalformedContent("invalid Ed25519 public key".into()))?;
                let key = VerifyingKey::from_bytes(&key_bytes)
                    .map_err(|e| Error::MalformedContent(e.to_string()))?;
                let sig_bytes: [u8; 64] = signature
                    .try_into()
                    .map_err(|_| Error::MalformedContent("invalid Ed25519 signature".into()))?;
                let sig = ed25519_dalek::Signature::from_bytes(&sig_bytes);
                Ok(key.verify_strict(data, &sig).is_ok())
            }
            SigningAlg::Es256 | SigningAlg::Es384 | SigningAlg::Es512 => {
                let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(public_key_der)
                    .map_err(|e| Error::MalformedContent(e.to_string()))?;
                let sig = P256Signature::from_slice(signature)
                    .map_err(|e| Error::MalformedContent(e.to_string()))?;
                Ok(key.verify(data, &sig).is_ok())
            }
            SigningAlg::Ps256 | SigningAlg::Ps384 | SigningAlg::Ps512 => {
                let public_key = rsa::RsaPublicKey::from_pkcs1_der(public_key_der)
                    .map_err(|e| Error::MalformedContent(e.to_string()))?;
                let verifying_key: rsa::pss::VerifyingKey<sha2::Sha256> =
                    rsa::pss::VerifyingKey::new(public_key);
                let sig = rsa::pss::Signature::try_from(signature)
                    .map_err(|e| Error::MalformedContent(e.to_string()))?;
                Ok(verifying_key.verify(data, &sig).is_ok())
            }
        }
    }
}

/// Re-encode an RSA public key as PKCS#1 DER, the form stored in an SPKI's
/// `subjectPublicKey` for `rsaEncryption` keys.
pub fn rsa_public_key_to_der(key: &rsa::RsaPublicKey) -> Result<Vec<u8>> {
    key.to_pkcs1_der()
        .map(|doc| doc.as_bytes().to_vec())
        .map_err(|e| Error::MalformedContent(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ephemeral_signer_round_trips() {
        let signer = EphemeralSigner::generate();
        let data = b"claim bytes to sign";
        let sig = signer.sign(data).unwrap();

        let verifier = X509Verifier;
        let raw_key = signer.verifying_key().to_bytes();
        assert!(verifier
            .verify(SigningAlg::Ed25519, &raw_key, data, &sig)
            .unwrap());

        assert!(!verifier
            .verify(SigningAlg::Ed25519, &raw_key, b"tampered", &sig)
            .unwrap());
    }
}
