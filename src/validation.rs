//! The validation pipeline (C9, §4.6): given a parsed [`ManifestStore`] and
//! the asset bytes it was extracted from, run every check C2PA defines over
//! a single manifest and fold the outcome into an ordered list of status
//! entries plus one aggregate verdict.
//!
//! Checks run in a fixed order so two validators given the same inputs
//! produce the same `status_entries` sequence: HashedURI resolution, then
//! data-hash, then BMFF-hash, then the timestamp token(s), then certificate
//! policy, then the COSE signature itself.

use chrono::{DateTime, Utc};
use x509_parser::certificate::X509Certificate;
use x509_parser::public_key::PublicKey;

use crate::assertions::Assertion;
use crate::cert::{self, CertificateRole};
use crate::cose;
use crate::crypto::{Digester, HashAlgorithm, Sha2Digester, SignatureVerifier};
use crate::der;
use crate::error::{Error, Result};
use crate::hash_exclusion::Exclusion;
use crate::manifest::{Manifest, ManifestStore};

/// One outcome from a single check. `uri` names the thing the check ran
/// against (an assertion label, a hashed-uri, or absent for store-wide
/// checks like the COSE signature itself).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationStatus {
    pub code: StatusCode,
    pub uri: Option<String>,
    pub explanation: Option<String>,
}

impl ValidationStatus {
    fn new(code: StatusCode) -> Self {
        Self {
            code,
            uri: None,
            explanation: None,
        }
    }

    fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }
}

/// Status codes a validation run can produce (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    ClaimSignatureValidated,
    ClaimSignatureMismatch,
    SigningCredentialTrusted,
    SigningCredentialInvalid,
    SigningCredentialExpired,
    AlgorithmUnsupported,
    AssertionHashedUriMatch,
    AssertionHashedUriMismatch,
    AssertionDataHashMatch,
    AssertionDataHashMismatch,
    AssertionActionIngredientMismatch,
    AssertionBmffHashMatch,
    AssertionBmffHashMismatch,
    TimeStampTrusted,
    TimeStampMismatch,
    TimeStampMalformed,
    TimeStampOutsideValidity,
}

impl StatusCode {
    /// Whether this code represents a passing check. `is_valid` on the
    /// aggregate result is simply "every entry passes".
    fn is_success(self) -> bool {
        matches!(
            self,
            StatusCode::ClaimSignatureValidated
                | StatusCode::SigningCredentialTrusted
                | StatusCode::AssertionHashedUriMatch
                | StatusCode::AssertionDataHashMatch
                | StatusCode::AssertionBmffHashMatch
                | StatusCode::TimeStampTrusted
        )
    }
}

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub status_entries: Vec<ValidationStatus>,
    pub is_valid: bool,
}

/// Run every §4.6 check over `manifest`, resolving HashedURIs against
/// `store` and digesting `asset_bytes` where a check needs the underlying
/// media. `verifier` supplies the raw cryptographic primitive for both the
/// COSE signature and any attached timestamp token; `at` is the instant
/// against which certificate validity and timestamp freshness are judged
/// (normally "now", but fixed in tests so expiry scenarios are reproducible).
#[tracing::instrument(level = "debug", skip_all, fields(manifest = %manifest.label))]
pub fn validate_manifest(
    store: &ManifestStore,
    manifest: &Manifest,
    asset_bytes: &[u8],
    verifier: &dyn SignatureVerifier,
    at: DateTime<Utc>,
) -> Result<ValidationResult> {
    let mut status_entries = Vec::new();

    validate_hashed_uris(store, manifest, &mut status_entries)?;
    validate_data_hash_assertions(manifest, asset_bytes, &mut status_entries)?;
    validate_bmff_hash_assertions(manifest, asset_bytes, &mut status_entries)?;

    // §7: "a malformed signature ... immediately yields a
    // SigningCredentialInvalid entry and skips cryptographic verification".
    // A non-certificate byte string in x5chain (parse_signature doesn't
    // validate it as a certificate) must not abort the whole validation
    // run — it has to surface as a failing status entry like everything
    // else, never as a propagated error.
    match cert::parse_certificate(&manifest.signature.certificate) {
        Ok(cert) => {
            validate_timestamps(manifest, &cert, verifier, &mut status_entries)?;
            validate_certificate_policy(manifest, &cert, at, &mut status_entries);
            validate_cose_signature(manifest, &cert, verifier, &mut status_entries)?;
        }
        Err(e) => {
            status_entries.push(
                ValidationStatus::new(StatusCode::SigningCredentialInvalid)
                    .with_explanation(format!("signing certificate did not parse: {e}")),
            );
        }
    }

    let is_valid = !status_entries.is_empty() && status_entries.iter().all(|s| s.code.is_success());

    if is_valid {
        tracing::debug!(checks = status_entries.len(), "manifest validated successfully");
    } else {
        tracing::warn!(checks = status_entries.len(), "manifest failed validation");
    }

    Ok(ValidationResult {
        status_entries,
        is_valid,
    })
}

/// §4.6 step 1: every HashedURI the claim's `assertions` list names must
/// resolve against the store and its digest must match the resolved box.
/// Action assertions additionally carry their own `changed` HashedURIs,
/// which point at the ingredient bytes an action touched rather than at
/// another assertion in this manifest; a resolution failure there is
/// reported as `AssertionActionIngredientMismatch` rather than the generic
/// HashedURI mismatch, since it specifically means an action's story about
/// which ingredient it changed can't be confirmed.
fn validate_hashed_uris(
    store: &ManifestStore,
    manifest: &Manifest,
    status_entries: &mut Vec<ValidationStatus>,
) -> Result<()> {
    for href in &manifest.claim.assertions {
        if manifest.claim.redacts(&href.uri) {
            // A redacted assertion is deliberately removed from the store;
            // it must not resolve, and that absence is not a mismatch.
            continue;
        }
        if manifest.claim.is_signature_self_reference(&href.uri) {
            // §4.3's v2 "signature HashedURI" can never carry a real
            // content-integrity hash (see
            // Claim::is_signature_self_reference) — it's a structural
            // reference, not something to verify a digest against.
            continue;
        }

        let alg = href.algorithm.unwrap_or(manifest.claim.default_hash_algorithm);
        let digester = Sha2Digester::new(alg);

        match store.resolve(&href.uri) {
            None => status_entries.push(
                ValidationStatus::new(StatusCode::AssertionHashedUriMismatch)
                    .with_uri(href.uri.clone())
                    .with_explanation("hashed uri did not resolve against the manifest store"),
            ),
            Some(target) => {
                let matches = href.verify(target, &digester)?;
                let code = if matches {
                    StatusCode::AssertionHashedUriMatch
                } else {
                    StatusCode::AssertionHashedUriMismatch
                };
                status_entries.push(ValidationStatus::new(code).with_uri(href.uri.clone()));
            }
        }
    }

    for assertion in &manifest.assertions {
        let Assertion::Action(action) = assertion else {
            continue;
        };
        for entry in &action.actions {
            for changed in &entry.changed {
                let alg = changed.algorithm.unwrap_or(manifest.claim.default_hash_algorithm);
                let digester = Sha2Digester::new(alg);
                let resolved = store.resolve(&changed.uri).map(|target| changed.verify(target, &digester));

                match resolved {
                    Some(Ok(true)) => status_entries
                        .push(ValidationStatus::new(StatusCode::AssertionHashedUriMatch).with_uri(changed.uri.clone())),
                    _ => status_entries.push(
                        ValidationStatus::new(StatusCode::AssertionActionIngredientMismatch)
                            .with_uri(changed.uri.clone())
                            .with_explanation("action's changed ingredient did not resolve or its digest did not match"),
                    ),
                }
            }
        }
    }

    Ok(())
}

/// §4.6 step 2: recompute each `c2pa.hash.data` assertion's digest over
/// `asset_bytes`, excluding the ranges it declares, and compare.
fn validate_data_hash_assertions(
    manifest: &Manifest,
    asset_bytes: &[u8],
    status_entries: &mut Vec<ValidationStatus>,
) -> Result<()> {
    for assertion in &manifest.assertions {
        let Assertion::DataHash(data_hash) = assertion else {
            continue;
        };
        let digester = Sha2Digester::new(data_hash.alg);
        let matches = data_hash.validate(asset_bytes, &digester)?;
        let code = if matches {
            StatusCode::AssertionDataHashMatch
        } else {
            StatusCode::AssertionDataHashMismatch
        };
        status_entries.push(ValidationStatus::new(code).with_uri(data_hash_uri(manifest)));
    }
    Ok(())
}

fn data_hash_uri(manifest: &Manifest) -> String {
    format!(
        "self#jumbf=/c2pa/{}/c2pa.assertions/{}",
        manifest.label,
        crate::assertions::data_hash::LABEL
    )
}

/// §4.6 step 3: same idea as the data-hash check, but exclusions are named
/// by BMFF box path; only exclusions the assertion resolved to concrete
/// `offset`/`length` pairs (the asset handler's job, done before this
/// manifest was ever constructed) can be re-excluded here.
fn validate_bmff_hash_assertions(
    manifest: &Manifest,
    asset_bytes: &[u8],
    status_entries: &mut Vec<ValidationStatus>,
) -> Result<()> {
    for assertion in &manifest.assertions {
        let Assertion::BmffHash(bmff_hash) = assertion else {
            continue;
        };
        let exclusions: Vec<Exclusion> = bmff_hash
            .exclusions
            .iter()
            .filter_map(|range| match (range.offset, range.length) {
                (Some(offset), Some(length)) => Some(Exclusion::new(offset, length)),
                _ => None,
            })
            .collect();

        let digester = Sha2Digester::new(bmff_hash.alg);
        let recomputed = crate::hash_exclusion::digest_with_exclusions(&digester, asset_bytes, &exclusions)?;
        let code = if bmff_hash.validate_digest(&recomputed) {
            StatusCode::AssertionBmffHashMatch
        } else {
            StatusCode::AssertionBmffHashMismatch
        };
        status_entries.push(ValidationStatus::new(code).with_uri(bmff_hash.label().to_string()));
    }
    Ok(())
}

/// §4.6 step 4: verify each attached RFC 3161 token's message imprint and
/// CMS signature, and that its `genTime` falls inside the signing
/// certificate's own validity window (a timestamp claiming to predate or
/// postdate the certificate that made it can't be trusted).
///
/// §4.4: a v1 (`sigTst`) token's message imprint is the claim bytes
/// themselves; a v2 (`sigTst2`) token's imprint is the CBOR-encoded
/// COSE_Sign1 signature bytes, so which one the imprint is recomputed
/// over depends on `token.version`.
fn validate_timestamps(
    manifest: &Manifest,
    signing_cert: &X509Certificate<'_>,
    verifier: &dyn SignatureVerifier,
    status_entries: &mut Vec<ValidationStatus>,
) -> Result<()> {
    let validity = signing_cert.validity();
    let not_before = DateTime::from_timestamp(validity.not_before.timestamp(), 0);
    let not_after = DateTime::from_timestamp(validity.not_after.timestamp(), 0);

    for token in &manifest.signature.timestamp_tokens {
        let imprinted_bytes = if token.version >= 2 {
            cose::counter_signature_payload(&manifest.signature.signature)?
        } else {
            manifest.claim_cbor.clone()
        };
        let expected_digest = Sha2Digester::new(token.message_imprint_alg).digest(&imprinted_bytes);

        let tsa_public_key = token
            .tsa_certificates
            .first()
            .ok_or(())
            .and_then(|der| cert::parse_certificate(der).map_err(|_| ()))
            .and_then(|tsa_cert| public_key_bytes(&tsa_cert).map_err(|_| ()));

        let Ok(tsa_public_key) = tsa_public_key else {
            status_entries.push(
                ValidationStatus::new(StatusCode::TimeStampMalformed)
                    .with_explanation("timestamp token carries no usable TSA certificate"),
            );
            continue;
        };

        match token.verify(&expected_digest, verifier, &tsa_public_key) {
            Ok(true) => match (not_before, not_after) {
                (Some(nb), Some(na)) if token.gen_time >= nb && token.gen_time <= na => {
                    status_entries.push(ValidationStatus::new(StatusCode::TimeStampTrusted));
                }
                _ => status_entries.push(
                    ValidationStatus::new(StatusCode::TimeStampOutsideValidity).with_explanation(format!(
                        "timestamp genTime {} falls outside the signing certificate's validity window",
                        token.gen_time
                    )),
                ),
            },
            Ok(false) => status_entries.push(ValidationStatus::new(StatusCode::TimeStampMismatch)),
            Err(e) => status_entries
                .push(ValidationStatus::new(StatusCode::TimeStampMalformed).with_explanation(e.to_string())),
        }
    }

    Ok(())
}

/// §4.6 step 5: run the §4.5 certificate policy over the signing
/// certificate and every chain certificate.
fn validate_certificate_policy(
    manifest: &Manifest,
    signing_cert: &X509Certificate<'_>,
    at: DateTime<Utc>,
    status_entries: &mut Vec<ValidationStatus>,
) {
    let is_self_signed = cert::looks_self_signed(signing_cert);
    let mut violations = cert::validate_certificate(signing_cert, CertificateRole::ManifestSigning, is_self_signed, at);

    for chain_der in &manifest.signature.chain_certificates {
        match cert::parse_certificate(chain_der) {
            Ok(chain_cert) => {
                let chain_self_signed = cert::looks_self_signed(&chain_cert);
                violations.extend(cert::validate_certificate(
                    &chain_cert,
                    CertificateRole::Chain,
                    chain_self_signed,
                    at,
                ));
            }
            Err(e) => violations.push(crate::cert::PolicyViolation(format!("malformed chain certificate: {e}"))),
        }
    }

    if violations.is_empty() {
        status_entries.push(ValidationStatus::new(StatusCode::SigningCredentialTrusted));
        return;
    }

    if is_expired(signing_cert, at) {
        status_entries.push(
            ValidationStatus::new(StatusCode::SigningCredentialExpired)
                .with_explanation(format!("signing certificate is not valid at {at}")),
        );
    } else {
        let explanation = violations
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        status_entries.push(ValidationStatus::new(StatusCode::SigningCredentialInvalid).with_explanation(explanation));
    }
}

fn is_expired(cert: &X509Certificate<'_>, at: DateTime<Utc>) -> bool {
    let validity = cert.validity();
    match (
        DateTime::from_timestamp(validity.not_before.timestamp(), 0),
        DateTime::from_timestamp(validity.not_after.timestamp(), 0),
    ) {
        (Some(nb), Some(na)) => !(nb < at && at < na),
        _ => false,
    }
}

/// §4.6 step 6: verify the COSE_Sign1 signature itself, over the claim's
/// raw CBOR bytes, using the signing certificate's public key.
fn validate_cose_signature(
    manifest: &Manifest,
    signing_cert: &X509Certificate<'_>,
    verifier: &dyn SignatureVerifier,
    status_entries: &mut Vec<ValidationStatus>,
) -> Result<()> {
    let Some(cose_bytes) = manifest.signature_bytes() else {
        status_entries.push(
            ValidationStatus::new(StatusCode::ClaimSignatureMismatch)
                .with_explanation("manifest has no signature bytes to verify"),
        );
        return Ok(());
    };

    let public_key_der = match public_key_bytes(signing_cert) {
        Ok(bytes) => bytes,
        Err(_) => {
            status_entries.push(ValidationStatus::new(StatusCode::AlgorithmUnsupported));
            return Ok(());
        }
    };

    match cose::verify_cose_sign1(cose_bytes, &manifest.claim_cbor, verifier, &public_key_der) {
        Ok(true) => status_entries.push(ValidationStatus::new(StatusCode::ClaimSignatureValidated)),
        Ok(false) => status_entries.push(ValidationStatus::new(StatusCode::ClaimSignatureMismatch)),
        Err(Error::UnsupportedAlgorithm(_)) => status_entries.push(ValidationStatus::new(StatusCode::AlgorithmUnsupported)),
        Err(e) => return Err(e),
    }

    Ok(())
}

/// Extract the key material a [`SignatureVerifier`] needs out of a parsed
/// certificate's `subjectPublicKeyInfo`, in whatever form each algorithm
/// family is conventionally handed around in rather than the full SPKI DER
/// wrapper: SEC1 octets for EC keys, a reconstructed PKCS#1 `RSAPublicKey`
/// DER for RSA (x509-parser only exposes the raw modulus/exponent), and the
/// raw 32-byte key for Ed25519 (x509-parser doesn't recognize the OID and
/// surfaces it as an opaque `PublicKey::Unknown`).
fn public_key_bytes(cert: &X509Certificate<'_>) -> Result<Vec<u8>> {
    match cert.public_key().parsed() {
        Ok(PublicKey::EC(point)) => Ok(point.data().to_vec()),
        Ok(PublicKey::RSA(rsa)) => Ok(der::encode_tlv(
            der::TAG_SEQUENCE,
            &[
                der::encode_unsigned_integer(rsa.modulus),
                der::encode_unsigned_integer(rsa.exponent),
            ]
            .concat(),
        )),
        Ok(PublicKey::Unknown(bytes)) => Ok(bytes.to_vec()),
        _ => Err(Error::UnsupportedAlgorithm("certificate public key algorithm".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertions::data_hash::DataHashAssertion;
    use crate::claim::Claim;
    use crate::cose::sign::cose_sign;
    use crate::crypto::{EphemeralSigner, X509Verifier};
    use crate::hash_exclusion::Exclusion as HashExclusion;
    use crate::hashed_uri::HashedUri;
    use crate::jumbf::{self, description_box::DescriptionBox, box_type, JumbfBox, SuperBox};

    fn build_store(asset_bytes: &[u8]) -> (ManifestStore, Manifest, Vec<u8>) {
        let signer = EphemeralSigner::generate();
        let raw_verifying_key = signer.verifying_key().to_bytes().to_vec();
        let digester = Sha2Digester::new(HashAlgorithm::Sha256);

        let mut data_hash = DataHashAssertion::new(HashAlgorithm::Sha256, vec![HashExclusion::new(0, 0)]);
        data_hash.compute_hash(asset_bytes, &digester).unwrap();
        let assertion_sbox = data_hash.to_super_box().unwrap();
        let assertion_bytes = jumbf::writer::serialize(&JumbfBox::Super(assertion_sbox.clone())).unwrap();
        let assertion_digest = Digester::digest(&digester, &assertion_bytes[8..]);

        let mut claim = Claim::new(1, "image/jpeg", "xmp:iid:test", "c2pa-core-test/0.1");
        claim.add_assertion(HashedUri::new(
            "self#jumbf=/c2pa/c2pa/c2pa.assertions/c2pa.hash.data",
            Some(HashAlgorithm::Sha256),
            assertion_digest,
        ));
        claim.signature_ref = "self#jumbf=/c2pa/c2pa/c2pa.signature".to_string();
        let claim_cbor = claim.to_cbor().unwrap();

        let cose_bytes = cose_sign(&signer, &claim_cbor, None, 1200).unwrap();

        let assertion_store = SuperBox::new(DescriptionBox::new(box_type::ASSERTION_STORE_UUID).with_label("c2pa.assertions"))
            .with_child(JumbfBox::Super(assertion_sbox));

        let manifest_box = SuperBox::new(DescriptionBox::new(box_type::MANIFEST_UUID).with_label("c2pa"))
            .with_child(JumbfBox::Super(assertion_store))
            .with_child(JumbfBox::Cbor(crate::jumbf::data_box::CborBox {
                tag: None,
                raw: claim_cbor,
            }))
            .with_child(JumbfBox::Uuid(crate::jumbf::data_box::UuidBox {
                uuid: box_type::SIGNATURE_UUID,
                data: cose_bytes,
            }));

        let store_box = SuperBox::new(DescriptionBox::new(box_type::MANIFEST_STORE_UUID).with_label("c2pa"))
            .with_child(JumbfBox::Super(manifest_box));

        let bytes = jumbf::writer::serialize(&JumbfBox::Super(store_box)).unwrap();
        let root = jumbf::parse(&bytes).unwrap();
        let store = ManifestStore::read(root).unwrap();
        let manifest = store.active_manifest().unwrap().clone();
        (store, manifest, raw_verifying_key)
    }

    #[test]
    fn hashed_uri_and_data_hash_checks_pass_on_untampered_asset() {
        let asset_bytes = b"the original asset bytes".to_vec();
        let (store, manifest, _) = build_store(&asset_bytes);

        let mut status_entries = Vec::new();
        validate_hashed_uris(&store, &manifest, &mut status_entries).unwrap();
        validate_data_hash_assertions(&manifest, &asset_bytes, &mut status_entries).unwrap();

        assert!(status_entries
            .iter()
            .any(|s| s.code == StatusCode::AssertionHashedUriMatch));
        assert!(status_entries
            .iter()
            .any(|s| s.code == StatusCode::AssertionDataHashMatch));
    }

    #[test]
    fn tampered_asset_fails_data_hash_check() {
        let asset_bytes = b"the original asset bytes".to_vec();
        let (_, manifest, _) = build_store(&asset_bytes);

        let mut tampered = asset_bytes.clone();
        tampered[0] ^= 0xFF;

        let mut status_entries = Vec::new();
        validate_data_hash_assertions(&manifest, &tampered, &mut status_entries).unwrap();
        assert_eq!(status_entries[0].code, StatusCode::AssertionDataHashMismatch);
    }

    #[test]
    fn cose_signature_validates_against_the_raw_spki_bytes_directly() {
        // EphemeralSigner's certs()[0] is a bare SPKI wrapper, not a full
        // X.509 certificate, so it can't drive validate_cose_signature's
        // cert-parsing path end-to-end; exercise the same verify call it
        // makes, the way cose::validate's own tests do.
        let asset_bytes = b"asset bytes for signature test".to_vec();
        let (_, manifest, raw_verifying_key) = build_store(&asset_bytes);
        let verifier = X509Verifier;

        let valid = cose::verify_cose_sign1(
            manifest.signature_bytes().unwrap(),
            &manifest.claim_cbor,
            &verifier,
            &raw_verifying_key,
        )
        .unwrap();
        assert!(valid);
    }

    #[test]
    fn redacted_assertion_uri_is_skipped_rather_than_flagged() {
        let asset_bytes = b"the original asset bytes".to_vec();
        let (store, mut manifest, _) = build_store(&asset_bytes);

        let redacted_uri = manifest.claim.assertions[0].uri.clone();
        manifest.claim.redactions.push(redacted_uri.clone());

        let mut status_entries = Vec::new();
        validate_hashed_uris(&store, &manifest, &mut status_entries).unwrap();

        assert!(!status_entries.iter().any(|s| s.uri.as_deref() == Some(redacted_uri.as_str())));
    }

    #[test]
    fn aggregate_is_valid_requires_every_entry_to_pass() {
        let all_good = vec![
            ValidationStatus::new(StatusCode::AssertionDataHashMatch),
            ValidationStatus::new(StatusCode::ClaimSignatureValidated),
        ];
        assert!(all_good.iter().all(|s| s.code.is_success()));

        let one_bad = vec![
            ValidationStatus::new(StatusCode::AssertionDataHashMatch),
            ValidationStatus::new(StatusCode::ClaimSignatureMismatch),
        ];
        assert!(!one_bad.iter().all(|s| s.code.is_success()));
    }
}
