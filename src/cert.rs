//! Certificate policy validation (C7): field and extension checks a
//! signing certificate (and each certificate in its chain) must pass
//! before a COSE signature is even evaluated.

use chrono::{DateTime, Utc};
use x509_parser::certificate::X509Certificate;
use x509_parser::der_parser::oid::Oid;
use x509_parser::extensions::ParsedExtension;
use x509_parser::public_key::PublicKey;

use crate::error::{Error, Result};

/// OID 1.3.6.1.5.5.7.3.36, `id-kp-documentSigning`.
const OID_DOCUMENT_SIGNING: &[u64] = &[1, 3, 6, 1, 5, 5, 7, 3, 36];

/// The role a certificate plays in a chain, since the policy differs for
/// the leaf (manifest-signing) certificate versus intermediate/chain certs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateRole {
    ManifestSigning,
    Chain,
}

/// One certificate policy violation. Callers fold these into
/// `SigningCredentialInvalid`/`SigningCredentialExpired` validation
/// entries rather than treating them as a hard parse error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyViolation(pub String);

impl std::fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Run the full §4.5 policy against a parsed certificate. `issuer_is_self`
/// tells the checker whether this cert's issuer matches its own subject
/// (self-signed), which the caller determines by chain position rather
/// than a signature check here.
pub fn validate_certificate(
    cert: &X509Certificate<'_>,
    role: CertificateRole,
    is_self_signed: bool,
    validity_timestamp: DateTime<Utc>,
) -> Vec<PolicyViolation> {
    let mut violations = Vec::new();

    if cert.version().0 != 2 {
        violations.push(PolicyViolation("certificate is not X.509 v3".into()));
    }
    if cert.issuer_uid.is_some() {
        violations.push(PolicyViolation("issuerUniqueID must be absent".into()));
    }
    if cert.subject_uid.is_some() {
        violations.push(PolicyViolation("subjectUniqueID must be absent".into()));
    }

    let is_ca = is_ca_certificate(cert);

    if role == CertificateRole::ManifestSigning && is_self_signed {
        violations.push(PolicyViolation(
            "self-signed certificates are not permitted for manifest signing".into(),
        ));
    }
    if !is_self_signed && authority_key_identifier(cert).is_none() {
        violations.push(PolicyViolation(
            "non-self-signed certificate missing authorityKeyIdentifier".into(),
        ));
    }

    check_key_usage(cert, is_ca, &mut violations);
    if is_ca && subject_key_identifier(cert).is_none() {
        violations.push(PolicyViolation(
            "CA certificate missing subjectKeyIdentifier".into(),
        ));
    }
    if !is_ca {
        check_extended_key_usage(cert, role, &mut violations);
    }

    check_signature_algorithm_and_key(cert, &mut violations);

    let validity = cert.validity();
    let not_before = asn1_time_to_chrono(validity.not_before);
    let not_after = asn1_time_to_chrono(validity.not_after);
    match (not_before, not_after) {
        (Some(nb), Some(na)) => {
            if !(nb < validity_timestamp && validity_timestamp < na) {
                violations.push(PolicyViolation(format!(
                    "validity timestamp {validity_timestamp} falls outside [{nb}, {na})"
                )));
            }
        }
        _ => violations.push(PolicyViolation("malformed certificate validity period".into())),
    }

    violations
}

fn is_ca_certificate(cert: &X509Certificate<'_>) -> bool {
    cert.extensions()
        .iter()
        .find_map(|ext| match ext.parsed_extension() {
            ParsedExtension::BasicConstraints(bc) => Some(bc.ca),
            _ => None,
        })
        .unwrap_or(false)
}

fn authority_key_identifier<'a>(cert: &'a X509Certificate<'_>) -> Option<&'a [u8]> {
    cert.extensions().iter().find_map(|ext| match ext.parsed_extension() {
        ParsedExtension::AuthorityKeyIdentifier(aki) => aki.key_identifier.as_ref().map(|k| k.0),
        _ => None,
    })
}

fn subject_key_identifier<'a>(cert: &'a X509Certificate<'_>) -> Option<&'a [u8]> {
    cert.extensions().iter().find_map(|ext| match ext.parsed_extension() {
        ParsedExtension::SubjectKeyIdentifier(ski) => Some(ski.0),
        _ => None,
    })
}

fn check_key_usage(cert: &X509Certificate<'_>, is_ca: bool, violations: &mut Vec<PolicyViolation>) {
    let key_usage_ext = cert
        .extensions()
        .iter()
        .find(|ext| matches!(ext.parsed_extension(), ParsedExtension::KeyUsage(_)));

    match key_usage_ext {
        None => violations.push(PolicyViolation("keyUsage extension is required".into())),
        Some(ext) => {
            if !ext.critical {
                violations.push(PolicyViolation("keyUsage extension must be critical".into()));
            }
            if let ParsedExtension::KeyUsage(ku) = ext.parsed_extension() {
                if !is_ca && !ku.digital_signature() {
                    violations.push(PolicyViolation(
                        "manifest-signing certificate must set keyUsage.digitalSignature".into(),
                    ));
                }
                if ku.key_cert_sign() && !is_ca {
                    violations.push(PolicyViolation(
                        "keyUsage.keyCertSign may only appear on CA certificates".into(),
                    ));
                }
            }
        }
    }
}

fn check_extended_key_usage(
    cert: &X509Certificate<'_>,
    role: CertificateRole,
    violations: &mut Vec<PolicyViolation>,
) {
    let eku_ext = cert
        .extensions()
        .iter()
        .find_map(|ext| match ext.parsed_extension() {
            ParsedExtension::ExtendedKeyUsage(eku) => Some(eku),
            _ => None,
        });

    let Some(eku) = eku_ext else {
        violations.push(PolicyViolation(
            "non-CA certificate must carry extendedKeyUsage".into(),
        ));
        return;
    };

    if eku.any {
        violations.push(PolicyViolation(
            "extendedKeyUsage must not contain anyExtendedKeyUsage".into(),
        ));
    }

    let document_signing_oid = Oid::from(OID_DOCUMENT_SIGNING).expect("valid OID arcs");
    let has_document_signing = eku.other.iter().any(|oid| *oid == document_signing_oid);
    let has_sole_special = (eku.time_stamping || eku.ocsp_signing)
        && !(eku.email_protection || has_document_signing || eku.client_auth || eku.server_auth || eku.code_signing);

    if role == CertificateRole::ManifestSigning
        && !(eku.email_protection || has_document_signing)
    {
        violations.push(PolicyViolation(
            "manifest-signing certificate needs emailProtection or documentSigning EKU".into(),
        ));
    }

    if (eku.time_stamping || eku.ocsp_signing) && !has_sole_special {
        violations.push(PolicyViolation(
            "timeStamping/ocspSigning EKU must be the certificate's sole extended key usage".into(),
        ));
    }
}

fn check_signature_algorithm_and_key(cert: &X509Certificate<'_>, violations: &mut Vec<PolicyViolation>) {
    match cert.public_key().parsed() {
        Ok(PublicKey::RSA(rsa)) => {
            let modulus_bits = rsa.modulus.len() * 8;
            if modulus_bits < 2048 {
                violations.push(PolicyViolation(format!(
                    "RSA key is {modulus_bits} bits, below the 2048-bit minimum"
                )));
            }
        }
        Ok(PublicKey::EC(_)) => {
            // Curve family is validated against the signing algorithm at the
            // COSE layer (C6), which already knows which of P-256/384/521
            // the signature claims to use.
        }
        Ok(PublicKey::Unknown(_)) | Err(_) => {
            if !is_ed25519_key(cert) {
                violations.push(PolicyViolation(
                    "unrecognized public key algorithm".into(),
                ));
            }
        }
        _ => {}
    }
}

fn is_ed25519_key(cert: &X509Certificate<'_>) -> bool {
    const OID_ED25519: &[u64] = &[1, 3, 101, 112];
    Oid::from(OID_ED25519)
        .map(|oid| cert.public_key().algorithm.algorithm == oid)
        .unwrap_or(false)
}

fn asn1_time_to_chrono(t: x509_parser::time::ASN1Time) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(t.timestamp(), 0)
}

/// Decide self-signedness by comparing issuer and subject `Name`s plus,
/// when available, matching `authorityKeyIdentifier` against
/// `subjectKeyIdentifier` — never by attempting a signature check here
/// (that belongs to chain-building, outside this module's scope).
pub fn looks_self_signed(cert: &X509Certificate<'_>) -> bool {
    cert.issuer() == cert.subject()
}

/// Parse a DER-encoded certificate, mapping parse failures into this
/// crate's error type rather than leaking the underlying parser's.
pub fn parse_certificate(der: &[u8]) -> Result<X509Certificate<'_>> {
    let (_, cert) = x509_parser::parse_x509_certificate(der)
        .map_err(|e| Error::MalformedContent(format!("invalid X.509 certificate: {e}")))?;
    Ok(cert)
}
