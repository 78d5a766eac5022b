//! RFC 3161 timestamping (C8): `TimeStampReq` construction and
//! `TimeStampResp`/CMS `SignedData` parsing and verification.
//!
//! The core never performs the network exchange with a time authority
//! itself — that's the `TimestampProvider`'s job, mirroring how
//! [`crate::crypto::Signer`] leaves the actual signing operation external.
//! What lives here is everything bit-exact about the protocol: building
//! the request DER, and walking the response DER far enough to validate
//! it (message imprint, `genTime`, and the TSA's own CMS signature).

use chrono::{DateTime, Utc};

use crate::crypto::{HashAlgorithm, SignatureVerifier, SigningAlg};
use crate::der::{self, Node};
use crate::error::{Error, Result};

const OID_SIGNED_DATA: &[u64] = &[1, 2, 840, 113_549, 1, 7, 2];

fn hash_algorithm_oid(alg: HashAlgorithm) -> &'static [u64] {
    match alg {
        HashAlgorithm::Sha256 => &[2, 16, 840, 1, 101, 3, 4, 2, 1],
        HashAlgorithm::Sha384 => &[2, 16, 840, 1, 101, 3, 4, 2, 2],
        HashAlgorithm::Sha512 => &[2, 16, 840, 1, 101, 3, 4, 2, 3],
    }
}

/// Supplies RFC 3161 timestamp tokens for a digest the caller computed.
/// A concrete implementation sends [`build_request`]'s output to a TSA
/// over HTTP and returns the raw `TimeStampResp` DER it gets back.
pub trait TimestampProvider: Send + Sync {
    fn time_stamp(&self, message_digest: &[u8], hash_alg: HashAlgorithm) -> Result<Vec<u8>>;
}

/// Build a DER-encoded `TimeStampReq`:
/// ```text
/// TimeStampReq ::= SEQUENCE {
///     version          INTEGER { v1(1) },
///     messageImprint   MessageImprint,
///     reqPolicy        TSAPolicyId OPTIONAL,
///     nonce            INTEGER OPTIONAL,
///     certReq          BOOLEAN DEFAULT FALSE }
/// MessageImprint ::= SEQUENCE {
///     hashAlgorithm    AlgorithmIdentifier,
///     hashedMessage    OCTET STRING }
/// ```
pub fn build_request(message_digest: &[u8], hash_alg: HashAlgorithm, nonce: Option<u64>) -> Vec<u8> {
    let alg_id = der::encode_tlv(
        der::TAG_SEQUENCE,
        &[
            der::encode_oid(hash_algorithm_oid(hash_alg)),
            der::encode_tlv(0x05, &[]), // NULL parameters
        ]
        .concat(),
    );
    let message_imprint = der::encode_tlv(
        der::TAG_SEQUENCE,
        &[alg_id, der::encode_tlv(der::TAG_OCTET_STRING, message_digest)].concat(),
    );

    let mut body = vec![
        der::encode_unsigned_integer(&[1]),
        message_imprint,
    ];
    if let Some(n) = nonce {
        body.push(der::encode_unsigned_integer(&n.to_be_bytes()));
    }
    body.push(der::encode_tlv(der::TAG_BOOLEAN, &[0xFF])); // certReq: true

    der::encode_tlv(der::TAG_SEQUENCE, &body.concat())
}

/// A parsed RFC 3161 timestamp token: the `ContentInfo`/`SignedData`
/// envelope a TSA returns, holding a `TSTInfo` as its signed content.
#[derive(Debug, Clone)]
pub struct TimeStampToken {
    /// 1 if this token was found under `sigTst` (message imprint over the
    /// claim bytes), 2 if under `sigTst2` (message imprint over the
    /// CBOR-encoded signature bytes). Set by the COSE unprotected-header
    /// reader ([`crate::cose::validate::parse_signature`]), since the
    /// label the token was stored under — not anything inside the
    /// `TimeStampResp` itself — is what fixes its imprint semantics.
    pub version: u8,
    pub message_imprint_alg: HashAlgorithm,
    pub message_imprint_digest: Vec<u8>,
    pub gen_time: DateTime<Utc>,
    signed_attrs: Option<Vec<u8>>,
    tbs: Vec<u8>,
    signature: Vec<u8>,
    signing_alg: SigningAlg,
    pub tsa_certificates: Vec<Vec<u8>>,
}

/// Parse a complete `TimeStampResp` and extract its embedded token.
/// `TimeStampResp ::= SEQUENCE { status PKIStatusInfo, timeStampToken ContentInfo OPTIONAL }`.
pub fn parse_response(resp_der: &[u8]) -> Result<TimeStampToken> {
    let (resp, _) = der::parse_one(resp_der)?;
    let fields = der::parse_all(resp.value)?;
    let content_info = fields
        .get(1)
        .ok_or_else(|| Error::TimestampProvider("TimeStampResp carries no timeStampToken".into()))?;
    parse_content_info(content_info)
}

fn parse_content_info(content_info: &Node<'_>) -> Result<TimeStampToken> {
    let fields = der::parse_all(content_info.value)?;
    let content_type = fields
        .first()
        .ok_or_else(|| Error::TimestampProvider("malformed ContentInfo".into()))?;
    if content_type.value != encode_oid_value(OID_SIGNED_DATA) {
        return Err(Error::TimestampProvider(
            "timeStampToken is not a CMS SignedData".into(),
        ));
    }
    let explicit_wrapper = fields
        .get(1)
        .ok_or_else(|| Error::TimestampProvider("ContentInfo missing [0] content".into()))?;
    let (signed_data, _) = der::parse_one(explicit_wrapper.value)?;
    parse_signed_data(&signed_data)
}

fn encode_oid_value(arcs: &[u64]) -> Vec<u8> {
    let encoded = der::encode_oid(arcs);
    der::parse_one(&encoded).unwrap().0.value.to_vec()
}

fn parse_signed_data(signed_data: &Node<'_>) -> Result<TimeStampToken> {
    let fields = der::parse_all(signed_data.value)?;
    // version INTEGER, digestAlgorithms SET, encapContentInfo SEQUENCE, ...
    let encap_content_info = fields
        .get(2)
        .ok_or_else(|| Error::TimestampProvider("SignedData missing encapContentInfo".into()))?;
    let tst_info_der = extract_e_content(encap_content_info)?;
    let tst_info = parse_tst_info(&tst_info_der)?;

    // Skip optional [0] certificates / [1] crls to find the signerInfos SET (tag 0x31).
    let signer_info = fields
        .iter()
        .skip(3)
        .find(|n| n.tag == 0x31)
        .ok_or_else(|| Error::TimestampProvider("SignedData missing signerInfos".into()))?;
    let tsa_certificates = fields
        .iter()
        .skip(3)
        .find(|n| n.tag == 0xA0)
        .map(|certs| der::parse_all(certs.value))
        .transpose()?
        .unwrap_or_default()
        .into_iter()
        .map(|c| rewrap(c.tag, c.value))
        .collect();

    let (first_signer, _) = der::parse_one(signer_info.value)?;
    parse_signer_info(&first_signer, tst_info, tsa_certificates)
}

fn rewrap(tag: u8, value: &[u8]) -> Vec<u8> {
    der::encode_tlv(tag, value)
}

fn extract_e_content(encap_content_info: &Node<'_>) -> Result<Vec<u8>> {
    let fields = der::parse_all(encap_content_info.value)?;
    let e_content_wrapper = fields
        .get(1)
        .ok_or_else(|| Error::TimestampProvider("encapContentInfo missing eContent".into()))?;
    let (octet_string, _) = der::parse_one(e_content_wrapper.value)?;
    Ok(octet_string.value.to_vec())
}

struct TstInfo {
    message_imprint_alg: HashAlgorithm,
    message_imprint_digest: Vec<u8>,
    gen_time: DateTime<Utc>,
}

/// `TSTInfo ::= SEQUENCE { version, policy, messageImprint, serialNumber,
/// genTime GeneralizedTime, ... }`.
fn parse_tst_info(der_bytes: &[u8]) -> Result<TstInfo> {
    let fields = der::parse_all(der_bytes)?;
    let message_imprint = fields
        .get(2)
        .ok_or_else(|| Error::TimestampProvider("TSTInfo missing messageImprint".into()))?;
    let imprint_fields = der::parse_all(message_imprint.value)?;
    let alg_id = imprint_fields
        .first()
        .ok_or_else(|| Error::TimestampProvider("messageImprint missing hashAlgorithm".into()))?;
    let alg_oid = der::parse_all(alg_id.value)?
        .into_iter()
        .next()
        .ok_or_else(|| Error::TimestampProvider("malformed AlgorithmIdentifier".into()))?;
    let message_imprint_alg = oid_to_hash_algorithm(alg_oid.value)?;
    let message_imprint_digest = imprint_fields
        .get(1)
        .ok_or_else(|| Error::TimestampProvider("messageImprint missing hashedMessage".into()))?
        .value
        .to_vec();

    let gen_time_node = fields
        .get(4)
        .ok_or_else(|| Error::TimestampProvider("TSTInfo missing genTime".into()))?;
    let gen_time = parse_generalized_time(gen_time_node.value)?;

    Ok(TstInfo {
        message_imprint_alg,
        message_imprint_digest,
        gen_time,
    })
}

fn oid_to_hash_algorithm(oid_bytes: &[u8]) -> Result<HashAlgorithm> {
    for alg in [HashAlgorithm::Sha256, HashAlgorithm::Sha384, HashAlgorithm::Sha512] {
        if encode_oid_value(hash_algorithm_oid(alg)) == oid_bytes {
            return Ok(alg);
        }
    }
    Err(Error::UnsupportedAlgorithm(
        "timestamp messageImprint hash algorithm".into(),
    ))
}

fn parse_generalized_time(value: &[u8]) -> Result<DateTime<Utc>> {
    let s = std::str::from_utf8(value)
        .map_err(|_| Error::TimestampProvider("genTime is not valid UTF-8".into()))?;
    let naive = chrono::NaiveDateTime::parse_from_str(s.trim_end_matches('Z'), "%Y%m%d%H%M%S")
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(s.trim_end_matches('Z'), "%Y%m%d%H%M%S%.f"))
        .map_err(|e| Error::TimestampProvider(format!("malformed genTime: {e}")))?;
    Ok(DateTime::from_naive_utc_and_offset(naive, Utc))
}

/// `SignerInfo ::= SEQUENCE { version, sid, digestAlgorithm,
/// signedAttrs [0] IMPLICIT SET OF Attribute OPTIONAL, signatureAlgorithm,
/// signature OCTET STRING, unsignedAttrs [1] IMPLICIT OPTIONAL }`.
fn parse_signer_info(
    signer_info: &Node<'_>,
    tst_info: TstInfo,
    tsa_certificates: Vec<Vec<u8>>,
) -> Result<TimeStampToken> {
    let fields = der::parse_all(signer_info.value)?;
    let mut idx = 3; // version, sid, digestAlgorithm
    let mut signed_attrs = None;
    if let Some(node) = fields.get(idx) {
        if node.tag == 0xA0 {
            signed_attrs = Some(der::encode_tlv(0x31, node.value));
            idx += 1;
        }
    }
    let signature_algorithm = fields
        .get(idx)
        .ok_or_else(|| Error::TimestampProvider("SignerInfo missing signatureAlgorithm".into()))?;
    idx += 1;
    let signature = fields
        .get(idx)
        .ok_or_else(|| Error::TimestampProvider("SignerInfo missing signature".into()))?;

    let signing_alg = signature_algorithm_to_signing_alg(signature_algorithm)?;
    let tbs = signed_attrs
        .clone()
        .unwrap_or_else(|| tst_info.message_imprint_digest.clone());

    Ok(TimeStampToken {
        // Overwritten by `with_version` once the caller knows which
        // unprotected-header label (`sigTst` vs `sigTst2`) this came from.
        version: 2,
        message_imprint_alg: tst_info.message_imprint_alg,
        message_imprint_digest: tst_info.message_imprint_digest,
        gen_time: tst_info.gen_time,
        signed_attrs,
        tbs,
        signature: signature.value.to_vec(),
        signing_alg,
        tsa_certificates,
    })
}

fn signature_algorithm_to_signing_alg(alg_id: &Node<'_>) -> Result<SigningAlg> {
    let fields = der::parse_all(alg_id.value)?;
    let oid = fields
        .first()
        .ok_or_else(|| Error::TimestampProvider("malformed signatureAlgorithm".into()))?;
    // ecdsa-with-SHA256/384/512, sha256WithRSAEncryption, id-RSASSA-PSS, id-Ed25519.
    const ECDSA_SHA256: [u64; 7] = [1, 2, 840, 10045, 4, 3, 2];
    const ECDSA_SHA384: [u64; 7] = [1, 2, 840, 10045, 4, 3, 3];
    const ECDSA_SHA512: [u64; 7] = [1, 2, 840, 10045, 4, 3, 4];
    const RSA_SHA256: [u64; 7] = [1, 2, 840, 113_549, 1, 1, 11];
    const ED25519: [u64; 4] = [1, 3, 101, 112];

    if oid.value == encode_oid_value(&ECDSA_SHA256) {
        Ok(SigningAlg::Es256)
    } else if oid.value == encode_oid_value(&ECDSA_SHA384) {
        Ok(SigningAlg::Es384)
    } else if oid.value == encode_oid_value(&ECDSA_SHA512) {
        Ok(SigningAlg::Es512)
    } else if oid.value == encode_oid_value(&RSA_SHA256) {
        Ok(SigningAlg::Ps256)
    } else if oid.value == encode_oid_value(&ED25519) {
        Ok(SigningAlg::Ed25519)
    } else {
        Err(Error::UnsupportedAlgorithm(
            "timestamp SignerInfo signatureAlgorithm".into(),
        ))
    }
}

impl TimeStampToken {
    /// Verify the message imprint matches an independently recomputed
    /// digest, and that the TSA's own CMS signature is valid over the
    /// (possibly re-tagged) signed attributes.
    pub fn verify(&self, expected_digest: &[u8], verifier: &dyn SignatureVerifier, tsa_public_key_der: &[u8]) -> Result<bool> {
        if self.message_imprint_digest != expected_digest {
            return Ok(false);
        }
        verifier.verify(self.signing_alg, tsa_public_key_der, &self.tbs, &self.signature)
    }

    pub fn has_signed_attrs(&self) -> bool {
        self.signed_attrs.is_some()
    }

    /// Record which unprotected-header label this token was read from.
    pub(crate) fn with_version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }
}
