pub mod extensions;
pub mod params;

use const_oid::ObjectIdentifier;
use const_oid::db::{rfc5912, rfc8410};
use der::{Decode, DecodePem, Encode, EncodePem};
use extensions::{
    BasicConstraints, ExtendedKeyUsage, ExtendedKeyUsageOption, ToAndFromX509Extension,
};
use params::{CertificationRequestInfo, DistinguishedName, ExtensionParam, Validity};
use x509_cert::certificate::CertificateInner;

use crate::error::CertForgeError;
use crate::issuer::{Issuer, SequentialSerialAllocator};
use crate::key::{KeyPair, PublicKey};
use crate::tbs_certificate::TbsCertificate;

pub type Result<T> = std::result::Result<T, CertForgeError>;

/// Digest used when computing a certificate signature.
///
/// Only RSA keys honor the full choice; ECDSA keys use the digest matched
/// to their curve and Ed25519 has a fixed internal digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

/// Supported certificate signature algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// SHA-256 with RSA encryption (PKCS #1 v1.5).
    Sha256WithRSA,
    /// SHA-384 with RSA encryption (PKCS #1 v1.5).
    Sha384WithRSA,
    /// SHA-512 with RSA encryption (PKCS #1 v1.5).
    Sha512WithRSA,
    /// ECDSA over P-256 with SHA-256.
    Sha256WithECDSA,
    /// ECDSA over P-384 with SHA-384.
    Sha384WithECDSA,
    /// ECDSA with SHA-512 (accepted when decoding, never produced).
    Sha512WithECDSA,
    /// Ed25519.
    Ed25519,
}

impl SignatureAlgorithm {
    /// The algorithm a given key pair signs with under the requested
    /// digest.
    pub fn for_key(key: &KeyPair, hash: HashAlgorithm) -> Self {
        match key {
            KeyPair::Rsa { .. } => match hash {
                HashAlgorithm::Sha256 => SignatureAlgorithm::Sha256WithRSA,
                HashAlgorithm::Sha384 => SignatureAlgorithm::Sha384WithRSA,
                HashAlgorithm::Sha512 => SignatureAlgorithm::Sha512WithRSA,
            },
            KeyPair::EcdsaP256 { .. } => SignatureAlgorithm::Sha256WithECDSA,
            KeyPair::EcdsaP384 { .. } => SignatureAlgorithm::Sha384WithECDSA,
            KeyPair::Ed25519 { .. } => SignatureAlgorithm::Ed25519,
        }
    }

    pub fn from_oid(oid: ObjectIdentifier) -> Result<Self> {
        match oid {
            rfc5912::SHA_256_WITH_RSA_ENCRYPTION => Ok(SignatureAlgorithm::Sha256WithRSA),
            rfc5912::SHA_384_WITH_RSA_ENCRYPTION => Ok(SignatureAlgorithm::Sha384WithRSA),
            rfc5912::SHA_512_WITH_RSA_ENCRYPTION => Ok(SignatureAlgorithm::Sha512WithRSA),
            rfc5912::ECDSA_WITH_SHA_256 => Ok(SignatureAlgorithm::Sha256WithECDSA),
            rfc5912::ECDSA_WITH_SHA_384 => Ok(SignatureAlgorithm::Sha384WithECDSA),
            rfc5912::ECDSA_WITH_SHA_512 => Ok(SignatureAlgorithm::Sha512WithECDSA),
            rfc8410::ID_ED_25519 => Ok(SignatureAlgorithm::Ed25519),
            other => Err(CertForgeError::DecodingError(format!(
                "unsupported signature algorithm: {other}"
            ))),
        }
    }

    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            SignatureAlgorithm::Sha256WithRSA => rfc5912::SHA_256_WITH_RSA_ENCRYPTION,
            SignatureAlgorithm::Sha384WithRSA => rfc5912::SHA_384_WITH_RSA_ENCRYPTION,
            SignatureAlgorithm::Sha512WithRSA => rfc5912::SHA_512_WITH_RSA_ENCRYPTION,
            SignatureAlgorithm::Sha256WithECDSA => rfc5912::ECDSA_WITH_SHA_256,
            SignatureAlgorithm::Sha384WithECDSA => rfc5912::ECDSA_WITH_SHA_384,
            SignatureAlgorithm::Sha512WithECDSA => rfc5912::ECDSA_WITH_SHA_512,
            SignatureAlgorithm::Ed25519 => rfc8410::ID_ED_25519,
        }
    }
}

impl From<SignatureAlgorithm> for x509_cert::spki::AlgorithmIdentifierOwned {
    fn from(value: SignatureAlgorithm) -> Self {
        // RFC 5280: the RSA signature algorithms carry an explicit NULL
        // parameter; the ECDSA and Ed25519 ones omit parameters entirely.
        let parameters = match value {
            SignatureAlgorithm::Sha256WithRSA
            | SignatureAlgorithm::Sha384WithRSA
            | SignatureAlgorithm::Sha512WithRSA => Some(der::Any::null()),
            _ => None,
        };
        x509_cert::spki::AlgorithmIdentifierOwned {
            oid: value.oid(),
            parameters,
        }
    }
}

/// An issued X.509 certificate.
///
/// Immutable once created: the only constructors are decoding a transport
/// form and the issuance path, both of which produce a fully signed
/// certificate or nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    /// The inner representation of the certificate.
    pub inner: CertificateInner,
}

impl Certificate {
    /// Encodes the certificate into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.inner
            .to_der()
            .map_err(|e| CertForgeError::EncodingError(e.to_string()))
    }

    /// Encodes the certificate into PEM format.
    pub fn to_pem(&self) -> Result<String> {
        self.inner
            .to_pem(pkcs8::LineEnding::LF)
            .map_err(|e| CertForgeError::EncodingError(e.to_string()))
    }

    /// Decodes a certificate from DER bytes.
    pub fn from_der(der_bytes: &[u8]) -> Result<Self> {
        let inner = CertificateInner::from_der(der_bytes)
            .map_err(|e| CertForgeError::MalformedCertificate(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Decodes a certificate from its PEM transport form.
    pub fn from_pem(pem_text: &str) -> Result<Self> {
        let inner = CertificateInner::from_pem(pem_text.as_bytes())
            .map_err(|e| CertForgeError::MalformedCertificate(e.to_string()))?;
        Ok(Self { inner })
    }

    /// The subject distinguished name.
    pub fn subject(&self) -> DistinguishedName {
        DistinguishedName::from_x509_name(&self.inner.tbs_certificate.subject)
    }

    /// The issuer distinguished name.
    pub fn issuer(&self) -> DistinguishedName {
        DistinguishedName::from_x509_name(&self.inner.tbs_certificate.issuer)
    }

    /// The serial number as unsigned big-endian bytes.
    pub fn serial_number_bytes(&self) -> &[u8] {
        self.inner.tbs_certificate.serial_number.as_bytes()
    }

    /// The certified public key.
    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_x509spki(&self.inner.tbs_certificate.subject_public_key_info)
    }

    /// Rebuild the engine's view of the certificate body.
    pub fn to_tbs(&self) -> Result<TbsCertificate> {
        TbsCertificate::from_tbs_certificate_inner(&self.inner.tbs_certificate)
    }

    /// The validity window.
    pub fn validity(&self) -> Validity {
        Validity {
            not_before: crate::tbs_certificate::from_x509_time(
                &self.inner.tbs_certificate.validity.not_before,
            ),
            not_after: crate::tbs_certificate::from_x509_time(
                &self.inner.tbs_certificate.validity.not_after,
            ),
        }
    }

    /// Verify this certificate's signature under an issuer public key.
    ///
    /// Recomputes the canonical encoding of the certificate body and checks
    /// the signature bits against it.
    pub fn verify_signed_by(&self, issuer_key: &PublicKey) -> Result<()> {
        let message = self
            .inner
            .tbs_certificate
            .to_der()
            .map_err(|e| CertForgeError::EncodingError(e.to_string()))?;
        let signature = self.inner.signature.as_bytes().ok_or_else(|| {
            CertForgeError::MalformedCertificate(
                "certificate signature is not an octet-aligned bit string".to_string(),
            )
        })?;
        issuer_key.verify_with_oid(self.inner.signature_algorithm.oid, &message, signature)
    }

    /// Extracts certificate information into a [`CertificationRequestInfo`].
    pub fn to_cert_info(&self) -> Result<CertificationRequestInfo> {
        let tbs = self.to_tbs()?;
        let (usages, is_ca) = usages_and_ca_flag(&tbs.extensions);

        Ok(CertificationRequestInfo {
            subject: tbs.subject,
            subject_public_key: tbs.subject_public_key,
            usages,
            is_ca,
            extensions: tbs.extensions,
        })
    }

    /// Creates a new self-signed certificate.
    ///
    /// Used to bootstrap a CA: the issuer is the subject, the serial is 1,
    /// and the signature digest is SHA-256 (where the key honors a choice).
    pub fn new_self_signed(
        cert_info: &CertificationRequestInfo,
        key: &KeyPair,
        validity: &Validity,
    ) -> Result<Self> {
        let self_issuer = SelfIssuer {
            name: cert_info.subject.clone(),
            key,
        };

        self_issuer.issue(
            cert_info,
            validity,
            HashAlgorithm::Sha256,
            &SequentialSerialAllocator::default(),
        )
    }
}

/// Derive the extended key usages and the CA flag from an extension list.
pub(crate) fn usages_and_ca_flag(
    extension_list: &[ExtensionParam],
) -> (Vec<ExtendedKeyUsageOption>, bool) {
    let usages = extension_list
        .iter()
        .find(|ext| ext.oid == ExtendedKeyUsage::OID)
        .and_then(|ext| ext.to_extension::<ExtendedKeyUsage>().ok())
        .map(|eku| eku.usage)
        .unwrap_or_default();

    let is_ca = extension_list
        .iter()
        .find(|ext| ext.oid == BasicConstraints::OID)
        .and_then(|ext| ext.to_extension::<BasicConstraints>().ok())
        .map(|bc| bc.is_ca)
        .unwrap_or(false);

    (usages, is_ca)
}

// Helper struct for self-signed certificates
struct SelfIssuer<'a> {
    name: DistinguishedName,
    key: &'a KeyPair,
}

impl Issuer for SelfIssuer<'_> {
    fn issuer_name(&self) -> DistinguishedName {
        self.name.clone()
    }

    fn signing_key(&self) -> &KeyPair {
        self.key
    }

    fn issuer_serial_number(&self) -> Vec<u8> {
        vec![1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_algorithm_oid_round_trip() {
        for algorithm in [
            SignatureAlgorithm::Sha256WithRSA,
            SignatureAlgorithm::Sha384WithRSA,
            SignatureAlgorithm::Sha512WithRSA,
            SignatureAlgorithm::Sha256WithECDSA,
            SignatureAlgorithm::Sha384WithECDSA,
            SignatureAlgorithm::Sha512WithECDSA,
            SignatureAlgorithm::Ed25519,
        ] {
            assert_eq!(SignatureAlgorithm::from_oid(algorithm.oid()).unwrap(), algorithm);
        }
    }

    #[test]
    fn rsa_algorithm_identifiers_carry_null_parameters() {
        let id: x509_cert::spki::AlgorithmIdentifierOwned =
            SignatureAlgorithm::Sha256WithRSA.into();
        assert!(id.parameters.is_some());
        let id: x509_cert::spki::AlgorithmIdentifierOwned =
            SignatureAlgorithm::Sha256WithECDSA.into();
        assert!(id.parameters.is_none());
    }
}
