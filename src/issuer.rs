use std::sync::atomic::{AtomicU64, Ordering};

use der::Encode;
use der::asn1::BitString;
use der::flagset::FlagSet;
use rand_core::RngCore;
use sha1::{Digest, Sha1};
use x509_cert::certificate::CertificateInner;

use crate::cert::extensions::AuthorityKeyIdentifier;
use crate::cert::extensions::BasicConstraints;
use crate::cert::extensions::ExtendedKeyUsage;
use crate::cert::extensions::ExtendedKeyUsageOption;
use crate::cert::extensions::KeyUsage;
use crate::cert::extensions::KeyUsages;
use crate::cert::params::Validity;
use crate::cert::params::{CertificationRequestInfo, DistinguishedName, ExtensionParam};
use crate::cert::{Certificate, HashAlgorithm, SignatureAlgorithm};
use crate::csr::SigningRequest;
use crate::error::CertForgeError;
use crate::key::KeyPair;
use crate::tbs_certificate::TbsCertificate;

/// Source of certificate serial numbers.
///
/// Injected into every issuance so the engine itself carries no persistent
/// state. Uniqueness across a CA's lifetime is the allocator's contract;
/// both provided implementations are safe to share across threads.
pub trait SerialAllocator {
    /// The next serial number, as an unsigned big-endian integer.
    fn next_serial(&self) -> Result<Vec<u8>, CertForgeError>;
}

/// Draws 160-bit serial numbers from the operating system RNG.
pub struct RandomSerialAllocator;

impl SerialAllocator for RandomSerialAllocator {
    fn next_serial(&self) -> Result<Vec<u8>, CertForgeError> {
        let mut rng = rand_core::OsRng;
        let mut bytes = [0u8; 20];
        rng.try_fill_bytes(&mut bytes)
            .map_err(|e| CertForgeError::SigningFailure(format!("rng failure: {e}")))?;
        // Serial numbers are positive INTEGERs at most 20 octets long.
        bytes[0] &= 0x7f;
        if bytes[0] == 0 {
            bytes[0] = 0x01;
        }
        Ok(bytes.to_vec())
    }
}

/// Hands out consecutive serial numbers from an atomic counter.
///
/// Callers that need uniqueness across process restarts must persist the
/// counter themselves and resume with [`SequentialSerialAllocator::starting_at`].
pub struct SequentialSerialAllocator {
    next: AtomicU64,
}

impl SequentialSerialAllocator {
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }
}

impl Default for SequentialSerialAllocator {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl SerialAllocator for SequentialSerialAllocator {
    fn next_serial(&self) -> Result<Vec<u8>, CertForgeError> {
        let serial = self.next.fetch_add(1, Ordering::Relaxed);
        let bytes = serial.to_be_bytes();
        let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
        Ok(bytes[first..].to_vec())
    }
}

/// An entity capable of issuing certificates.
///
/// The provided [`Issuer::issue`] implementation is the certificate
/// engine: it checks the signing key against the issuer identity, rejects
/// degenerate validity windows, resolves extensions, canonically encodes
/// the certificate body, and signs it. Either a fully signed certificate
/// comes back or an error does; there is no partial output and no retry.
pub trait Issuer {
    /// The distinguished name certificates will carry as their issuer.
    fn issuer_name(&self) -> DistinguishedName;

    /// The signing key of the issuer.
    fn signing_key(&self) -> &KeyPair;

    /// The serial number of the issuer's own certificate, for the
    /// authority key identifier extension.
    fn issuer_serial_number(&self) -> Vec<u8>;

    /// Confirm the signing key belongs to this issuer identity.
    fn check_signing_key(&self) -> Result<(), CertForgeError> {
        Ok(())
    }

    /// Issue a certificate over the supplied request parameters.
    fn issue(
        &self,
        cert_request: &CertificationRequestInfo,
        validity: &Validity,
        hash: HashAlgorithm,
        serials: &dyn SerialAllocator,
    ) -> Result<Certificate, CertForgeError> {
        self.check_signing_key()?;
        validity.check()?;

        let signature_algo = SignatureAlgorithm::for_key(self.signing_key(), hash);
        let serial_number = serials.next_serial()?;
        let issuer_dn = self.issuer_name();

        let public_key_info = self.signing_key().as_spki()?;
        let key_id = Sha1::digest(public_key_info.subject_public_key.raw_bytes());

        let authority_key_id = AuthorityKeyIdentifier {
            key_identifier: key_id.to_vec(),
            authority_cert_issuer: issuer_dn.clone(),
            authority_cert_serial_number: self.issuer_serial_number(),
        };

        let basic_constraints = BasicConstraints {
            is_ca: cert_request.is_ca,
            max_path_length: None,
        };

        let mut extensions: Vec<ExtensionParam> = vec![
            ExtensionParam::from_extension(basic_constraints, true)?,
            ExtensionParam::from_extension(authority_key_id, false)?,
        ];

        let mut key_usage_flags: FlagSet<KeyUsages> = FlagSet::empty();

        if cert_request.is_ca {
            key_usage_flags |= KeyUsages::KeyCertSign;
            key_usage_flags |= KeyUsages::CRLSign;
        }

        for usage in &cert_request.usages {
            match usage {
                ExtendedKeyUsageOption::ClientAuth
                | ExtendedKeyUsageOption::ServerAuth
                | ExtendedKeyUsageOption::EmailProtection => {
                    key_usage_flags |= KeyUsages::KeyEncipherment;
                    key_usage_flags |= KeyUsages::DigitalSignature;
                }
                ExtendedKeyUsageOption::CodeSigning
                | ExtendedKeyUsageOption::TimeStamping
                | ExtendedKeyUsageOption::OcspSigning => {
                    key_usage_flags |= KeyUsages::DigitalSignature;
                }
            }
        }

        if !key_usage_flags.is_empty() {
            let key_usage = KeyUsage(key_usage_flags);
            extensions.push(ExtensionParam::from_extension(key_usage, true)?);
        }

        if !cert_request.usages.is_empty() {
            let extended_key_usage = ExtendedKeyUsage {
                usage: cert_request.usages.clone(),
            };
            extensions.push(ExtensionParam::from_extension(extended_key_usage, true)?);
        }

        // CA-controlled extensions are already in place; requested ones are
        // carried through unless the CA emitted the same OID itself.
        for requested in &cert_request.extensions {
            if extensions.iter().any(|ext| ext.oid == requested.oid) {
                log::debug!(
                    "dropping requested extension {} in favor of the CA-controlled one",
                    requested.oid
                );
                continue;
            }
            extensions.push(requested.clone());
        }

        let tbs_cert = TbsCertificate {
            serial_number,
            signature_algorithm: signature_algo,
            issuer: issuer_dn,
            validity: validity.clone(),
            subject: cert_request.subject.clone(),
            subject_public_key: cert_request.subject_public_key.clone(),
            extensions,
        };

        let tbs_cert_inner = tbs_cert.to_tbs_certificate_inner()?;
        let message = tbs_cert_inner
            .to_der()
            .map_err(|e| CertForgeError::EncodingError(e.to_string()))?;
        let signature = self.signing_key().sign_data(&message, hash)?;

        log::debug!(
            "issued certificate: subject CN={}, serial {:02x?}, algorithm {}",
            cert_request.subject.common_name,
            tbs_cert.serial_number,
            self.signing_key().algorithm_name(),
        );

        let cert_inner = CertificateInner {
            tbs_certificate: tbs_cert_inner,
            signature_algorithm: signature_algo.into(),
            signature: BitString::from_bytes(&signature)
                .map_err(|e| CertForgeError::EncodingError(e.to_string()))?,
        };

        Ok(Certificate { inner: cert_inner })
    }
}

/// A certificate authority: its certificate plus the matching private key.
///
/// The key is supplied for the lifetime of the identity only; it is never
/// logged, and the underlying key containers zeroize on drop.
pub struct CaIdentity {
    pub certificate: Certificate,
    key: KeyPair,
}

impl CaIdentity {
    pub fn new(certificate: Certificate, key: KeyPair) -> Self {
        Self { certificate, key }
    }

    /// Verify a signing request and issue a certificate over it.
    ///
    /// The request's proof of possession is checked even if the caller
    /// already did so; a request that fails verification never reaches the
    /// signing step.
    pub fn sign_request(
        &self,
        request: &SigningRequest,
        validity: &Validity,
        hash: HashAlgorithm,
        serials: &dyn SerialAllocator,
    ) -> Result<Certificate, CertForgeError> {
        request.verify()?;
        let cert_request = request.to_cert_info()?;
        self.issue(&cert_request, validity, hash, serials)
    }
}

impl Issuer for CaIdentity {
    fn issuer_name(&self) -> DistinguishedName {
        // Issued certificates carry the CA certificate's subject as issuer.
        self.certificate.subject()
    }

    fn signing_key(&self) -> &KeyPair {
        &self.key
    }

    fn issuer_serial_number(&self) -> Vec<u8> {
        self.certificate.serial_number_bytes().to_vec()
    }

    fn check_signing_key(&self) -> Result<(), CertForgeError> {
        let declared = &self
            .certificate
            .inner
            .tbs_certificate
            .subject_public_key_info;
        let actual = self.key.as_spki()?;
        if *declared != actual {
            return Err(CertForgeError::KeyMismatch(format!(
                "the {} signing key does not match the CA certificate's public key",
                self.key.algorithm_name()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_serials_count_up() {
        let serials = SequentialSerialAllocator::default();
        assert_eq!(serials.next_serial().unwrap(), vec![1]);
        assert_eq!(serials.next_serial().unwrap(), vec![2]);
    }

    #[test]
    fn sequential_serials_trim_leading_zeros() {
        let serials = SequentialSerialAllocator::starting_at(0x0100);
        assert_eq!(serials.next_serial().unwrap(), vec![0x01, 0x00]);
    }

    #[test]
    fn random_serials_are_positive_and_distinct() {
        let serials = RandomSerialAllocator;
        let first = serials.next_serial().unwrap();
        let second = serials.next_serial().unwrap();
        assert_eq!(first.len(), 20);
        assert!(first[0] & 0x80 == 0 && first[0] != 0);
        assert_ne!(first, second);
    }
}
