use der::Encode;
use der::asn1::OctetString;
use time::OffsetDateTime;
use x509_cert::Version;
use x509_cert::certificate::TbsCertificateInner;
use x509_cert::serial_number::SerialNumber;
use x509_cert::time::Time;

use crate::cert::SignatureAlgorithm;
use crate::cert::params::{DistinguishedName, ExtensionParam, Validity};
use crate::error::CertForgeError;
use crate::key::PublicKey;

/// The "to be signed" portion of an X.509 certificate.
///
/// This is the engine's working representation of a certificate body: it is
/// assembled by the issuer, canonically encoded, signed, and only then
/// becomes part of an immutable [`crate::cert::Certificate`].
///
/// Encoding is deterministic: the same logical body always produces the
/// same bytes (DER is canonical, extensions keep their resolved insertion
/// order, and distinguished names render with a fixed attribute order), so
/// a signature computed over [`TbsCertificate::to_der`] stays verifiable.
pub struct TbsCertificate {
    /// Certificate serial number, as an unsigned big-endian integer.
    pub serial_number: Vec<u8>,
    /// Algorithm the certificate will be signed with.
    pub signature_algorithm: SignatureAlgorithm,
    /// Issuer distinguished name.
    pub issuer: DistinguishedName,
    /// Validity window.
    pub validity: Validity,
    /// Subject distinguished name.
    pub subject: DistinguishedName,
    /// Subject's public key.
    pub subject_public_key: PublicKey,
    /// Certificate extensions, in their final order.
    pub extensions: Vec<ExtensionParam>,
}

impl TbsCertificate {
    /// Convert into the `x509-cert` representation for DER encoding.
    pub fn to_tbs_certificate_inner(&self) -> Result<TbsCertificateInner, CertForgeError> {
        let algorithm_id: x509_cert::spki::AlgorithmIdentifierOwned =
            self.signature_algorithm.into();

        let extensions = self
            .extensions
            .iter()
            .map(|ext| {
                Ok(x509_cert::ext::Extension {
                    extn_id: ext.oid,
                    critical: ext.critical,
                    extn_value: OctetString::new(ext.value.clone())
                        .map_err(|e| CertForgeError::EncodingError(e.to_string()))?,
                })
            })
            .collect::<Result<Vec<_>, CertForgeError>>()?;

        let validity = x509_cert::time::Validity {
            not_before: to_x509_time(self.validity.not_before)?,
            not_after: to_x509_time(self.validity.not_after)?,
        };

        let serial_number = SerialNumber::new(self.serial_number.as_slice())
            .map_err(|e| CertForgeError::InvalidInput(format!("bad serial number: {e}")))?;

        let subject_public_key_info = self.subject_public_key.to_spki()?;

        Ok(TbsCertificateInner {
            version: Version::V3,
            serial_number,
            signature: algorithm_id,
            issuer: self.issuer.as_x509_name()?,
            validity,
            subject: self.subject.as_x509_name()?,
            subject_public_key_info,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: if extensions.is_empty() {
                None
            } else {
                Some(extensions)
            },
        })
    }

    /// Rebuild from the `x509-cert` representation.
    pub fn from_tbs_certificate_inner(
        inner: &TbsCertificateInner,
    ) -> Result<Self, CertForgeError> {
        let issuer = DistinguishedName::from_x509_name(&inner.issuer);
        let subject = DistinguishedName::from_x509_name(&inner.subject);
        let subject_public_key = PublicKey::from_x509spki(&inner.subject_public_key_info)?;

        let extensions = inner
            .extensions
            .clone()
            .unwrap_or_default()
            .iter()
            .map(|ext| ExtensionParam {
                oid: ext.extn_id,
                critical: ext.critical,
                value: ext.extn_value.as_bytes().to_vec(),
            })
            .collect::<Vec<_>>();

        // No window check here: decoding an existing certificate must not
        // reject what some other authority signed.
        let validity = Validity {
            not_before: from_x509_time(&inner.validity.not_before),
            not_after: from_x509_time(&inner.validity.not_after),
        };

        let signature_algorithm = SignatureAlgorithm::from_oid(inner.signature.oid)?;

        Ok(Self {
            serial_number: inner.serial_number.as_bytes().into(),
            signature_algorithm,
            issuer,
            validity,
            subject,
            subject_public_key,
            extensions,
        })
    }

    /// Canonical DER encoding of the certificate body.
    pub fn to_der(&self) -> Result<Vec<u8>, CertForgeError> {
        self.to_tbs_certificate_inner()?
            .to_der()
            .map_err(|e| CertForgeError::EncodingError(e.to_string()))
    }
}

/// RFC 5280 4.1.2.5: UTCTime through 2049, GeneralizedTime from 2050 on.
pub(crate) fn to_x509_time(timestamp: OffsetDateTime) -> Result<Time, CertForgeError> {
    let time = if timestamp.year() < 2050 {
        der::asn1::UtcTime::from_system_time(timestamp.into()).map(Time::UtcTime)
    } else {
        der::asn1::GeneralizedTime::from_system_time(timestamp.into()).map(Time::GeneralTime)
    };
    time.map_err(|e| CertForgeError::EncodingError(format!("unrepresentable time: {e}")))
}

pub(crate) fn from_x509_time(time: &Time) -> OffsetDateTime {
    match time {
        Time::UtcTime(ut) => OffsetDateTime::from(ut.to_system_time()),
        Time::GeneralTime(gt) => OffsetDateTime::from(gt.to_system_time()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_encoding_switches_to_generalized_in_2050() {
        // 2049-12-31T23:59:59Z and 2050-01-01T00:00:00Z
        let before = OffsetDateTime::from_unix_timestamp(2_524_607_999).unwrap();
        let after = OffsetDateTime::from_unix_timestamp(2_524_608_000).unwrap();
        assert!(matches!(to_x509_time(before).unwrap(), Time::UtcTime(_)));
        assert!(matches!(to_x509_time(after).unwrap(), Time::GeneralTime(_)));
    }

    #[test]
    fn x509_time_round_trip_is_second_exact() {
        let t = OffsetDateTime::from_unix_timestamp(1_767_225_600).unwrap();
        let encoded = to_x509_time(t).unwrap();
        assert_eq!(from_x509_time(&encoded), t);
    }
}
