use core::str::FromStr;

use bon::Builder;
use const_oid::ObjectIdentifier;
use const_oid::db::rfc4519;
use der::Tag;
use der::Tagged;
use time::Duration;
use time::OffsetDateTime;
use x509_cert::name::{Name, RdnSequence};

use super::extensions::ToAndFromX509Extension;
pub use crate::cert::extensions::ExtendedKeyUsage;
pub use crate::cert::extensions::ExtendedKeyUsageOption;
use crate::error::CertForgeError;
use crate::key::PublicKey;

/// Parameters for building an X.509 certificate.
///
/// This is the issuer's internal parameter set: either extracted from a
/// validated signing request or assembled directly when bootstrapping a CA.
#[derive(Clone, Debug, Builder)]
pub struct CertificationRequestInfo {
    pub subject: DistinguishedName,
    pub subject_public_key: PublicKey,
    #[builder(default)]
    pub usages: Vec<ExtendedKeyUsageOption>,
    #[builder(default)]
    pub is_ca: bool,
    #[builder(default)]
    pub extensions: Vec<ExtensionParam>,
}

/// Distinguished name of a certificate subject or issuer.
///
/// Only the common attribute types are modeled (CN, C, ST, L, O, OU); a
/// common name is always present. Rendering to the X.509 form uses a fixed
/// attribute order so that the same logical name always encodes to the same
/// bytes.
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    pub common_name: String,
    pub country: Option<String>,
    pub state: Option<String>,
    pub locality: Option<String>,
    pub organization: Option<String>,
    pub organization_unit: Option<String>,
}

impl DistinguishedName {
    /// Convert to the X.509 RDN sequence form.
    ///
    /// Absent attributes are omitted; present ones always appear in the
    /// order CN, OU, O, L, ST, C of the RFC 4514 string.
    pub fn as_x509_name(&self) -> Result<Name, CertForgeError> {
        let mut parts = vec![format!("CN={}", escape_rdn_value(&self.common_name))];
        if let Some(ou) = &self.organization_unit {
            parts.push(format!("OU={}", escape_rdn_value(ou)));
        }
        if let Some(o) = &self.organization {
            parts.push(format!("O={}", escape_rdn_value(o)));
        }
        if let Some(l) = &self.locality {
            parts.push(format!("L={}", escape_rdn_value(l)));
        }
        if let Some(st) = &self.state {
            parts.push(format!("ST={}", escape_rdn_value(st)));
        }
        if let Some(c) = &self.country {
            parts.push(format!("C={}", escape_rdn_value(c)));
        }
        RdnSequence::from_str(&parts.join(","))
            .map_err(|e| CertForgeError::EncodingError(e.to_string()))
    }

    /// Extract the supported attributes from an X.509 RDN sequence.
    ///
    /// Unknown attribute types and non-string values are skipped.
    pub fn from_x509_name(x509dn: &Name) -> Self {
        let mut dn = DistinguishedName::default();
        for rdn in x509dn.0.iter() {
            for attr in rdn.0.iter() {
                let Some(value) = decode_directory_string(&attr.value) else {
                    continue;
                };
                match attr.oid {
                    rfc4519::CN => dn.common_name = value,
                    rfc4519::C => dn.country = Some(value),
                    rfc4519::ST => dn.state = Some(value),
                    rfc4519::L => dn.locality = Some(value),
                    rfc4519::O => dn.organization = Some(value),
                    rfc4519::OU => dn.organization_unit = Some(value),
                    _ => {}
                }
            }
        }
        dn
    }
}

/// RFC 4514 escaping for a single attribute value.
fn escape_rdn_value(value: &str) -> String {
    let last = value.chars().count().saturating_sub(1);
    let mut escaped = String::with_capacity(value.len());
    for (i, c) in value.chars().enumerate() {
        let needs_escape = matches!(c, ',' | '+' | '"' | '\\' | '<' | '>' | ';')
            || (i == 0 && matches!(c, ' ' | '#'))
            || (i == last && c == ' ');
        if needs_escape {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Decode a directory-string attribute value, whatever its string tag.
fn decode_directory_string(value: &der::Any) -> Option<String> {
    match value.tag() {
        Tag::PrintableString => value
            .decode_as::<der::asn1::PrintableStringRef<'_>>()
            .ok()
            .map(|s| s.to_string()),
        Tag::Utf8String => value
            .decode_as::<der::asn1::Utf8StringRef<'_>>()
            .ok()
            .map(|s| s.to_string()),
        Tag::Ia5String => value
            .decode_as::<der::asn1::Ia5StringRef<'_>>()
            .ok()
            .map(|s| s.to_string()),
        Tag::TeletexString => value
            .decode_as::<der::asn1::TeletexStringRef<'_>>()
            .ok()
            .map(|s| s.to_string()),
        _ => None,
    }
}

/// Certificate validity period.
///
/// Invariant: `not_before < not_after`. The invariant is enforced by
/// [`Validity::new`] and re-checked at issuance, so a degenerate window can
/// never reach a signed certificate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// Create a validity window, rejecting degenerate ones.
    pub fn new(
        not_before: OffsetDateTime,
        not_after: OffsetDateTime,
    ) -> Result<Self, CertForgeError> {
        let validity = Self {
            not_before,
            not_after,
        };
        validity.check()?;
        Ok(validity)
    }

    /// Creates a validity period starting now for the given number of days.
    pub fn for_days(days: i64) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            not_before: now,
            not_after: now + Duration::days(days),
        }
    }

    pub fn check(&self) -> Result<(), CertForgeError> {
        if self.not_after <= self.not_before {
            return Err(CertForgeError::InvalidInput(format!(
                "degenerate validity window: notAfter ({}) is not after notBefore ({})",
                self.not_after, self.not_before
            )));
        }
        Ok(())
    }
}

/// Represents an X.509 extension: OID, criticality, and DER-encoded value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl ExtensionParam {
    /// Encode a typed extension into its parameter form.
    pub fn from_extension<E: ToAndFromX509Extension>(
        extension: E,
        critical: bool,
    ) -> Result<Self, CertForgeError> {
        let value = extension.to_x509_extension_value()?;
        Ok(Self {
            oid: E::OID,
            critical,
            value,
        })
    }

    /// Decode the parameter back into a typed extension.
    pub fn to_extension<E: ToAndFromX509Extension>(&self) -> Result<E, CertForgeError> {
        E::from_x509_extension_value(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinguished_name_x509_round_trip() {
        let dn = DistinguishedName::builder()
            .common_name("Test CA".to_string())
            .country("US".to_string())
            .state("California".to_string())
            .locality("San Francisco".to_string())
            .organization("Example Corp".to_string())
            .organization_unit("Engineering".to_string())
            .build();
        let name = dn.as_x509_name().unwrap();
        assert_eq!(DistinguishedName::from_x509_name(&name), dn);
    }

    #[test]
    fn rdn_values_with_special_characters_are_escaped() {
        assert_eq!(escape_rdn_value("Acme, Inc."), "Acme\\, Inc.");
        assert_eq!(escape_rdn_value("#leading"), "\\#leading");
        assert_eq!(escape_rdn_value("trailing "), "trailing\\ ");
        assert_eq!(escape_rdn_value("plain"), "plain");
    }

    #[test]
    fn degenerate_validity_is_rejected() {
        let t = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        assert!(Validity::new(t, t).is_err());
        assert!(Validity::new(t, t - Duration::days(1)).is_err());
        assert!(Validity::new(t, t + Duration::days(1)).is_ok());
    }
}
