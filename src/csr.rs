//! PKCS #10 certificate signing requests.
//!
//! A request arrives as untrusted bytes; [`SigningRequest::validate`]
//! parses it and checks the embedded self-signature against the request's
//! own public key, proving the requester holds the matching private key
//! before the request is honored.

use const_oid::AssociatedOid;
use der::asn1::{BitString, OctetString, SetOfVec};
use der::{Any, Decode, Encode};
use x509_cert::attr::Attribute;
use x509_cert::request::{CertReq, CertReqInfo, ExtensionReq, Version};

use crate::cert::params::{CertificationRequestInfo, DistinguishedName, ExtensionParam};
use crate::cert::{HashAlgorithm, SignatureAlgorithm};
use crate::error::CertForgeError;
use crate::key::{KeyPair, PublicKey};
use crate::pem_utils;

pub const CSR_PEM_LABEL: &str = "CERTIFICATE REQUEST";
/// Emitted by some legacy tooling; accepted on input, never produced.
const LEGACY_CSR_PEM_LABEL: &str = "NEW CERTIFICATE REQUEST";

/// A parsed certificate signing request.
///
/// Parsing checks structure only; call [`SigningRequest::verify`] (or use
/// [`SigningRequest::validate`]) before trusting the subject/key binding.
/// The request is immutable once constructed.
#[derive(Debug, Clone)]
pub struct SigningRequest {
    inner: CertReq,
}

impl SigningRequest {
    /// Parse a request from DER bytes.
    pub fn from_der(der_bytes: &[u8]) -> Result<Self, CertForgeError> {
        let inner = CertReq::from_der(der_bytes)
            .map_err(|e| CertForgeError::MalformedRequest(e.to_string()))?;
        if inner.info.subject.0.is_empty() {
            return Err(CertForgeError::MalformedRequest(
                "request subject is empty".to_string(),
            ));
        }
        Ok(Self { inner })
    }

    /// Parse a request from its PEM transport form.
    pub fn from_pem(pem_text: &str) -> Result<Self, CertForgeError> {
        let parsed =
            pem::parse(pem_text).map_err(|e| CertForgeError::MalformedRequest(e.to_string()))?;
        match parsed.tag() {
            CSR_PEM_LABEL | LEGACY_CSR_PEM_LABEL => Self::from_der(parsed.contents()),
            label => Err(CertForgeError::MalformedRequest(format!(
                "unexpected PEM label: {label}"
            ))),
        }
    }

    /// Parse and verify a request in one step.
    ///
    /// Accepts either transport form: PEM when the input looks like text
    /// armor, raw DER otherwise.
    pub fn validate(raw: &[u8]) -> Result<Self, CertForgeError> {
        let request = match std::str::from_utf8(raw) {
            Ok(text) if text.trim_start().starts_with("-----BEGIN") => Self::from_pem(text)?,
            _ => Self::from_der(raw)?,
        };
        request.verify()?;
        Ok(request)
    }

    pub fn to_der(&self) -> Result<Vec<u8>, CertForgeError> {
        self.inner
            .to_der()
            .map_err(|e| CertForgeError::EncodingError(e.to_string()))
    }

    pub fn to_pem(&self) -> Result<String, CertForgeError> {
        Ok(pem_utils::der_to_pem(&self.to_der()?, CSR_PEM_LABEL))
    }

    /// The requested subject name.
    pub fn subject(&self) -> DistinguishedName {
        DistinguishedName::from_x509_name(&self.inner.info.subject)
    }

    /// The public key the requester wants certified.
    pub fn public_key(&self) -> Result<PublicKey, CertForgeError> {
        PublicKey::from_x509spki(&self.inner.info.public_key)
            .map_err(|e| CertForgeError::MalformedRequest(e.to_string()))
    }

    /// Extensions asked for via the PKCS #9 extensionRequest attribute.
    pub fn requested_extensions(&self) -> Result<Vec<ExtensionParam>, CertForgeError> {
        let mut requested = Vec::new();
        for attr in self.inner.info.attributes.iter() {
            if attr.oid != ExtensionReq::OID {
                continue;
            }
            for value in attr.values.iter() {
                let encoded = value
                    .to_der()
                    .map_err(|e| CertForgeError::MalformedRequest(e.to_string()))?;
                let ext_req = ExtensionReq::from_der(&encoded)
                    .map_err(|e| CertForgeError::MalformedRequest(e.to_string()))?;
                for ext in ext_req.0 {
                    requested.push(ExtensionParam {
                        oid: ext.extn_id,
                        critical: ext.critical,
                        value: ext.extn_value.as_bytes().to_vec(),
                    });
                }
            }
        }
        Ok(requested)
    }

    /// Verify the request's self-signature against its own public key.
    ///
    /// Recomputes the canonical encoding of the embedded request info and
    /// checks the signature under the declared algorithm. Pure; no side
    /// effects.
    pub fn verify(&self) -> Result<(), CertForgeError> {
        let message = self
            .inner
            .info
            .to_der()
            .map_err(|e| CertForgeError::EncodingError(e.to_string()))?;
        let signature = self.inner.signature.as_bytes().ok_or_else(|| {
            CertForgeError::MalformedRequest(
                "request signature is not an octet-aligned bit string".to_string(),
            )
        })?;
        self.public_key()?
            .verify_with_oid(self.inner.algorithm.oid, &message, signature)
    }

    /// Turn a verified request into the issuer's parameter set.
    ///
    /// Requested extensions are carried through for the issuer's conflict
    /// resolution. The CA flag is always false here: a requester cannot
    /// promote itself to a CA, that decision stays with the CA operator.
    pub fn to_cert_info(&self) -> Result<CertificationRequestInfo, CertForgeError> {
        let extensions = self.requested_extensions()?;
        let (usages, _) = crate::cert::usages_and_ca_flag(&extensions);
        Ok(CertificationRequestInfo {
            subject: self.subject(),
            subject_public_key: self.public_key()?,
            usages,
            is_ca: false,
            extensions,
        })
    }

    /// Build and self-sign a request for `subject` with `key`.
    pub fn generate(
        subject: &DistinguishedName,
        key: &KeyPair,
        hash: HashAlgorithm,
    ) -> Result<Self, CertForgeError> {
        Self::generate_with_extensions(subject, key, hash, &[])
    }

    /// Build and self-sign a request carrying an extensionRequest
    /// attribute.
    pub fn generate_with_extensions(
        subject: &DistinguishedName,
        key: &KeyPair,
        hash: HashAlgorithm,
        requested: &[ExtensionParam],
    ) -> Result<Self, CertForgeError> {
        let mut attributes = SetOfVec::new();
        if !requested.is_empty() {
            let mut extensions = Vec::with_capacity(requested.len());
            for param in requested {
                extensions.push(x509_cert::ext::Extension {
                    extn_id: param.oid,
                    critical: param.critical,
                    extn_value: OctetString::new(param.value.clone())
                        .map_err(|e| CertForgeError::EncodingError(e.to_string()))?,
                });
            }
            let ext_req = ExtensionReq(extensions);
            let value = Any::from_der(
                &ext_req
                    .to_der()
                    .map_err(|e| CertForgeError::EncodingError(e.to_string()))?,
            )
            .map_err(|e| CertForgeError::EncodingError(e.to_string()))?;
            let mut values = SetOfVec::new();
            values
                .insert(value)
                .map_err(|e| CertForgeError::EncodingError(e.to_string()))?;
            attributes
                .insert(Attribute {
                    oid: ExtensionReq::OID,
                    values,
                })
                .map_err(|e| CertForgeError::EncodingError(e.to_string()))?;
        }

        let info = CertReqInfo {
            version: Version::V1,
            subject: subject.as_x509_name()?,
            public_key: key.as_spki()?,
            attributes,
        };

        let message = info
            .to_der()
            .map_err(|e| CertForgeError::EncodingError(e.to_string()))?;
        let signature_bytes = key.sign_data(&message, hash)?;
        let algorithm = SignatureAlgorithm::for_key(key, hash);

        Ok(Self {
            inner: CertReq {
                info,
                algorithm: algorithm.into(),
                signature: BitString::from_bytes(&signature_bytes)
                    .map_err(|e| CertForgeError::EncodingError(e.to_string()))?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::extensions::SubjectAltName;
    use crate::cert::params::ExtensionParam;

    fn test_subject() -> DistinguishedName {
        DistinguishedName::builder()
            .common_name("client.example.com".to_string())
            .organization("Example Corp".to_string())
            .build()
    }

    #[test]
    fn generated_request_validates() {
        let key = KeyPair::generate_ecdsa_p256();
        let request =
            SigningRequest::generate(&test_subject(), &key, HashAlgorithm::Sha256).unwrap();
        let der = request.to_der().unwrap();
        let validated = SigningRequest::validate(&der).unwrap();
        assert_eq!(validated.subject().common_name, "client.example.com");
    }

    #[test]
    fn pem_round_trip_validates() {
        let key = KeyPair::generate_ed25519();
        let request =
            SigningRequest::generate(&test_subject(), &key, HashAlgorithm::Sha256).unwrap();
        let pem_text = request.to_pem().unwrap();
        let validated = SigningRequest::validate(pem_text.as_bytes()).unwrap();
        assert_eq!(validated.to_der().unwrap(), request.to_der().unwrap());
    }

    #[test]
    fn requested_extensions_round_trip() {
        let key = KeyPair::generate_ecdsa_p256();
        let san = SubjectAltName {
            names: vec!["client.example.com".to_string()],
        };
        let params = vec![ExtensionParam::from_extension(san.clone(), false).unwrap()];
        let request = SigningRequest::generate_with_extensions(
            &test_subject(),
            &key,
            HashAlgorithm::Sha256,
            &params,
        )
        .unwrap();
        let reparsed = SigningRequest::from_der(&request.to_der().unwrap()).unwrap();
        let requested = reparsed.requested_extensions().unwrap();
        assert_eq!(requested, params);
        assert_eq!(requested[0].to_extension::<SubjectAltName>().unwrap(), san);
    }

    #[test]
    fn wrong_pem_label_is_rejected() {
        let pem_text = pem_utils::der_to_pem(b"irrelevant", "CERTIFICATE");
        let result = SigningRequest::from_pem(&pem_text);
        assert!(matches!(result, Err(CertForgeError::MalformedRequest(_))));
    }

    #[test]
    fn garbage_input_is_malformed() {
        let result = SigningRequest::validate(b"this is not a certification request");
        assert!(matches!(result, Err(CertForgeError::MalformedRequest(_))));
    }
}
