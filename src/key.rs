use const_oid::ObjectIdentifier;
use const_oid::db::{rfc5912, rfc8410};
use der::asn1::BitString;
use ed25519_dalek::{SigningKey as Ed25519SigningKey, VerifyingKey as Ed25519VerifyingKey};
use p256::ecdsa::{SigningKey as P256SigningKey, VerifyingKey as P256VerifyingKey};
use p384::ecdsa::{SigningKey as P384SigningKey, VerifyingKey as P384VerifyingKey};
use pkcs8::DecodePrivateKey;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Sha256, Sha384, Sha512};
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::cert::HashAlgorithm;
use crate::error::CertForgeError;

/// Supported key types for certificate operations.
///
/// Private key containers from the underlying RustCrypto crates zeroize
/// their secret material on drop, so a `KeyPair` can be scoped to a single
/// issuance call without further cleanup.
pub enum KeyPair {
    Rsa {
        private: Box<RsaPrivateKey>,
        public: RsaPublicKey,
    },
    EcdsaP256 {
        signing_key: P256SigningKey,
        verifying_key: P256VerifyingKey,
    },
    EcdsaP384 {
        signing_key: P384SigningKey,
        verifying_key: P384VerifyingKey,
    },
    Ed25519 {
        signing_key: Ed25519SigningKey,
    },
}

impl KeyPair {
    /// Generate an RSA key pair with the specified number of bits.
    pub fn generate_rsa(bits: usize) -> Result<Self, CertForgeError> {
        let mut rng = rand_core::OsRng;
        let private = RsaPrivateKey::new(&mut rng, bits)
            .map_err(|e| CertForgeError::KeyGenerationError(e.to_string()))?;
        let public = RsaPublicKey::from(&private);
        Ok(KeyPair::Rsa {
            private: Box::new(private),
            public,
        })
    }

    /// Generate an ECDSA P-256 key pair.
    pub fn generate_ecdsa_p256() -> Self {
        let mut rng = rand_core::OsRng;
        let signing_key = P256SigningKey::random(&mut rng);
        let verifying_key = signing_key.verifying_key().to_owned();
        KeyPair::EcdsaP256 {
            signing_key,
            verifying_key,
        }
    }

    /// Generate an ECDSA P-384 key pair.
    pub fn generate_ecdsa_p384() -> Self {
        let mut rng = rand_core::OsRng;
        let signing_key = P384SigningKey::random(&mut rng);
        let verifying_key = signing_key.verifying_key().to_owned();
        KeyPair::EcdsaP384 {
            signing_key,
            verifying_key,
        }
    }

    /// Generate an Ed25519 key pair.
    pub fn generate_ed25519() -> Self {
        let mut rng = rand_core::OsRng;
        let signing_key: Ed25519SigningKey = Ed25519SigningKey::generate(&mut rng);
        KeyPair::Ed25519 { signing_key }
    }

    /// Import a private key from an unencrypted PKCS #8 PEM document.
    ///
    /// The key type is detected by attempting each supported algorithm in
    /// turn.
    pub fn from_pkcs8_pem(pem_text: &str) -> Result<Self, CertForgeError> {
        if let Ok(private) = RsaPrivateKey::from_pkcs8_pem(pem_text) {
            let public = RsaPublicKey::from(&private);
            return Ok(KeyPair::Rsa {
                private: Box::new(private),
                public,
            });
        }
        if let Ok(signing_key) = P256SigningKey::from_pkcs8_pem(pem_text) {
            let verifying_key = signing_key.verifying_key().to_owned();
            return Ok(KeyPair::EcdsaP256 {
                signing_key,
                verifying_key,
            });
        }
        if let Ok(signing_key) = P384SigningKey::from_pkcs8_pem(pem_text) {
            let verifying_key = signing_key.verifying_key().to_owned();
            return Ok(KeyPair::EcdsaP384 {
                signing_key,
                verifying_key,
            });
        }
        if let Ok(signing_key) = Ed25519SigningKey::from_pkcs8_pem(pem_text) {
            return Ok(KeyPair::Ed25519 { signing_key });
        }
        Err(CertForgeError::DecodingError(
            "not a supported PKCS #8 private key (RSA, P-256, P-384, Ed25519)".to_string(),
        ))
    }

    /// Import a private key from a passphrase-encrypted PKCS #8 PEM document.
    pub fn from_pkcs8_encrypted_pem(
        pem_text: &str,
        passphrase: &str,
    ) -> Result<Self, CertForgeError> {
        if let Ok(private) = RsaPrivateKey::from_pkcs8_encrypted_pem(pem_text, passphrase) {
            let public = RsaPublicKey::from(&private);
            return Ok(KeyPair::Rsa {
                private: Box::new(private),
                public,
            });
        }
        if let Ok(signing_key) = P256SigningKey::from_pkcs8_encrypted_pem(pem_text, passphrase) {
            let verifying_key = signing_key.verifying_key().to_owned();
            return Ok(KeyPair::EcdsaP256 {
                signing_key,
                verifying_key,
            });
        }
        if let Ok(signing_key) = P384SigningKey::from_pkcs8_encrypted_pem(pem_text, passphrase) {
            let verifying_key = signing_key.verifying_key().to_owned();
            return Ok(KeyPair::EcdsaP384 {
                signing_key,
                verifying_key,
            });
        }
        if let Ok(signing_key) = Ed25519SigningKey::from_pkcs8_encrypted_pem(pem_text, passphrase) {
            return Ok(KeyPair::Ed25519 { signing_key });
        }
        Err(CertForgeError::DecodingError(
            "could not decrypt the PKCS #8 private key (wrong passphrase or unsupported key type)"
                .to_string(),
        ))
    }

    /// Sign `data` with this key.
    ///
    /// RSA keys sign PKCS #1 v1.5 with the requested digest. ECDSA keys use
    /// the digest matched to their curve (SHA-256 for P-256, SHA-384 for
    /// P-384) and produce ASN.1 DER signatures, which is the form X.509
    /// carries. Ed25519 has a fixed internal digest; `hash` is ignored.
    pub fn sign_data(&self, data: &[u8], hash: HashAlgorithm) -> Result<Vec<u8>, CertForgeError> {
        match self {
            KeyPair::Rsa { private, .. } => {
                let result = match hash {
                    HashAlgorithm::Sha256 => {
                        rsa::pkcs1v15::SigningKey::<Sha256>::new(private.as_ref().clone())
                            .try_sign(data)
                            .map(|s| s.to_vec())
                    }
                    HashAlgorithm::Sha384 => {
                        rsa::pkcs1v15::SigningKey::<Sha384>::new(private.as_ref().clone())
                            .try_sign(data)
                            .map(|s| s.to_vec())
                    }
                    HashAlgorithm::Sha512 => {
                        rsa::pkcs1v15::SigningKey::<Sha512>::new(private.as_ref().clone())
                            .try_sign(data)
                            .map(|s| s.to_vec())
                    }
                };
                result.map_err(|e| CertForgeError::SigningFailure(e.to_string()))
            }
            KeyPair::EcdsaP256 { signing_key, .. } => {
                let signature: p256::ecdsa::Signature = signing_key
                    .try_sign(data)
                    .map_err(|e| CertForgeError::SigningFailure(e.to_string()))?;
                Ok(signature.to_der().to_vec())
            }
            KeyPair::EcdsaP384 { signing_key, .. } => {
                let signature: p384::ecdsa::Signature = signing_key
                    .try_sign(data)
                    .map_err(|e| CertForgeError::SigningFailure(e.to_string()))?;
                Ok(signature.to_der().to_vec())
            }
            KeyPair::Ed25519 { signing_key } => {
                let signature: ed25519_dalek::Signature = signing_key
                    .try_sign(data)
                    .map_err(|e| CertForgeError::SigningFailure(e.to_string()))?;
                Ok(signature.to_bytes().to_vec())
            }
        }
    }

    /// Encode the public half as a `SubjectPublicKeyInfo`.
    pub fn as_spki(&self) -> Result<SubjectPublicKeyInfoOwned, CertForgeError> {
        PublicKey::from_key_pair(self).to_spki()
    }

    /// Short algorithm label for log messages.
    pub fn algorithm_name(&self) -> &'static str {
        match self {
            KeyPair::Rsa { .. } => "rsa",
            KeyPair::EcdsaP256 { .. } => "ecdsa-p256",
            KeyPair::EcdsaP384 { .. } => "ecdsa-p384",
            KeyPair::Ed25519 { .. } => "ed25519",
        }
    }
}

/// The public half of a [`KeyPair`], as carried in certificates and
/// signing requests.
#[derive(Debug, Clone)]
pub enum PublicKey {
    Rsa(RsaPublicKey),
    EcdsaP256(P256VerifyingKey),
    EcdsaP384(P384VerifyingKey),
    Ed25519(Ed25519VerifyingKey),
}

impl PublicKey {
    pub fn from_key_pair(key: &KeyPair) -> Self {
        match key {
            KeyPair::Rsa { public, .. } => PublicKey::Rsa(public.clone()),
            KeyPair::EcdsaP256 { verifying_key, .. } => PublicKey::EcdsaP256(*verifying_key),
            KeyPair::EcdsaP384 { verifying_key, .. } => PublicKey::EcdsaP384(*verifying_key),
            KeyPair::Ed25519 { signing_key } => PublicKey::Ed25519(signing_key.verifying_key()),
        }
    }

    /// Encode as a `SubjectPublicKeyInfo`.
    pub fn to_spki(&self) -> Result<SubjectPublicKeyInfoOwned, CertForgeError> {
        match self {
            PublicKey::Rsa(public) => SubjectPublicKeyInfoOwned::from_key(public.clone())
                .map_err(|e| CertForgeError::EncodingError(e.to_string())),
            PublicKey::EcdsaP256(verifying_key) => {
                SubjectPublicKeyInfoOwned::from_key(*verifying_key)
                    .map_err(|e| CertForgeError::EncodingError(e.to_string()))
            }
            PublicKey::EcdsaP384(verifying_key) => {
                SubjectPublicKeyInfoOwned::from_key(*verifying_key)
                    .map_err(|e| CertForgeError::EncodingError(e.to_string()))
            }
            PublicKey::Ed25519(verifying_key) => {
                let pk_bytes = verifying_key.to_bytes();
                Ok(SubjectPublicKeyInfoOwned {
                    algorithm: AlgorithmIdentifierOwned {
                        oid: rfc8410::ID_ED_25519,
                        parameters: None,
                    },
                    subject_public_key: BitString::from_bytes(&pk_bytes)
                        .map_err(|e| CertForgeError::EncodingError(e.to_string()))?,
                })
            }
        }
    }

    /// Decode from a `SubjectPublicKeyInfo`.
    pub fn from_x509spki(spki: &SubjectPublicKeyInfoOwned) -> Result<Self, CertForgeError> {
        let raw = spki.subject_public_key.raw_bytes();
        match spki.algorithm.oid {
            rfc5912::RSA_ENCRYPTION => {
                let public = RsaPublicKey::from_pkcs1_der(raw)
                    .map_err(|e| CertForgeError::DecodingError(e.to_string()))?;
                Ok(PublicKey::Rsa(public))
            }
            rfc5912::ID_EC_PUBLIC_KEY => {
                let params = spki.algorithm.parameters.as_ref().ok_or_else(|| {
                    CertForgeError::DecodingError("missing EC curve parameters".to_string())
                })?;
                let curve: ObjectIdentifier = params
                    .decode_as()
                    .map_err(|e| CertForgeError::DecodingError(e.to_string()))?;
                match curve {
                    rfc5912::SECP_256_R_1 => P256VerifyingKey::from_sec1_bytes(raw)
                        .map(PublicKey::EcdsaP256)
                        .map_err(|e| CertForgeError::DecodingError(e.to_string())),
                    rfc5912::SECP_384_R_1 => P384VerifyingKey::from_sec1_bytes(raw)
                        .map(PublicKey::EcdsaP384)
                        .map_err(|e| CertForgeError::DecodingError(e.to_string())),
                    other => Err(CertForgeError::DecodingError(format!(
                        "unsupported elliptic curve: {other}"
                    ))),
                }
            }
            rfc8410::ID_ED_25519 => {
                let bytes: [u8; 32] = raw.try_into().map_err(|_| {
                    CertForgeError::DecodingError("Ed25519 public key is not 32 bytes".to_string())
                })?;
                Ed25519VerifyingKey::from_bytes(&bytes)
                    .map(PublicKey::Ed25519)
                    .map_err(|e| CertForgeError::DecodingError(e.to_string()))
            }
            other => Err(CertForgeError::DecodingError(format!(
                "unsupported public key algorithm: {other}"
            ))),
        }
    }

    /// Verify `signature` over `message` under the X.509 signature
    /// algorithm identified by `oid`.
    ///
    /// Fails with [`CertForgeError::SignatureMismatch`] both when the
    /// signature does not verify and when the declared algorithm does not
    /// fit this key's family.
    pub fn verify_with_oid(
        &self,
        oid: ObjectIdentifier,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), CertForgeError> {
        match self {
            PublicKey::Rsa(public) => {
                let signature = rsa::pkcs1v15::Signature::try_from(signature)
                    .map_err(|e| CertForgeError::SignatureMismatch(e.to_string()))?;
                let outcome = match oid {
                    rfc5912::SHA_256_WITH_RSA_ENCRYPTION => {
                        rsa::pkcs1v15::VerifyingKey::<Sha256>::new(public.clone())
                            .verify(message, &signature)
                    }
                    rfc5912::SHA_384_WITH_RSA_ENCRYPTION => {
                        rsa::pkcs1v15::VerifyingKey::<Sha384>::new(public.clone())
                            .verify(message, &signature)
                    }
                    rfc5912::SHA_512_WITH_RSA_ENCRYPTION => {
                        rsa::pkcs1v15::VerifyingKey::<Sha512>::new(public.clone())
                            .verify(message, &signature)
                    }
                    other => {
                        return Err(CertForgeError::SignatureMismatch(format!(
                            "algorithm {other} does not fit an RSA key"
                        )));
                    }
                };
                outcome.map_err(|e| CertForgeError::SignatureMismatch(e.to_string()))
            }
            PublicKey::EcdsaP256(verifying_key) => {
                if oid != rfc5912::ECDSA_WITH_SHA_256 {
                    return Err(CertForgeError::SignatureMismatch(format!(
                        "algorithm {oid} does not fit a P-256 key"
                    )));
                }
                let signature = p256::ecdsa::Signature::from_der(signature)
                    .map_err(|e| CertForgeError::SignatureMismatch(e.to_string()))?;
                verifying_key
                    .verify(message, &signature)
                    .map_err(|e| CertForgeError::SignatureMismatch(e.to_string()))
            }
            PublicKey::EcdsaP384(verifying_key) => {
                if oid != rfc5912::ECDSA_WITH_SHA_384 {
                    return Err(CertForgeError::SignatureMismatch(format!(
                        "algorithm {oid} does not fit a P-384 key"
                    )));
                }
                let signature = p384::ecdsa::Signature::from_der(signature)
                    .map_err(|e| CertForgeError::SignatureMismatch(e.to_string()))?;
                verifying_key
                    .verify(message, &signature)
                    .map_err(|e| CertForgeError::SignatureMismatch(e.to_string()))
            }
            PublicKey::Ed25519(verifying_key) => {
                if oid != rfc8410::ID_ED_25519 {
                    return Err(CertForgeError::SignatureMismatch(format!(
                        "algorithm {oid} does not fit an Ed25519 key"
                    )));
                }
                let signature = ed25519_dalek::Signature::from_slice(signature)
                    .map_err(|e| CertForgeError::SignatureMismatch(e.to_string()))?;
                verifying_key
                    .verify(message, &signature)
                    .map_err(|e| CertForgeError::SignatureMismatch(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::SignatureAlgorithm;

    #[test]
    fn ecdsa_sign_verify_round_trip() {
        let key = KeyPair::generate_ecdsa_p256();
        let message = b"to be signed";
        let signature = key.sign_data(message, HashAlgorithm::Sha256).unwrap();
        let public = PublicKey::from_key_pair(&key);
        public
            .verify_with_oid(SignatureAlgorithm::Sha256WithECDSA.oid(), message, &signature)
            .unwrap();
    }

    #[test]
    fn ed25519_sign_verify_round_trip() {
        let key = KeyPair::generate_ed25519();
        let message = b"to be signed";
        let signature = key.sign_data(message, HashAlgorithm::Sha256).unwrap();
        let public = PublicKey::from_key_pair(&key);
        public
            .verify_with_oid(SignatureAlgorithm::Ed25519.oid(), message, &signature)
            .unwrap();
    }

    #[test]
    fn wrong_algorithm_oid_is_rejected() {
        let key = KeyPair::generate_ecdsa_p256();
        let message = b"to be signed";
        let signature = key.sign_data(message, HashAlgorithm::Sha256).unwrap();
        let public = PublicKey::from_key_pair(&key);
        let result =
            public.verify_with_oid(SignatureAlgorithm::Ed25519.oid(), message, &signature);
        assert!(matches!(result, Err(CertForgeError::SignatureMismatch(_))));
    }

    #[test]
    fn spki_round_trip_preserves_key_identity() {
        let key = KeyPair::generate_ecdsa_p384();
        let spki = key.as_spki().unwrap();
        let decoded = PublicKey::from_x509spki(&spki).unwrap();
        assert_eq!(decoded.to_spki().unwrap(), spki);
    }
}
