//! # certforge - A Pure Rust Certificate Issuance Engine
//!
//! certforge implements the core of a certificate authority with the
//! RustCrypto stack and no OpenSSL or ring dependencies: it validates
//! PKCS #10 certificate signing requests and produces correctly-formed,
//! correctly-signed X.509 v3 certificates.
//!
//! The engine is deliberately small. Parsing untrusted requests, checking
//! their proof of possession, resolving extensions, canonically encoding
//! the certificate body, and computing the signature are in scope; key
//! distribution, revocation, and chain validation are the caller's
//! business.
//!
//! ## Supported Key Types
//!
//! - **RSA**: PKCS #1 v1.5 signatures over SHA-256/384/512
//! - **ECDSA**: P-256 and P-384, with the curve-matched digest
//! - **Ed25519**
//!
//! ## Issuing a Certificate from a Signing Request
//!
//! ```rust,no_run
//! use certforge::{
//!     cert::{Certificate, HashAlgorithm},
//!     cert::params::{CertificationRequestInfo, DistinguishedName, Validity},
//!     csr::SigningRequest,
//!     issuer::{CaIdentity, RandomSerialAllocator},
//!     key::{KeyPair, PublicKey},
//! };
//!
//! # fn main() -> Result<(), certforge::error::CertForgeError> {
//! // Bootstrap a CA identity.
//! let ca_key = KeyPair::generate_ecdsa_p256();
//! let ca_subject = DistinguishedName::builder()
//!     .common_name("Example CA".to_string())
//!     .organization("Example Corp".to_string())
//!     .build();
//! let ca_info = CertificationRequestInfo::builder()
//!     .subject(ca_subject)
//!     .subject_public_key(PublicKey::from_key_pair(&ca_key))
//!     .is_ca(true)
//!     .build();
//! let ca_cert = Certificate::new_self_signed(&ca_info, &ca_key, &Validity::for_days(3650))?;
//! let ca = CaIdentity::new(ca_cert, ca_key);
//!
//! // Validate an incoming request and sign it.
//! let raw = std::fs::read("req.pem").expect("request file");
//! let request = SigningRequest::validate(&raw)?;
//! let cert = ca.sign_request(
//!     &request,
//!     &Validity::for_days(365),
//!     HashAlgorithm::Sha256,
//!     &RandomSerialAllocator,
//! )?;
//! println!("{}", cert.to_pem()?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`error::CertForgeError`], with
//! distinct variants for the failure kinds a caller wants to tell apart:
//!
//! ```rust
//! use certforge::{csr::SigningRequest, error::CertForgeError};
//!
//! match SigningRequest::validate(b"garbage") {
//!     Err(CertForgeError::MalformedRequest(msg)) => println!("bad request: {msg}"),
//!     Err(CertForgeError::SignatureMismatch(msg)) => println!("forged request: {msg}"),
//!     Err(e) => println!("other error: {e}"),
//!     Ok(_) => unreachable!(),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`csr`]: PKCS #10 request parsing and self-signature validation
//! - [`issuer`]: the CA engine and serial number allocation
//! - [`cert`]: certificate type, signature algorithms, DER/PEM transport
//! - [`tbs_certificate`]: canonical encoding of the certificate body
//! - [`key`]: key pairs, PKCS #8 import, signing and verification
//! - [`error`]: the error taxonomy

pub mod cert;
pub mod csr;
pub mod error;
pub mod issuer;
pub mod key;
pub mod pem_utils;
pub mod tbs_certificate;
