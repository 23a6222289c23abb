use thiserror::Error;

/// Errors produced by the certforge issuance engine.
///
/// Every error is terminal for the operation that raised it: nothing is
/// retried internally, and no partial output is ever produced.
#[derive(Debug, Error, Clone)]
pub enum CertForgeError {
    /// The signing request is absent required fields or structurally
    /// inconsistent (truncated encoding, unexpected tags, empty subject).
    #[error("malformed certification request: {0}")]
    MalformedRequest(String),

    /// A signature did not verify: either the request's embedded
    /// self-signature against its own public key, or a certificate
    /// signature against the issuer key.
    #[error("signature mismatch: {0}")]
    SignatureMismatch(String),

    /// The supplied CA private key does not correspond to the CA
    /// certificate's declared public key.
    #[error("CA key mismatch: {0}")]
    KeyMismatch(String),

    /// The underlying signing primitive failed.
    #[error("signing failure: {0}")]
    SigningFailure(String),

    /// A certificate could not be decoded from its transport form.
    #[error("malformed certificate: {0}")]
    MalformedCertificate(String),

    /// The command line was invoked incorrectly.
    #[error("{0}")]
    UsageError(String),

    /// Error during data encoding.
    #[error("failed to encode data: {0}")]
    EncodingError(String),

    /// Error during data decoding.
    #[error("failed to decode data: {0}")]
    DecodingError(String),

    /// Error due to invalid input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Error during key generation.
    #[error("key generation error: {0}")]
    KeyGenerationError(String),

    /// Error reading or writing a file.
    #[error("i/o error: {0}")]
    IoError(String),
}

impl From<der::Error> for CertForgeError {
    fn from(err: der::Error) -> Self {
        CertForgeError::DecodingError(err.to_string())
    }
}

impl From<pkcs8::Error> for CertForgeError {
    fn from(err: pkcs8::Error) -> Self {
        CertForgeError::DecodingError(err.to_string())
    }
}

impl From<pem::PemError> for CertForgeError {
    fn from(err: pem::PemError) -> Self {
        CertForgeError::DecodingError(err.to_string())
    }
}

impl From<std::io::Error> for CertForgeError {
    fn from(err: std::io::Error) -> Self {
        CertForgeError::IoError(err.to_string())
    }
}
