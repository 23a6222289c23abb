mod util;

use certforge::cert::extensions::{BasicConstraints, SubjectAltName, ToAndFromX509Extension};
use certforge::cert::params::{DistinguishedName, ExtensionParam, Validity};
use certforge::cert::{Certificate, HashAlgorithm, SignatureAlgorithm};
use certforge::csr::SigningRequest;
use certforge::error::CertForgeError;
use certforge::issuer::{CaIdentity, RandomSerialAllocator};
use certforge::key::{KeyPair, PublicKey};
use certforge::tbs_certificate::TbsCertificate;
use time::{Duration, OffsetDateTime};

fn leaf_subject(common_name: &str) -> DistinguishedName {
    DistinguishedName::builder()
        .common_name(common_name.to_string())
        .build()
}

/// Issuing over a valid request produces a certificate that verifies under
/// the CA's public key.
#[test]
fn issued_certificate_verifies_under_ca_key() {
    let ca = util::test_ca("Issuing CA");
    let leaf_key = KeyPair::generate_ecdsa_p256();
    let request = SigningRequest::generate(
        &leaf_subject("server.example.com"),
        &leaf_key,
        HashAlgorithm::Sha256,
    )
    .unwrap();

    let certificate = ca
        .sign_request(
            &request,
            &Validity::for_days(30),
            HashAlgorithm::Sha256,
            &RandomSerialAllocator,
        )
        .unwrap();

    let ca_public = ca.certificate.public_key().unwrap();
    certificate.verify_signed_by(&ca_public).unwrap();
    assert_eq!(certificate.issuer().common_name, "Issuing CA");
    assert_eq!(certificate.subject().common_name, "server.example.com");
}

/// The classic scenario: CN=Test CA signs a request from CN=Alice with a
/// 2048-bit RSA key over an explicit one-year window.
#[test]
fn test_ca_issues_to_alice_with_fixed_window() {
    let ca = util::test_ca("Test CA");
    let alice_key = KeyPair::generate_rsa(2048).unwrap();
    let request =
        SigningRequest::generate(&leaf_subject("Alice"), &alice_key, HashAlgorithm::Sha256)
            .unwrap();

    // 2026-01-01T00:00:00Z
    let t = OffsetDateTime::from_unix_timestamp(1_767_225_600).unwrap();
    let validity = Validity::new(t, t + Duration::days(365)).unwrap();

    let certificate = ca
        .sign_request(
            &request,
            &validity,
            HashAlgorithm::Sha256,
            &RandomSerialAllocator,
        )
        .unwrap();

    assert_eq!(certificate.issuer().common_name, "Test CA");
    assert_eq!(certificate.subject().common_name, "Alice");
    assert_eq!(certificate.validity(), validity);
    certificate
        .verify_signed_by(&ca.certificate.public_key().unwrap())
        .unwrap();
}

/// A single bit flip in the request's self-signature must be caught.
#[test]
fn tampered_request_signature_is_rejected() {
    let key = KeyPair::generate_ed25519();
    let request =
        SigningRequest::generate(&leaf_subject("Mallory"), &key, HashAlgorithm::Sha256).unwrap();

    let mut der = request.to_der().unwrap();
    // The request DER ends with the signature bit string.
    let last = der.len() - 1;
    der[last] ^= 0x01;

    let result = SigningRequest::validate(&der);
    assert!(matches!(result, Err(CertForgeError::SignatureMismatch(_))));
}

/// Degenerate validity windows never reach a signed certificate.
#[test]
fn degenerate_validity_window_is_rejected() {
    let ca = util::test_ca("Test CA");
    let leaf_key = KeyPair::generate_ecdsa_p256();
    let request = SigningRequest::generate(
        &leaf_subject("server.example.com"),
        &leaf_key,
        HashAlgorithm::Sha256,
    )
    .unwrap();

    let t = OffsetDateTime::from_unix_timestamp(1_767_225_600).unwrap();
    let degenerate = Validity {
        not_before: t,
        not_after: t,
    };

    let result = ca.sign_request(
        &request,
        &degenerate,
        HashAlgorithm::Sha256,
        &RandomSerialAllocator,
    );
    assert!(matches!(result, Err(CertForgeError::InvalidInput(_))));
}

/// Unparsable requests fail with MalformedRequest and produce nothing.
#[test]
fn unparsable_request_yields_malformed_request() {
    let result = SigningRequest::validate(b"-----BEGIN GIBBERISH-----");
    assert!(matches!(result, Err(CertForgeError::MalformedRequest(_))));

    let result = SigningRequest::validate(&[0x30, 0x82, 0xff, 0xff, 0x00]);
    assert!(matches!(result, Err(CertForgeError::MalformedRequest(_))));
}

/// A CA whose private key does not match its certificate must refuse to
/// sign.
#[test]
fn mismatched_ca_key_is_rejected() {
    let ca = util::test_ca("Test CA");
    let unrelated_key = KeyPair::generate_ecdsa_p256();
    let rogue = CaIdentity::new(ca.certificate.clone(), unrelated_key);

    let leaf_key = KeyPair::generate_ecdsa_p256();
    let request = SigningRequest::generate(
        &leaf_subject("server.example.com"),
        &leaf_key,
        HashAlgorithm::Sha256,
    )
    .unwrap();

    let result = rogue.sign_request(
        &request,
        &Validity::for_days(30),
        HashAlgorithm::Sha256,
        &RandomSerialAllocator,
    );
    assert!(matches!(result, Err(CertForgeError::KeyMismatch(_))));
}

/// PEM round-trip returns a structurally identical certificate.
#[test]
fn issued_certificate_pem_round_trip() {
    let ca = util::test_ca("Test CA");
    let leaf_key = KeyPair::generate_ed25519();
    let request = SigningRequest::generate(
        &leaf_subject("roundtrip.example.com"),
        &leaf_key,
        HashAlgorithm::Sha256,
    )
    .unwrap();

    let certificate = ca
        .sign_request(
            &request,
            &Validity::for_days(30),
            HashAlgorithm::Sha256,
            &RandomSerialAllocator,
        )
        .unwrap();

    let pem_text = certificate.to_pem().unwrap();
    let reparsed = Certificate::from_pem(&pem_text).unwrap();
    assert_eq!(reparsed, certificate);
    assert_eq!(reparsed.to_der().unwrap(), certificate.to_der().unwrap());
}

/// Encoding the same certificate body twice yields identical bytes.
#[test]
fn tbs_encoding_is_deterministic() {
    let key = KeyPair::generate_ecdsa_p256();
    let t = OffsetDateTime::from_unix_timestamp(1_767_225_600).unwrap();

    let tbs = TbsCertificate {
        serial_number: vec![0x05],
        signature_algorithm: SignatureAlgorithm::Sha256WithECDSA,
        issuer: leaf_subject("Test CA"),
        validity: Validity::new(t, t + Duration::days(365)).unwrap(),
        subject: leaf_subject("Alice"),
        subject_public_key: PublicKey::from_key_pair(&key),
        extensions: vec![],
    };

    assert_eq!(tbs.to_der().unwrap(), tbs.to_der().unwrap());
}

/// Requested extensions are carried into the certificate, but the
/// CA-controlled ones win on conflict: a requester cannot grant itself
/// basic constraints.
#[test]
fn requested_san_is_carried_and_ca_extensions_win() {
    let ca = util::test_ca("Test CA");
    let leaf_key = KeyPair::generate_ecdsa_p256();

    let san = SubjectAltName {
        names: vec!["alt.example.com".to_string()],
    };
    let smuggled_bc = BasicConstraints {
        is_ca: true,
        max_path_length: None,
    };
    let requested = vec![
        ExtensionParam::from_extension(san.clone(), false).unwrap(),
        ExtensionParam::from_extension(smuggled_bc, true).unwrap(),
    ];
    let request = SigningRequest::generate_with_extensions(
        &leaf_subject("server.example.com"),
        &leaf_key,
        HashAlgorithm::Sha256,
        &requested,
    )
    .unwrap();

    let certificate = ca
        .sign_request(
            &request,
            &Validity::for_days(30),
            HashAlgorithm::Sha256,
            &RandomSerialAllocator,
        )
        .unwrap();

    let extensions = certificate.to_tbs().unwrap().extensions;

    let sans: Vec<_> = extensions
        .iter()
        .filter(|ext| ext.oid == SubjectAltName::OID)
        .collect();
    assert_eq!(sans.len(), 1);
    assert_eq!(sans[0].to_extension::<SubjectAltName>().unwrap(), san);

    let constraints: Vec<_> = extensions
        .iter()
        .filter(|ext| ext.oid == BasicConstraints::OID)
        .collect();
    assert_eq!(constraints.len(), 1);
    let bc = constraints[0].to_extension::<BasicConstraints>().unwrap();
    assert!(!bc.is_ca);
}

/// The self-signed CA bootstrap produces a certificate that verifies under
/// its own key and marks itself as a CA.
#[test]
fn self_signed_ca_is_consistent() {
    let ca = util::test_ca("Root CA");
    let ca_public = ca.certificate.public_key().unwrap();
    ca.certificate.verify_signed_by(&ca_public).unwrap();

    assert_eq!(ca.certificate.subject(), ca.certificate.issuer());
    let info = ca.certificate.to_cert_info().unwrap();
    assert!(info.is_ca);
}
