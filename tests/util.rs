use certforge::cert::Certificate;
use certforge::cert::extensions::ExtendedKeyUsageOption;
use certforge::cert::params::{CertificationRequestInfo, DistinguishedName, Validity};
use certforge::issuer::CaIdentity;
use certforge::key::{KeyPair, PublicKey};

/// Build a self-signed CA identity with an ECDSA P-256 key.
pub fn test_ca(common_name: &str) -> CaIdentity {
    test_ca_with_key(common_name, KeyPair::generate_ecdsa_p256())
}

pub fn test_ca_with_key(common_name: &str, ca_key: KeyPair) -> CaIdentity {
    let subject = DistinguishedName::builder()
        .common_name(common_name.to_string())
        .organization("Certforge Tests".to_string())
        .build();

    let ca_info = CertificationRequestInfo::builder()
        .subject(subject)
        .subject_public_key(PublicKey::from_key_pair(&ca_key))
        .usages(vec![
            ExtendedKeyUsageOption::ServerAuth,
            ExtendedKeyUsageOption::ClientAuth,
        ])
        .is_ca(true)
        .build();

    let ca_cert = Certificate::new_self_signed(&ca_info, &ca_key, &Validity::for_days(3650))
        .expect("self-signed CA certificate");

    CaIdentity::new(ca_cert, ca_key)
}
