//! Command-line front end: sign a PKCS #10 request with a CA certificate
//! and private key, printing the new certificate to stdout.

use clap::{App, Arg};
use log::LevelFilter;
use zeroize::Zeroizing;

use certforge::cert::{Certificate, HashAlgorithm};
use certforge::cert::params::Validity;
use certforge::csr::SigningRequest;
use certforge::error::CertForgeError;
use certforge::issuer::{CaIdentity, RandomSerialAllocator};
use certforge::key::KeyPair;

/// Issued certificates are valid for one year from the moment of signing.
const VALIDITY_DAYS: i64 = 365;

fn init_logs() {
    use log4rs::append::console::{ConsoleAppender, Target};
    use log4rs::config::{Appender, Config, Root};

    // Logs go to stderr; stdout carries nothing but the certificate.
    let stderr = ConsoleAppender::builder().target(Target::Stderr).build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(LevelFilter::Info))
        .expect("unable to configure logger");
    log4rs::init_config(config).expect("can't init log4rs");
}

fn main() {
    init_logs();

    match run() {
        Ok(pem) => print!("{pem}"),
        Err(e) => {
            println!("{e}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<String, CertForgeError> {
    let matches = App::new("certforge")
        .about("Signs a PKCS #10 certificate request with a CA certificate and key")
        .arg(
            Arg::with_name("passphrase")
                .help("passphrase for the CA private key (empty for an unencrypted key)")
                .required(true),
        )
        .arg(
            Arg::with_name("ca-cert")
                .help("path to the PEM-encoded CA certificate")
                .required(true),
        )
        .arg(
            Arg::with_name("ca-key")
                .help("path to the PKCS #8 CA private key")
                .required(true),
        )
        .arg(
            Arg::with_name("request")
                .help("path to the PEM-encoded certificate request")
                .required(true),
        )
        .get_matches_safe()
        .map_err(|e| CertForgeError::UsageError(e.message))?;

    let passphrase = Zeroizing::new(
        matches
            .value_of("passphrase")
            .unwrap_or_default()
            .to_string(),
    );
    let ca_cert_path = matches.value_of("ca-cert").unwrap_or_default();
    let ca_key_path = matches.value_of("ca-key").unwrap_or_default();
    let request_path = matches.value_of("request").unwrap_or_default();

    log::info!("loading CA certificate from {ca_cert_path}");
    let ca_cert = Certificate::from_pem(&read_input(ca_cert_path)?)?;

    log::info!("loading CA private key from {ca_key_path}");
    let ca_key_pem = Zeroizing::new(read_input(ca_key_path)?);
    let ca_key = if passphrase.is_empty() {
        KeyPair::from_pkcs8_pem(&ca_key_pem)?
    } else {
        KeyPair::from_pkcs8_encrypted_pem(&ca_key_pem, &passphrase)?
    };

    log::info!("loading certificate request from {request_path}");
    let request = SigningRequest::from_pem(&read_input(request_path)?)?;
    request.verify()?;
    log::info!("request verified for CN={}", request.subject().common_name);

    let ca = CaIdentity::new(ca_cert, ca_key);
    let certificate = ca.sign_request(
        &request,
        &Validity::for_days(VALIDITY_DAYS),
        HashAlgorithm::Sha256,
        &RandomSerialAllocator,
    )?;

    certificate.to_pem()
}

fn read_input(path: &str) -> Result<String, CertForgeError> {
    std::fs::read_to_string(path).map_err(|e| CertForgeError::IoError(format!("{path}: {e}")))
}
