use openssl::asn1::{Asn1Integer, Asn1Time};
use openssl::bn::{BigNum, MsbOption};
use openssl::error::ErrorStack;
use openssl::hash::MessageDigest;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::stack::Stack;
use openssl::x509::extension::{
    BasicConstraints, ExtendedKeyUsage, KeyUsage, SubjectAlternativeName,
};
use openssl::x509::{X509, X509Builder, X509Name, X509NameBuilder};

/// Builds a merchant-style PKCS#12 archive for tests.
///
/// It holds a client certificate issued by a throwaway CA, the CA itself as
/// chain, and is protected with `mch_id` as passphrase.
pub fn generate_test_pkcs12(mch_id: &str) -> Result<Vec<u8>, ErrorStack> {
    let (ca_cert, ca_key) = generate_ca_certificate()?;
    generate_test_pkcs12_with_ca(&ca_cert, &ca_key, mch_id)
}

/// Same as [`generate_test_pkcs12`], with the client certificate issued by
/// the given CA so a TLS server can be set up to trust it.
pub fn generate_test_pkcs12_with_ca(
    ca_cert: &X509,
    ca_key: &PKey<Private>,
    mch_id: &str,
) -> Result<Vec<u8>, ErrorStack> {
    let (client_cert, client_key) = generate_client_certificate(ca_cert, ca_key, mch_id)?;

    let mut chain = Stack::new()?;
    chain.push(ca_cert.clone())?;

    let archive = Pkcs12::builder()
        .name(mch_id)
        .pkey(&client_key)
        .cert(&client_cert)
        .ca(chain)
        .build2(mch_id)?;
    archive.to_der()
}

pub fn generate_ca_certificate() -> Result<(X509, PKey<Private>), ErrorStack> {
    let key_pair = PKey::from_rsa(Rsa::generate(2048)?)?;

    let mut cert_builder = X509Builder::new()?;
    cert_builder.set_version(2)?;
    cert_builder.set_serial_number(generate_serial_number()?.as_ref())?;

    let subject_name = create_x509_name(&[
        ("C", "CN"),
        ("O", "Test Payment Gateway"),
        ("OU", "Test CA"),
        ("CN", "Test Merchant Root CA"),
    ])?;
    cert_builder.set_subject_name(&subject_name)?;
    cert_builder.set_issuer_name(&subject_name)?;
    cert_builder.set_pubkey(&key_pair)?;

    cert_builder.set_not_before(Asn1Time::days_from_now(0)?.as_ref())?;
    cert_builder.set_not_after(Asn1Time::days_from_now(365)?.as_ref())?;

    cert_builder.append_extension(BasicConstraints::new().critical().ca().build()?)?;
    cert_builder.append_extension(
        KeyUsage::new()
            .critical()
            .key_cert_sign()
            .crl_sign()
            .build()?,
    )?;

    cert_builder.sign(&key_pair, MessageDigest::sha256())?;

    Ok((cert_builder.build(), key_pair))
}

/// Issues a TLS client certificate whose common name is the merchant id.
pub fn generate_client_certificate(
    ca_cert: &X509,
    ca_key: &PKey<Private>,
    mch_id: &str,
) -> Result<(X509, PKey<Private>), ErrorStack> {
    let key_pair = PKey::from_rsa(Rsa::generate(2048)?)?;

    let mut cert_builder = X509Builder::new()?;
    cert_builder.set_version(2)?;
    cert_builder.set_serial_number(generate_serial_number()?.as_ref())?;

    let subject_name = create_x509_name(&[("C", "CN"), ("O", "Test Merchant"), ("CN", mch_id)])?;
    cert_builder.set_subject_name(&subject_name)?;
    cert_builder.set_issuer_name(ca_cert.subject_name())?;
    cert_builder.set_pubkey(&key_pair)?;

    cert_builder.set_not_before(Asn1Time::days_from_now(0)?.as_ref())?;
    cert_builder.set_not_after(Asn1Time::days_from_now(365)?.as_ref())?;

    cert_builder.append_extension(BasicConstraints::new().build()?)?;
    cert_builder.append_extension(
        KeyUsage::new()
            .critical()
            .digital_signature()
            .key_encipherment()
            .build()?,
    )?;
    cert_builder.append_extension(ExtendedKeyUsage::new().client_auth().build()?)?;

    cert_builder.sign(ca_key, MessageDigest::sha256())?;

    Ok((cert_builder.build(), key_pair))
}

/// Issues a TLS server certificate for `localhost` and `127.0.0.1`.
pub fn generate_server_certificate(
    ca_cert: &X509,
    ca_key: &PKey<Private>,
) -> Result<(X509, PKey<Private>), ErrorStack> {
    let key_pair = PKey::from_rsa(Rsa::generate(2048)?)?;

    let mut cert_builder = X509Builder::new()?;
    cert_builder.set_version(2)?;
    cert_builder.set_serial_number(generate_serial_number()?.as_ref())?;

    let subject_name = create_x509_name(&[("C", "CN"), ("O", "Test Payment Gateway"), ("CN", "localhost")])?;
    cert_builder.set_subject_name(&subject_name)?;
    cert_builder.set_issuer_name(ca_cert.subject_name())?;
    cert_builder.set_pubkey(&key_pair)?;

    cert_builder.set_not_before(Asn1Time::days_from_now(0)?.as_ref())?;
    cert_builder.set_not_after(Asn1Time::days_from_now(365)?.as_ref())?;

    cert_builder.append_extension(BasicConstraints::new().build()?)?;
    cert_builder.append_extension(
        KeyUsage::new()
            .critical()
            .digital_signature()
            .key_encipherment()
            .build()?,
    )?;
    cert_builder.append_extension(ExtendedKeyUsage::new().server_auth().build()?)?;
    let san = SubjectAlternativeName::new()
        .dns("localhost")
        .ip("127.0.0.1")
        .build(&cert_builder.x509v3_context(Some(ca_cert), None))?;
    cert_builder.append_extension(san)?;

    cert_builder.sign(ca_key, MessageDigest::sha256())?;

    Ok((cert_builder.build(), key_pair))
}

fn generate_serial_number() -> Result<Asn1Integer, ErrorStack> {
    let mut serial = BigNum::new()?;
    serial.rand(128, MsbOption::MAYBE_ZERO, false)?;
    serial.to_asn1_integer()
}

fn create_x509_name(entries: &[(&str, &str)]) -> Result<X509Name, ErrorStack> {
    let mut name_builder = X509NameBuilder::new()?;
    for (key, value) in entries {
        name_builder.append_entry_by_text(key, value)?;
    }
    Ok(name_builder.build())
}
