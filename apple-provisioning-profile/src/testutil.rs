// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fixtures for tests.

use {
    chrono::{DateTime, TimeZone, Utc},
    cryptographic_message_syntax::{SignedDataBuilder, SignerBuilder},
    plist::{Dictionary, Value},
    std::time::SystemTime,
    x509_certificate::{
        CapturedX509Certificate, InMemorySigningKeyPair, KeyAlgorithm, X509CertificateBuilder,
    },
};

pub const PROFILE_UUID: &str = "6C3B9E6A-5E2F-4E39-9C1B-3A0A6C5D2F10";

pub fn utc(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

pub fn plist_date(dt: DateTime<Utc>) -> Value {
    Value::Date(plist::Date::from(SystemTime::from(dt)))
}

fn string_array(values: &[&str]) -> Value {
    Value::Array(values.iter().map(|s| Value::String(s.to_string())).collect())
}

/// Generate a self-signed certificate valid from now for a year.
pub fn self_signed_certificate(
    common_name: &str,
) -> (CapturedX509Certificate, InMemorySigningKeyPair) {
    self_signed_certificate_valid_for(common_name, chrono::Duration::days(365))
}

/// Generate a self-signed certificate valid from now for the given duration.
pub fn self_signed_certificate_valid_for(
    common_name: &str,
    validity: chrono::Duration,
) -> (CapturedX509Certificate, InMemorySigningKeyPair) {
    let mut builder = X509CertificateBuilder::new(KeyAlgorithm::Ed25519);
    builder
        .subject()
        .append_common_name_utf8_string(common_name)
        .unwrap();
    builder.validity_duration(validity);

    let (cert, key, _) = builder.create_with_random_keypair().unwrap();

    (cert, key)
}

/// Generate a self-signed certificate and its PKCS#8 encoded private key.
pub fn self_signed_identity(common_name: &str) -> (CapturedX509Certificate, Vec<u8>) {
    let mut builder = X509CertificateBuilder::new(KeyAlgorithm::Ed25519);
    builder
        .subject()
        .append_common_name_utf8_string(common_name)
        .unwrap();

    let (cert, _, document) = builder.create_with_random_keypair().unwrap();

    (cert, document.as_ref().to_vec())
}

/// A payload dictionary resembling what Apple issues for a development profile.
pub fn profile_dictionary(certificates: Vec<Vec<u8>>) -> Dictionary {
    let mut dict = Dictionary::new();

    dict.insert("AppIDName".into(), Value::String("Example App".into()));
    dict.insert(
        "ApplicationIdentifierPrefix".into(),
        string_array(&["TEAM123456"]),
    );
    dict.insert("CreationDate".into(), plist_date(utc(2020, 1, 1)));
    dict.insert("Platform".into(), string_array(&["iOS", "xrOS"]));
    dict.insert("IsXcodeManaged".into(), Value::Boolean(true));
    dict.insert(
        "DeveloperCertificates".into(),
        Value::Array(certificates.into_iter().map(Value::Data).collect()),
    );

    let mut entitlements = Dictionary::new();
    entitlements.insert(
        "application-identifier".into(),
        Value::String("TEAM123456.com.example.app".into()),
    );
    entitlements.insert("get-task-allow".into(), Value::Boolean(true));
    dict.insert("Entitlements".into(), Value::Dictionary(entitlements));

    dict.insert("ExpirationDate".into(), plist_date(utc(2020, 4, 1)));
    dict.insert("Name".into(), Value::String("iOS Team Provisioning Profile".into()));
    dict.insert(
        "ProvisionedDevices".into(),
        string_array(&["00008030-001A2B3C4D5E6F70", "00008110-000A1B2C3D4E5F60"]),
    );
    dict.insert("TeamIdentifier".into(), string_array(&["TEAM123456"]));
    dict.insert("TeamName".into(), Value::String("Example Team".into()));
    dict.insert("TimeToLive".into(), Value::Integer(91.into()));
    dict.insert("UUID".into(), Value::String(PROFILE_UUID.into()));
    dict.insert("Version".into(), Value::Integer(1.into()));

    dict
}

pub fn plist_xml(dict: &Dictionary) -> Vec<u8> {
    let mut buf = Vec::new();
    Value::Dictionary(dict.clone())
        .to_writer_xml(&mut buf)
        .unwrap();

    buf
}

/// Wrap content in a CMS signed message, the way profiles are distributed.
pub fn sign_content(content: Vec<u8>) -> Vec<u8> {
    let (cert, key) = self_signed_certificate("Apple iPhone OS Provisioning Profile Signing");

    sign_content_with(content, &key, cert)
}

/// Wrap content in a CMS signed message using a specific key and certificate.
///
/// The key isn't required to belong to the certificate.
pub fn sign_content_with(
    content: Vec<u8>,
    key: &InMemorySigningKeyPair,
    cert: CapturedX509Certificate,
) -> Vec<u8> {
    SignedDataBuilder::default()
        .certificate(cert.clone())
        .content_inline(content)
        .signer(SignerBuilder::new(key, cert))
        .build_der()
        .unwrap()
}

/// Wrap content in a CMS signed message without any signers.
pub fn unsigned_content(content: Vec<u8>) -> Vec<u8> {
    SignedDataBuilder::default()
        .content_inline(content)
        .build_der()
        .unwrap()
}

/// Produce the bytes of a provisioning profile file from a payload dictionary.
pub fn encode_profile(dict: &Dictionary) -> Vec<u8> {
    sign_content(plist_xml(dict))
}
