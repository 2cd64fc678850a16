// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Developer certificates embedded in provisioning profiles.

use {
    crate::error::AppleProfileError,
    chrono::{DateTime, Utc},
    x509_certificate::{asn1time::Time, rfc5280, CapturedX509Certificate, X509Certificate},
};

/// Convert an ASN.1 time value to a UTC instant.
pub(crate) fn asn1_time_to_utc(time: &Time) -> DateTime<Utc> {
    match time {
        Time::UtcTime(t) => **t,
        Time::GeneralTime(t) => DateTime::<Utc>::from(t.clone()),
    }
}

fn validity(cert: &CapturedX509Certificate) -> &rfc5280::Validity {
    let x509: &X509Certificate = cert;
    let asn1: &rfc5280::Certificate = x509.as_ref();

    &asn1.tbs_certificate.validity
}

/// An X.509 certificate embedded in a provisioning profile.
///
/// The raw DER bytes are always retained exactly as they appeared in the
/// profile. Parsing is attempted once at construction. A certificate that
/// fails to parse is still represented; it simply has no parsed form and
/// every health check against it fails.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeveloperCertificate {
    raw_data: Vec<u8>,
    parsed: Option<CapturedX509Certificate>,
}

impl DeveloperCertificate {
    /// Construct an instance from DER encoded certificate data.
    ///
    /// This never fails.
    pub fn from_der(data: impl Into<Vec<u8>>) -> Self {
        let raw_data = data.into();

        let parsed = match CapturedX509Certificate::from_der(raw_data.clone()) {
            Ok(cert) => Some(cert),
            Err(e) => {
                log::debug!("embedded developer certificate is not valid DER: {}", e);
                None
            }
        };

        Self { raw_data, parsed }
    }

    /// The DER bytes as embedded in the profile.
    pub fn raw_data(&self) -> &[u8] {
        &self.raw_data
    }

    /// The parsed X.509 certificate, if the bytes are a valid certificate.
    pub fn certificate(&self) -> Option<&CapturedX509Certificate> {
        self.parsed.as_ref()
    }

    /// Whether the raw bytes could be parsed as an X.509 certificate.
    pub fn is_parseable(&self) -> bool {
        self.parsed.is_some()
    }

    pub fn not_valid_before(&self) -> Option<DateTime<Utc>> {
        self.parsed
            .as_ref()
            .map(|cert| asn1_time_to_utc(&validity(cert).not_before))
    }

    pub fn not_valid_after(&self) -> Option<DateTime<Utc>> {
        self.parsed
            .as_ref()
            .map(|cert| asn1_time_to_utc(&validity(cert).not_after))
    }

    /// Big-endian bytes of the certificate's serial number.
    pub fn serial_number(&self) -> Option<&[u8]> {
        self.parsed
            .as_ref()
            .map(|cert| cert.serial_number_asn1().as_slice())
    }

    /// Hex rendering of [Self::serial_number].
    pub fn serial_number_hex(&self) -> Option<String> {
        self.serial_number().map(hex::encode)
    }

    pub fn subject_common_name(&self) -> Option<String> {
        self.parsed
            .as_ref()
            .and_then(|cert| cert.subject_common_name())
    }

    pub fn issuer_common_name(&self) -> Option<String> {
        self.parsed
            .as_ref()
            .and_then(|cert| cert.issuer_common_name())
    }

    /// Hex encoded SHA-256 digest of the raw certificate data.
    pub fn sha256_fingerprint(&self) -> Result<Option<String>, AppleProfileError> {
        if let Some(cert) = &self.parsed {
            Ok(Some(hex::encode(cert.sha256_fingerprint()?)))
        } else {
            Ok(None)
        }
    }
}
