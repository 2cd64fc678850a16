// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    cryptographic_message_syntax::CmsError, std::path::PathBuf, thiserror::Error,
    x509_certificate::X509CertificateError,
};

/// Structural failures when decoding a provisioning profile.
///
/// Problems with the certificates embedded in a profile are never reported
/// through this type. Those are surfaced as health flags instead so a profile
/// with broken certificates can still be inspected.
#[derive(Debug, Error)]
pub enum ProfileDecodeError {
    #[error("data is not a well-formed CMS signed message: {0}")]
    CorruptEnvelope(CmsError),

    #[error("CMS signed message does not have encapsulated content")]
    EnvelopeMissingContent,

    #[error("signed content is not a parseable property list: {0}")]
    MalformedPayload(plist::Error),

    #[error("property list root is not a dictionary")]
    PayloadNotDictionary,

    #[error("required key {0} is missing or has the wrong type")]
    MissingField(&'static str),
}

/// Error returned by a [crate::TrustStore] query.
///
/// Health evaluation treats any of these as "not found".
#[derive(Debug, Error)]
pub enum TrustStoreError {
    #[error("trust store lookup failed: {0}")]
    Lookup(String),

    #[cfg(target_os = "macos")]
    #[error("SecurityFramework error: {0}")]
    SecurityFramework(#[from] security_framework::base::Error),
}

/// Unified error type for loading and inspecting provisioning profiles.
#[derive(Debug, Error)]
pub enum AppleProfileError {
    #[error("unknown command")]
    CliUnknownCommand,

    #[error("bad argument")]
    CliBadArgument,

    #[error("{0}")]
    CliGeneralError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("error walking directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("provisioning profile decode error: {0}")]
    Decode(#[from] ProfileDecodeError),

    #[error("X.509 certificate handler error: {0}")]
    X509(#[from] X509CertificateError),

    #[error("PEM file does not contain a certificate: {0}")]
    PemNoCertificate(PathBuf),

    #[error("PEM error: {0}")]
    Pem(pem::PemError),

    #[error("PEM file does not contain a private key: {0}")]
    PemNoPrivateKey(PathBuf),

    #[error("PEM file has no certificate matching its private key: {0}")]
    PemKeyMismatch(PathBuf),

    #[error("JSON serialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("trust store error: {0}")]
    TrustStore(#[from] TrustStoreError),

    #[cfg(target_os = "macos")]
    #[error("SecurityFramework error: {0}")]
    SecurityFramework(#[from] security_framework::base::Error),

    #[error("error interfacing with macOS keychain: {0}")]
    KeychainError(String),
}
