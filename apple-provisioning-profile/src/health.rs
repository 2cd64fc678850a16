// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Certificate health evaluation.
//!
//! Health is derived at evaluation time from three inputs: the certificate
//! bytes, the current time, and the contents of a [TrustStore]. Nothing here
//! is cached on the profile, as both the clock and the trust store change
//! between evaluations.
//!
//! Profile level flags are folded optimistically over the profile's
//! certificates: a flag is set only when no certificate clears it. Profiles
//! commonly carry an expired certificate next to its renewed replacement and
//! those are usable.

use {
    crate::{
        certificate::DeveloperCertificate,
        error::TrustStoreError,
        profile::ProvisioningProfile,
        trust_store::TrustStore,
    },
    chrono::{DateTime, Duration, Utc},
    log::warn,
    serde::Serialize,
};

/// Profiles expiring within this window are flagged as a warning.
pub const EXPIRATION_WARNING_DAYS: i64 = 30;

fn lookup<T>(what: &str, result: Result<Option<T>, TrustStoreError>) -> Option<T> {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!("{} lookup failed; treating as not found: {}", what, e);
            None
        }
    }
}

/// Health facts for a single developer certificate.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct CertificateHealth {
    /// Unparseable, or not present in the trust store.
    pub is_missing: bool,
    /// Unparseable, or not valid yet.
    pub is_invalid: bool,
    /// Unparseable, or past its validity period.
    pub is_expired: bool,
    /// No identity with this certificate's serial number exists.
    pub is_missing_private_key: bool,
}

impl CertificateHealth {
    /// Evaluate a certificate against a trust store at a point in time.
    ///
    /// This never fails. Failing trust store lookups count as "not found."
    pub fn evaluate(
        cert: &DeveloperCertificate,
        store: &dyn TrustStore,
        now: DateTime<Utc>,
    ) -> Self {
        let (not_before, not_after, serial_number) = match (
            cert.not_valid_before(),
            cert.not_valid_after(),
            cert.serial_number(),
        ) {
            (Some(not_before), Some(not_after), Some(serial_number)) => {
                (not_before, not_after, serial_number)
            }
            _ => {
                return Self {
                    is_missing: true,
                    is_invalid: true,
                    is_expired: true,
                    is_missing_private_key: true,
                }
            }
        };

        let present = lookup(
            "certificate",
            store.find_certificate_matching(cert.raw_data()),
        )
        .is_some();
        let identity = lookup(
            "identity",
            store.find_identity_for_serial_number(serial_number),
        )
        .is_some();

        Self {
            is_missing: !present,
            is_invalid: not_before > now,
            is_expired: not_after < now,
            is_missing_private_key: !identity,
        }
    }

    /// Whether no problems were found.
    pub fn is_healthy(&self) -> bool {
        !(self.is_missing || self.is_invalid || self.is_expired || self.is_missing_private_key)
    }
}

/// A problem with a provisioning profile, in reporting priority order.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum ProfileIssue {
    ProfileExpired,
    MissingCertificate,
    InvalidCertificate,
    ExpiredCertificate,
    MissingPrivateKey,
}

impl ProfileIssue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProfileExpired => "Profile is expired",
            Self::MissingCertificate => "Missing certificate",
            Self::InvalidCertificate => "Certificate is invalid",
            Self::ExpiredCertificate => "Certificate is expired",
            Self::MissingPrivateKey => "Missing private key",
        }
    }
}

impl std::fmt::Display for ProfileIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display severity of a profile.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The profile has an issue. Rendered red.
    Error,
    /// Healthy but expiring soon. Rendered amber.
    Warning,
    Normal,
}

impl Severity {
    pub fn classify(
        profile: &ProvisioningProfile,
        issue: Option<ProfileIssue>,
        now: DateTime<Utc>,
    ) -> Self {
        if issue.is_some() {
            Self::Error
        } else if profile.expiration_date < now + Duration::days(EXPIRATION_WARNING_DAYS) {
            Self::Warning
        } else {
            Self::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Normal => "normal",
        }
    }
}

/// Health facts for a whole profile.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProfileHealth {
    pub is_missing_certificate: bool,
    pub is_invalid_certificate: bool,
    pub is_expired_certificate: bool,
    pub is_missing_private_key: bool,
    /// Per-certificate results, in the profile's certificate order.
    pub certificates: Vec<CertificateHealth>,
}

impl ProfileHealth {
    /// Evaluate every certificate in a profile and fold the results.
    pub fn evaluate(
        profile: &ProvisioningProfile,
        store: &dyn TrustStore,
        now: DateTime<Utc>,
    ) -> Self {
        Self::from_certificates(
            profile
                .certificates
                .iter()
                .map(|cert| CertificateHealth::evaluate(cert, store, now))
                .collect(),
        )
    }

    /// Fold per-certificate results into profile flags.
    ///
    /// Each flag is true unless at least one certificate clears it. An empty
    /// list therefore sets every flag.
    pub fn from_certificates(certificates: Vec<CertificateHealth>) -> Self {
        Self {
            is_missing_certificate: certificates.iter().all(|c| c.is_missing),
            is_invalid_certificate: certificates.iter().all(|c| c.is_invalid),
            is_expired_certificate: certificates.iter().all(|c| c.is_expired),
            is_missing_private_key: certificates.iter().all(|c| c.is_missing_private_key),
            certificates,
        }
    }

    /// The highest priority issue with the profile, if any.
    pub fn issue(&self, profile: &ProvisioningProfile, now: DateTime<Utc>) -> Option<ProfileIssue> {
        if profile.is_expired(now) {
            Some(ProfileIssue::ProfileExpired)
        } else if self.is_missing_certificate {
            Some(ProfileIssue::MissingCertificate)
        } else if self.is_invalid_certificate {
            Some(ProfileIssue::InvalidCertificate)
        } else if self.is_expired_certificate {
            Some(ProfileIssue::ExpiredCertificate)
        } else if self.is_missing_private_key {
            Some(ProfileIssue::MissingPrivateKey)
        } else {
            None
        }
    }

    /// [Self::issue] rendered as a string. Empty when healthy.
    pub fn issues(&self, profile: &ProvisioningProfile, now: DateTime<Utc>) -> String {
        self.issue(profile, now)
            .map(|issue| issue.to_string())
            .unwrap_or_default()
    }

    pub fn severity(&self, profile: &ProvisioningProfile, now: DateTime<Utc>) -> Severity {
        Severity::classify(profile, self.issue(profile, now), now)
    }
}
