// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Serializable summaries of profiles and their health.

use {
    crate::{
        certificate::DeveloperCertificate,
        error::AppleProfileError,
        health::{CertificateHealth, ProfileHealth, Severity},
        profile::ProvisioningProfile,
    },
    chrono::{DateTime, Utc},
    serde::Serialize,
    std::path::Path,
};

/// Describes an embedded developer certificate and its health.
#[derive(Clone, Debug, Serialize)]
pub struct CertificateReport {
    pub subject_common_name: Option<String>,
    pub issuer_common_name: Option<String>,
    pub serial_number: Option<String>,
    pub sha256_fingerprint: Option<String>,
    pub not_valid_before: Option<DateTime<Utc>>,
    pub not_valid_after: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub health: CertificateHealth,
}

impl CertificateReport {
    pub fn new(
        cert: &DeveloperCertificate,
        health: CertificateHealth,
    ) -> Result<Self, AppleProfileError> {
        Ok(Self {
            subject_common_name: cert.subject_common_name(),
            issuer_common_name: cert.issuer_common_name(),
            serial_number: cert.serial_number_hex(),
            sha256_fingerprint: cert.sha256_fingerprint()?,
            not_valid_before: cert.not_valid_before(),
            not_valid_after: cert.not_valid_after(),
            health,
        })
    }
}

/// Describes a provisioning profile and its health at a point in time.
#[derive(Clone, Debug, Serialize)]
pub struct ProfileReport {
    pub path: Option<String>,
    pub uuid: String,
    pub name: String,
    pub team_name: String,
    pub app_id_name: String,
    pub application_identifier: Option<String>,
    pub creation_date: DateTime<Utc>,
    pub expiration_date: DateTime<Utc>,
    pub platforms: Vec<String>,
    pub provisioned_devices: Option<Vec<String>>,
    pub team_identifiers: Vec<String>,
    pub time_to_live: i64,
    pub version: i64,
    pub is_xcode_managed: bool,
    pub provisions_all_devices: bool,
    pub signature: String,
    pub evaluated_at: DateTime<Utc>,
    pub is_missing_certificate: bool,
    pub is_invalid_certificate: bool,
    pub is_expired_certificate: bool,
    pub is_missing_private_key: bool,
    /// Empty when there are no issues.
    pub issues: String,
    pub severity: Severity,
    pub certificates: Vec<CertificateReport>,
}

impl ProfileReport {
    pub fn new(
        path: Option<&Path>,
        profile: &ProvisioningProfile,
        health: &ProfileHealth,
        now: DateTime<Utc>,
    ) -> Result<Self, AppleProfileError> {
        let certificates = profile
            .certificates
            .iter()
            .zip(health.certificates.iter())
            .map(|(cert, health)| CertificateReport::new(cert, *health))
            .collect::<Result<Vec<_>, AppleProfileError>>()?;

        Ok(Self {
            path: path.map(|p| p.display().to_string()),
            uuid: profile.uuid.clone(),
            name: profile.name.clone(),
            team_name: profile.team_name.clone(),
            app_id_name: profile.app_id_name.clone(),
            application_identifier: profile.application_identifier().map(|s| s.to_string()),
            creation_date: profile.creation_date,
            expiration_date: profile.expiration_date,
            platforms: profile.platforms.clone(),
            provisioned_devices: profile.provisioned_devices.clone(),
            team_identifiers: profile.team_identifiers.clone(),
            time_to_live: profile.time_to_live,
            version: profile.version,
            is_xcode_managed: profile.is_xcode_managed,
            provisions_all_devices: profile.provisions_all_devices,
            signature: profile.signature.to_string(),
            evaluated_at: now,
            is_missing_certificate: health.is_missing_certificate,
            is_invalid_certificate: health.is_invalid_certificate,
            is_expired_certificate: health.is_expired_certificate,
            is_missing_private_key: health.is_missing_private_key,
            issues: health.issues(profile, now),
            severity: health.severity(profile, now),
            certificates,
        })
    }
}
