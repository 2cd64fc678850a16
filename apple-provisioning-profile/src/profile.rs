// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoding of provisioning profile files.
//!
//! A provisioning profile (`.mobileprovision` / `.provisionprofile`) is a
//! Cryptographic Message Syntax (RFC 5652) `SignedData` structure whose
//! encapsulated content is a property list. The property list dictionary
//! holds the profile's metadata, its entitlements, and the DER encoded
//! developer certificates that are allowed to sign code under the profile.
//!
//! Decoding deliberately does not require the CMS signature to verify.
//! Profiles with broken signatures or certificates are still worth looking
//! at, so the outcome of signature verification is recorded as data on the
//! decoded [ProvisioningProfile] instead of failing the decode.

use {
    crate::{
        certificate::DeveloperCertificate,
        error::{AppleProfileError, ProfileDecodeError},
    },
    chrono::{DateTime, Utc},
    cryptographic_message_syntax::SignedData,
    log::{debug, warn},
    plist::{Dictionary, Value},
    std::{path::Path, time::SystemTime},
};

const KEY_APP_ID_NAME: &str = "AppIDName";
const KEY_APPLICATION_IDENTIFIER_PREFIX: &str = "ApplicationIdentifierPrefix";
const KEY_CREATION_DATE: &str = "CreationDate";
const KEY_DEVELOPER_CERTIFICATES: &str = "DeveloperCertificates";
const KEY_ENTITLEMENTS: &str = "Entitlements";
const KEY_EXPIRATION_DATE: &str = "ExpirationDate";
const KEY_IS_XCODE_MANAGED: &str = "IsXcodeManaged";
const KEY_NAME: &str = "Name";
const KEY_PLATFORM: &str = "Platform";
const KEY_PROVISIONED_DEVICES: &str = "ProvisionedDevices";
const KEY_PROVISIONS_ALL_DEVICES: &str = "ProvisionsAllDevices";
const KEY_TEAM_IDENTIFIER: &str = "TeamIdentifier";
const KEY_TEAM_NAME: &str = "TeamName";
const KEY_TIME_TO_LIVE: &str = "TimeToLive";
const KEY_UUID: &str = "UUID";
const KEY_VERSION: &str = "Version";

/// Outcome of verifying the CMS signature wrapping a profile.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SignatureStatus {
    /// Every signer's signature and message digest verified.
    Verified,
    /// The message has no signers.
    Unsigned,
    /// Verification failed. Holds the first failure encountered.
    Invalid(String),
}

impl std::fmt::Display for SignatureStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Verified => f.write_str("verified"),
            Self::Unsigned => f.write_str("unsigned"),
            Self::Invalid(reason) => f.write_fmt(format_args!("invalid ({})", reason)),
        }
    }
}

/// A decoded provisioning profile.
///
/// Instances are immutable snapshots of a profile file at decode time.
/// Certificate health is not stored here because it depends on the time of
/// evaluation and on the contents of the local trust store. See
/// [crate::ProfileHealth].
#[derive(Clone, Debug, PartialEq)]
pub struct ProvisioningProfile {
    pub uuid: String,
    pub name: String,
    pub team_name: String,
    /// Empty if the payload does not define `AppIDName`.
    pub app_id_name: String,
    pub creation_date: DateTime<Utc>,
    /// Not validated against `creation_date`.
    pub expiration_date: DateTime<Utc>,
    pub platforms: Vec<String>,
    /// `None` for profiles that aren't scoped to devices.
    ///
    /// This is distinct from `Some(vec![])`, which is a device scoped profile
    /// with zero devices.
    pub provisioned_devices: Option<Vec<String>>,
    pub team_identifiers: Vec<String>,
    /// Days.
    pub time_to_live: i64,
    pub version: i64,
    /// Developer certificates in payload order.
    pub certificates: Vec<DeveloperCertificate>,
    pub application_identifier_prefixes: Vec<String>,
    pub entitlements: Dictionary,
    pub is_xcode_managed: bool,
    pub provisions_all_devices: bool,
    pub signature: SignatureStatus,
}

impl ProvisioningProfile {
    /// Decode a provisioning profile from the raw content of a profile file.
    ///
    /// Fails only on structural problems: the data isn't a CMS signed
    /// message, the content isn't a property list dictionary, or a required
    /// key is missing. Bad certificates never cause failure.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ProfileDecodeError> {
        let signed_data =
            SignedData::parse_ber(data).map_err(ProfileDecodeError::CorruptEnvelope)?;

        let content = signed_data
            .signed_content()
            .ok_or(ProfileDecodeError::EnvelopeMissingContent)?;

        let signature = verify_envelope(&signed_data);
        debug!("profile signature status: {}", signature);

        // This handles both XML and binary property lists.
        let value = Value::from_reader(std::io::Cursor::new(content))
            .map_err(ProfileDecodeError::MalformedPayload)?;

        let dict = value
            .into_dictionary()
            .ok_or(ProfileDecodeError::PayloadNotDictionary)?;

        Self::from_dictionary(&dict, signature)
    }

    /// Read and decode a profile file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, AppleProfileError> {
        let path = path.as_ref();
        debug!("reading provisioning profile {}", path.display());
        let data = std::fs::read(path)?;

        Ok(Self::from_bytes(&data)?)
    }

    /// Map a payload dictionary to a profile.
    pub fn from_dictionary(
        dict: &Dictionary,
        signature: SignatureStatus,
    ) -> Result<Self, ProfileDecodeError> {
        let uuid = required_string(dict, KEY_UUID)?;
        let name = required_string(dict, KEY_NAME)?;
        let team_name = required_string(dict, KEY_TEAM_NAME)?;
        let creation_date = required_date(dict, KEY_CREATION_DATE)?;
        let expiration_date = required_date(dict, KEY_EXPIRATION_DATE)?;

        let certificates = developer_certificates(dict);
        debug!(
            "profile {} embeds {} developer certificates",
            uuid,
            certificates.len()
        );

        Ok(Self {
            uuid,
            name,
            team_name,
            app_id_name: optional_string(dict, KEY_APP_ID_NAME).unwrap_or_default(),
            creation_date,
            expiration_date,
            platforms: optional_string_array(dict, KEY_PLATFORM).unwrap_or_default(),
            provisioned_devices: optional_string_array(dict, KEY_PROVISIONED_DEVICES),
            team_identifiers: optional_string_array(dict, KEY_TEAM_IDENTIFIER)
                .unwrap_or_default(),
            time_to_live: optional_integer(dict, KEY_TIME_TO_LIVE).unwrap_or_default(),
            version: optional_integer(dict, KEY_VERSION).unwrap_or_default(),
            certificates,
            application_identifier_prefixes: optional_string_array(
                dict,
                KEY_APPLICATION_IDENTIFIER_PREFIX,
            )
            .unwrap_or_default(),
            entitlements: optional_dictionary(dict, KEY_ENTITLEMENTS).unwrap_or_default(),
            is_xcode_managed: optional_bool(dict, KEY_IS_XCODE_MANAGED).unwrap_or_default(),
            provisions_all_devices: optional_bool(dict, KEY_PROVISIONS_ALL_DEVICES)
                .unwrap_or_default(),
            signature,
        })
    }

    /// Whether the profile itself has expired as of `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration_date < now
    }

    /// The expiration date formatted as `YYYY-MM-DD`.
    pub fn expiration_date_string(&self) -> String {
        self.expiration_date.format("%Y-%m-%d").to_string()
    }

    /// The `application-identifier` entitlement, if present.
    pub fn application_identifier(&self) -> Option<&str> {
        self.entitlements
            .get("application-identifier")
            .and_then(Value::as_string)
    }
}

fn verify_envelope(signed_data: &SignedData) -> SignatureStatus {
    let mut seen_signer = false;

    for signer in signed_data.signers() {
        seen_signer = true;

        if let Err(e) = signer.verify_signature_with_signed_data(signed_data) {
            return SignatureStatus::Invalid(format!("{}", e));
        }
        if let Err(e) = signer.verify_message_digest_with_signed_data(signed_data) {
            return SignatureStatus::Invalid(format!("{}", e));
        }
    }

    if seen_signer {
        SignatureStatus::Verified
    } else {
        SignatureStatus::Unsigned
    }
}

fn required_string(dict: &Dictionary, key: &'static str) -> Result<String, ProfileDecodeError> {
    dict.get(key)
        .and_then(Value::as_string)
        .map(|s| s.to_string())
        .ok_or(ProfileDecodeError::MissingField(key))
}

fn required_date(
    dict: &Dictionary,
    key: &'static str,
) -> Result<DateTime<Utc>, ProfileDecodeError> {
    dict.get(key)
        .and_then(Value::as_date)
        .map(|date| DateTime::<Utc>::from(SystemTime::from(date)))
        .ok_or(ProfileDecodeError::MissingField(key))
}

fn mistyped(key: &str, expected: &str) {
    warn!(
        "ignoring profile key {}: expected {}; using default value",
        key, expected
    );
}

fn optional_string(dict: &Dictionary, key: &str) -> Option<String> {
    let value = dict.get(key)?;

    if let Some(s) = value.as_string() {
        Some(s.to_string())
    } else {
        mistyped(key, "string");
        None
    }
}

fn optional_string_array(dict: &Dictionary, key: &str) -> Option<Vec<String>> {
    let value = dict.get(key)?;

    if let Some(items) = value.as_array() {
        Some(
            items
                .iter()
                .filter_map(|item| {
                    let s = item.as_string();
                    if s.is_none() {
                        warn!("ignoring non-string entry in profile key {}", key);
                    }
                    s.map(|s| s.to_string())
                })
                .collect(),
        )
    } else {
        mistyped(key, "array");
        None
    }
}

fn optional_integer(dict: &Dictionary, key: &str) -> Option<i64> {
    let value = dict.get(key)?;

    if let Some(v) = value.as_signed_integer() {
        Some(v)
    } else {
        mistyped(key, "integer");
        None
    }
}

fn optional_bool(dict: &Dictionary, key: &str) -> Option<bool> {
    let value = dict.get(key)?;

    if let Some(v) = value.as_boolean() {
        Some(v)
    } else {
        mistyped(key, "boolean");
        None
    }
}

fn optional_dictionary(dict: &Dictionary, key: &str) -> Option<Dictionary> {
    let value = dict.get(key)?;

    if let Some(v) = value.as_dictionary() {
        Some(v.clone())
    } else {
        mistyped(key, "dictionary");
        None
    }
}

fn developer_certificates(dict: &Dictionary) -> Vec<DeveloperCertificate> {
    match dict.get(KEY_DEVELOPER_CERTIFICATES) {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::Data(data) => DeveloperCertificate::from_der(data.clone()),
                _ => {
                    warn!("developer certificate entry is not data; treating as empty");
                    DeveloperCertificate::from_der(vec![])
                }
            })
            .collect(),
        Some(_) => {
            mistyped(KEY_DEVELOPER_CERTIFICATES, "array");
            vec![]
        }
        None => vec![],
    }
}
