// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Apple provisioning profile inspection.
//!
//! This crate decodes Apple provisioning profiles (`.mobileprovision` and
//! `.provisionprofile` files) and evaluates the health of the developer
//! certificates embedded in them.
//!
//! # Decoding
//!
//! [ProvisioningProfile::from_bytes] unwraps the CMS signed message a profile
//! is distributed as, parses the property list it contains, and produces a
//! typed [ProvisioningProfile]. Only structural problems fail decoding. A
//! profile whose certificates are garbage still decodes.
//!
//! # Health
//!
//! Whether a profile is usable depends on the current time and on what the
//! host knows about: is each developer certificate installed, and is its
//! private key available? [ProfileHealth::evaluate] answers these questions
//! against a [TrustStore] and reports the single most important problem
//! via [ProfileHealth::issue].
//!
//! [MemoryTrustStore] is a [TrustStore] that can be populated from PEM files.
//! On macOS, `keychain_trust_store()` snapshots a keychain into one.
//!
//! # Scanning
//!
//! [scan_directory] decodes every profile in a directory, by default
//! [default_profiles_directory], collecting per-file failures as it goes.

pub mod certificate;
pub use certificate::DeveloperCertificate;
pub mod error;
pub use error::{AppleProfileError, ProfileDecodeError, TrustStoreError};
pub mod health;
pub use health::{CertificateHealth, ProfileHealth, ProfileIssue, Severity};
#[cfg(target_os = "macos")]
pub mod macos;
#[cfg(target_os = "macos")]
pub use macos::{keychain_trust_store, KeychainDomain};
pub mod profile;
pub use profile::{ProvisioningProfile, SignatureStatus};
pub mod report;
pub use report::{CertificateReport, ProfileReport};
pub mod scan;
pub use scan::{default_profiles_directory, scan_directory, ScanResults};
#[cfg(test)]
mod testutil;
pub mod trust_store;
pub use trust_store::{CertificateInfo, Identity, MemoryTrustStore, TrustStore};
