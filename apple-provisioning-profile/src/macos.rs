// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Functionality that only works on macOS.

use {
    crate::{error::AppleProfileError, trust_store::MemoryTrustStore},
    log::{debug, warn},
    security_framework::{
        item::{ItemClass, ItemSearchOptions, Reference, SearchResult},
        os::macos::{
            item::ItemSearchOptionsExt,
            keychain::{SecKeychain, SecPreferencesDomain},
        },
    },
    x509_certificate::CapturedX509Certificate,
};

/// A wrapper around [SecPreferencesDomain] so we can use crate local types.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeychainDomain {
    User,
    System,
    Common,
    Dynamic,
}

impl From<KeychainDomain> for SecPreferencesDomain {
    fn from(v: KeychainDomain) -> Self {
        match v {
            KeychainDomain::User => Self::User,
            KeychainDomain::System => Self::System,
            KeychainDomain::Common => Self::Common,
            KeychainDomain::Dynamic => Self::Dynamic,
        }
    }
}

impl TryFrom<&str> for KeychainDomain {
    type Error = String;

    fn try_from(v: &str) -> Result<Self, Self::Error> {
        match v {
            "user" => Ok(Self::User),
            "system" => Ok(Self::System),
            "common" => Ok(Self::Common),
            "dynamic" => Ok(Self::Dynamic),
            _ => Err(format!(
                "{} is not a valid keychain domain; use user, system, common, or dynamic",
                v
            )),
        }
    }
}

fn search_keychain(
    keychain: &SecKeychain,
    class: ItemClass,
) -> Result<Vec<Reference>, AppleProfileError> {
    let mut search = ItemSearchOptions::default();
    search.keychains(&[keychain.clone()]);
    search.class(class);
    search.limit(i32::MAX as i64);

    let mut references = vec![];

    for item in search.search()? {
        match item {
            SearchResult::Ref(reference) => references.push(reference),
            _ => {
                return Err(AppleProfileError::KeychainError(
                    "non-reference result from keychain search (this should not happen)"
                        .to_string(),
                ));
            }
        }
    }

    Ok(references)
}

/// Snapshot the certificates and signing identities in a macOS keychain.
///
/// The keychain for `domain` is searched once and its contents captured in a
/// [MemoryTrustStore]. Certificates that can't be parsed are skipped.
pub fn keychain_trust_store(
    domain: KeychainDomain,
    password: Option<&str>,
) -> Result<MemoryTrustStore, AppleProfileError> {
    let mut keychain = SecKeychain::default_for_domain(domain.into())?;
    if password.is_some() {
        keychain.unlock(password)?;
    }

    let mut store = MemoryTrustStore::default();

    for reference in search_keychain(&keychain, ItemClass::certificate())? {
        match reference {
            Reference::Certificate(cert) => {
                match CapturedX509Certificate::from_der(cert.to_der()) {
                    Ok(captured) => store.add_certificate(captured),
                    Err(e) => warn!("ignoring unparseable keychain certificate: {}", e),
                }
            }
            _ => {
                return Err(AppleProfileError::KeychainError(
                    "non-certificate reference from keychain search (this should not happen)"
                        .to_string(),
                ));
            }
        }
    }

    for reference in search_keychain(&keychain, ItemClass::identity())? {
        match reference {
            Reference::Identity(identity) => {
                let cert = identity.certificate()?;
                match CapturedX509Certificate::from_der(cert.to_der()) {
                    Ok(captured) => store.add_identity(captured, Some(cert.subject_summary())),
                    Err(e) => warn!("ignoring unparseable keychain identity: {}", e),
                }
            }
            _ => {
                return Err(AppleProfileError::KeychainError(
                    "non-identity reference from keychain search (this should not happen)"
                        .to_string(),
                ));
            }
        }
    }

    debug!(
        "keychain {:?} has {} certificates and {} identities",
        domain,
        store.certificates().len(),
        store.identities().len()
    );

    Ok(store)
}
