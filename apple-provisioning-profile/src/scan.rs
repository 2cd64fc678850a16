// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Finding and decoding provisioning profiles on disk.

use {
    crate::{error::AppleProfileError, profile::ProvisioningProfile},
    log::{debug, warn},
    std::path::{Path, PathBuf},
    walkdir::DirEntry,
};

/// File extensions used by provisioning profiles.
///
/// iOS family profiles use `mobileprovision`. macOS profiles use
/// `provisionprofile`.
pub const PROFILE_EXTENSIONS: &[&str] = &["mobileprovision", "provisionprofile"];

/// The directory where Xcode installs provisioning profiles for the current user.
pub fn default_profiles_directory() -> Option<PathBuf> {
    dirs::home_dir().map(|home| {
        home.join("Library")
            .join("MobileDevice")
            .join("Provisioning Profiles")
    })
}

/// Whether a path has a provisioning profile file extension.
pub fn is_profile_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            PROFILE_EXTENSIONS
                .iter()
                .any(|candidate| ext.eq_ignore_ascii_case(candidate))
        })
        .unwrap_or(false)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// The result of scanning a directory for provisioning profiles.
#[derive(Debug, Default)]
pub struct ScanResults {
    /// Successfully decoded profiles and the files they came from.
    pub profiles: Vec<(PathBuf, ProvisioningProfile)>,
    /// Files that looked like profiles but could not be loaded.
    pub failures: Vec<(PathBuf, AppleProfileError)>,
}

impl ScanResults {
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty() && self.failures.is_empty()
    }
}

/// Decode every provisioning profile under a directory.
///
/// The directory is walked recursively in file name order. Hidden files and
/// directories are skipped, as are files without a profile extension. A file
/// that fails to decode is recorded in [ScanResults::failures] and does not
/// stop the scan. Only failing to read `dir` itself is an error.
pub fn scan_directory(dir: impl AsRef<Path>) -> Result<ScanResults, AppleProfileError> {
    let dir = dir.as_ref();

    // Surface a missing or unreadable root as an error rather than an empty scan.
    std::fs::read_dir(dir)?;

    let mut results = ScanResults::default();

    let walker = walkdir::WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e
                    .path()
                    .map(|p| p.to_path_buf())
                    .unwrap_or_else(|| dir.to_path_buf());
                warn!("error walking {}: {}", path.display(), e);
                results.failures.push((path, e.into()));
                continue;
            }
        };

        if !entry.file_type().is_file() || !is_profile_path(entry.path()) {
            continue;
        }

        let path = entry.into_path();

        match ProvisioningProfile::from_path(&path) {
            Ok(profile) => {
                debug!("loaded {} from {}", profile.uuid, path.display());
                results.profiles.push((path, profile));
            }
            Err(e) => {
                warn!("unable to load {}: {}", path.display(), e);
                results.failures.push((path, e));
            }
        }
    }

    Ok(results)
}
