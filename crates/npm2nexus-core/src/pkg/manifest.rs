//! The metadata manifest handed from the download phase to the upload phase.
//!
//! A pretty-printed JSON array of [`FetchResult`]. Field names match the
//! `meta-info.json` files produced by earlier migration scripts, so existing
//! manifests can be uploaded unchanged.

use super::spec::{split_scope, PackageDescriptor};
use npm2nexus_util::hash::Sha512Digest;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Manifest error codes.
pub mod codes {
    pub const MANIFEST_NOT_FOUND: &str = "MANIFEST_NOT_FOUND";
    pub const MANIFEST_INVALID_JSON: &str = "MANIFEST_INVALID_JSON";
    pub const MANIFEST_WRITE_FAILED: &str = "MANIFEST_WRITE_FAILED";
}

/// A verified, locally stored package archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResult {
    /// Scope without `@`; empty for unscoped packages.
    pub group: String,
    /// Unscoped package name.
    pub name: String,
    pub version: String,
    /// `name-version`, the file-name stem Nexus search results carry.
    #[serde(rename = "nexus_search_name")]
    pub search_key: String,
    /// URL the archive was (or would have been) downloaded from.
    pub download_url: String,
    /// Absolute path of the verified archive.
    pub local_path: PathBuf,
    /// Lowercase hex SHA-512, the form Nexus reports.
    pub sha512_hex: String,
}

impl FetchResult {
    /// Build the record for a descriptor whose archive has been verified.
    #[must_use]
    pub fn verified(
        descriptor: &PackageDescriptor,
        download_url: impl Into<String>,
        local_path: impl Into<PathBuf>,
        digest: &Sha512Digest,
    ) -> Self {
        let (group, name) = split_scope(&descriptor.name);
        Self {
            group: group.to_string(),
            name: name.to_string(),
            version: descriptor.version.clone(),
            search_key: format!("{name}-{}", descriptor.version),
            download_url: download_url.into(),
            local_path: local_path.into(),
            sha512_hex: digest.to_hex(),
        }
    }

    /// npm-style identity: `@group/name@version` or `name@version`.
    #[must_use]
    pub fn id(&self) -> String {
        if self.group.is_empty() {
            format!("{}@{}", self.name, self.version)
        } else {
            format!("@{}/{}@{}", self.group, self.name, self.version)
        }
    }
}

/// Manifest error.
#[derive(Debug)]
pub struct ManifestError {
    code: &'static str,
    message: String,
}

impl ManifestError {
    /// Create a new error.
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Get the error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Get the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ManifestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ManifestError {}

/// Write the manifest atomically.
///
/// # Errors
/// Returns an error if the manifest cannot be serialized or written.
pub fn write_manifest(path: &Path, results: &[FetchResult]) -> Result<(), ManifestError> {
    let content = serde_json::to_string_pretty(results).map_err(|e| {
        ManifestError::new(
            codes::MANIFEST_WRITE_FAILED,
            format!("Failed to serialize manifest: {e}"),
        )
    })?;

    npm2nexus_util::fs::atomic_write(path, content.as_bytes()).map_err(|e| {
        ManifestError::new(
            codes::MANIFEST_WRITE_FAILED,
            format!("Failed to write manifest {}: {e}", path.display()),
        )
    })
}

/// Read a manifest.
///
/// # Errors
/// Returns an error if the file is missing or not a valid manifest.
pub fn read_manifest(path: &Path) -> Result<Vec<FetchResult>, ManifestError> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            ManifestError::new(
                codes::MANIFEST_NOT_FOUND,
                format!(
                    "Manifest not found: {} (run the download phase first)",
                    path.display()
                ),
            )
        } else {
            ManifestError::new(
                codes::MANIFEST_INVALID_JSON,
                format!("Failed to read manifest: {e}"),
            )
        }
    })?;

    serde_json::from_str(&content).map_err(|e| {
        ManifestError::new(
            codes::MANIFEST_INVALID_JSON,
            format!("Invalid manifest {}: {e}", path.display()),
        )
    })
}
