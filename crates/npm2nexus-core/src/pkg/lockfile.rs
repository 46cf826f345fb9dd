//! npm `package-lock.json` reader.
//!
//! Only lockfile versions 2 and 3 carry the flat `packages` map this reader
//! relies on:
//!
//! ```json
//! {
//!   "lockfileVersion": 3,
//!   "packages": {
//!     "": { "name": "app", "version": "1.0.0" },
//!     "node_modules/@types/node": {
//!       "version": "20.1.0",
//!       "resolved": "https://registry.npmjs.org/@types/node/-/node-20.1.0.tgz",
//!       "integrity": "sha512-..."
//!     }
//!   }
//! }
//! ```

use super::spec::PackageDescriptor;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Path segment that precedes every installed package name.
pub const INSTALL_ROOT_MARKER: &str = "node_modules/";

/// Prefix of the SHA-512 token in an `integrity` field.
pub const SHA512_PREFIX: &str = "sha512-";

/// Lockfile error codes.
pub mod codes {
    /// Lockfile not found at the expected path.
    pub const PKG_LOCK_NOT_FOUND: &str = "PKG_LOCK_NOT_FOUND";
    /// Lockfile has invalid JSON.
    pub const PKG_LOCK_INVALID_JSON: &str = "PKG_LOCK_INVALID_JSON";
    /// The `packages` map is missing or empty (v1 lockfile or empty project).
    pub const PKG_LOCK_NO_PACKAGES: &str = "PKG_LOCK_NO_PACKAGES";
}

/// Raw `package-lock.json` document.
///
/// Entries stay untyped so one malformed entry is skipped on its own
/// instead of failing the whole document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NpmLockfile {
    #[serde(default)]
    lockfile_version: Option<Value>,
    #[serde(default)]
    packages: Option<BTreeMap<String, Value>>,
}

/// Lockfile error.
#[derive(Debug)]
pub struct LockfileError {
    code: &'static str,
    message: String,
}

impl LockfileError {
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

impl fmt::Display for LockfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for LockfileError {}

/// Parse a lockfile into descriptors, logging and returning an empty list on
/// any document-level failure.
#[must_use]
pub fn parse(path: &Path) -> Vec<PackageDescriptor> {
    match read_descriptors(path) {
        Ok(descriptors) => {
            info!(
                lockfile = %path.display(),
                count = descriptors.len(),
                "Parsed lockfile"
            );
            descriptors
        }
        Err(e) => {
            error!(lockfile = %path.display(), code = e.code(), "{}", e.message());
            Vec::new()
        }
    }
}

/// Read a lockfile into descriptors.
///
/// Invalid entries are skipped with a warning; only document-level problems
/// are errors.
///
/// # Errors
/// Returns an error if the file is missing, is not valid JSON, or has no
/// `packages` map.
pub fn read_descriptors(path: &Path) -> Result<Vec<PackageDescriptor>, LockfileError> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            LockfileError::new(
                codes::PKG_LOCK_NOT_FOUND,
                format!("Lockfile not found: {}", path.display()),
            )
        } else {
            LockfileError::new(
                codes::PKG_LOCK_INVALID_JSON,
                format!("Failed to read lockfile: {e}"),
            )
        }
    })?;

    descriptors_from_json(&content)
}

/// Parse lockfile JSON text into descriptors.
///
/// # Errors
/// Returns an error if the JSON is invalid or has no `packages` map.
pub fn descriptors_from_json(json: &str) -> Result<Vec<PackageDescriptor>, LockfileError> {
    let lockfile: NpmLockfile = serde_json::from_str(json).map_err(|e| {
        LockfileError::new(
            codes::PKG_LOCK_INVALID_JSON,
            format!("Invalid lockfile JSON: {e}"),
        )
    })?;

    let packages = match lockfile.packages {
        Some(p) if !p.is_empty() => p,
        _ => {
            let hint = match lockfile.lockfile_version.as_ref().and_then(Value::as_u64) {
                Some(1) => " (lockfileVersion 1 is not supported; regenerate with npm 7+)",
                _ => "",
            };
            return Err(LockfileError::new(
                codes::PKG_LOCK_NO_PACKAGES,
                format!("Lockfile has no \"packages\" entries{hint}"),
            ));
        }
    };

    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut descriptors = Vec::new();

    for (install_path, entry) in &packages {
        // Root project
        if install_path.is_empty() {
            continue;
        }

        let Some(descriptor) = descriptor_from_entry(install_path, entry) else {
            continue;
        };

        if !seen.insert((descriptor.name.clone(), descriptor.version.clone())) {
            debug!(path = %install_path, package = %descriptor.id(), "Duplicate install path, already queued");
            continue;
        }

        descriptors.push(descriptor);
    }

    Ok(descriptors)
}

fn descriptor_from_entry(install_path: &str, entry: &Value) -> Option<PackageDescriptor> {
    let name = package_name_from_path(install_path);
    let resolved = string_field(entry, "resolved");
    let integrity = string_field(entry, "integrity");
    let version = string_field(entry, "version");

    let (Some(resolved), Some(integrity), Some(version)) = (resolved, integrity, version) else {
        warn!(path = %install_path, "Skipping lockfile entry without resolved, integrity or version");
        return None;
    };
    if name.is_empty() {
        warn!(path = %install_path, "Skipping lockfile entry without a package name");
        return None;
    }

    let Some(sha512) = sha512_token(integrity) else {
        warn!(package = %format!("{name}@{version}"), "No sha512 integrity token, skipping");
        return None;
    };

    Some(PackageDescriptor::new(name, version, resolved, sha512))
}

/// Package name from an install path: everything after the last
/// `node_modules/` (`node_modules/a/node_modules/@s/b` -> `@s/b`).
#[must_use]
pub fn package_name_from_path(install_path: &str) -> &str {
    install_path
        .rsplit_once(INSTALL_ROOT_MARKER)
        .map_or(install_path, |(_, name)| name)
}

/// The base64 payload of the `sha512-` token in an integrity field.
#[must_use]
pub fn sha512_token(integrity: &str) -> Option<&str> {
    integrity
        .split_whitespace()
        .find_map(|token| token.strip_prefix(SHA512_PREFIX))
        .filter(|digest| !digest.is_empty())
}

/// A non-blank string field of an entry. Other JSON types count as absent.
fn string_field<'a>(entry: &'a Value, key: &str) -> Option<&'a str> {
    entry
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SCOPED_LOCK: &str = r#"{
        "name": "app",
        "lockfileVersion": 3,
        "packages": {
            "": { "name": "app", "version": "1.0.0" },
            "node_modules/@scope/pkg": {
                "version": "1.2.3",
                "resolved": "https://registry.npmjs.org/@scope/pkg/-/pkg-1.2.3.tgz",
                "integrity": "sha512-AAAA"
            }
        }
    }"#;

    #[test]
    fn test_scoped_package() {
        let descriptors = descriptors_from_json(SCOPED_LOCK).unwrap();
        assert_eq!(descriptors.len(), 1);
        let d = &descriptors[0];
        assert_eq!(d.name, "@scope/pkg");
        assert_eq!(d.version, "1.2.3");
        assert_eq!(
            d.resolved,
            "https://registry.npmjs.org/@scope/pkg/-/pkg-1.2.3.tgz"
        );
        assert_eq!(d.sha512, "AAAA");
    }

    #[test]
    fn test_nested_install_path_uses_last_marker() {
        assert_eq!(
            package_name_from_path("node_modules/a/node_modules/@s/b"),
            "@s/b"
        );
        assert_eq!(package_name_from_path("node_modules/react"), "react");
        assert_eq!(package_name_from_path("packages/local"), "packages/local");
    }

    #[test]
    fn test_sha512_token_picks_sha512_only() {
        assert_eq!(sha512_token("sha1-xyz= sha512-abc=="), Some("abc=="));
        assert_eq!(sha512_token("sha512-abc== sha1-xyz="), Some("abc=="));
        assert_eq!(sha512_token("sha1-xyz="), None);
        assert_eq!(sha512_token("sha512-"), None);
    }

    #[test]
    fn test_invalid_entries_are_skipped() {
        let json = r#"{
            "lockfileVersion": 3,
            "packages": {
                "": {},
                "node_modules/no-integrity": { "version": "1.0.0", "resolved": "https://r/a.tgz" },
                "node_modules/no-resolved": { "version": "1.0.0", "integrity": "sha512-AA==" },
                "node_modules/no-version": { "resolved": "https://r/a.tgz", "integrity": "sha512-AA==" },
                "node_modules/sha1-only": { "version": "1.0.0", "resolved": "https://r/a.tgz", "integrity": "sha1-AA==" },
                "node_modules/empty-version": { "version": "", "resolved": "https://r/a.tgz", "integrity": "sha512-AA==" },
                "node_modules/linked": { "resolved": "packages/linked", "link": true },
                "node_modules/good": { "version": "2.0.0", "resolved": "https://r/good-2.0.0.tgz", "integrity": "sha512-BB==" }
            }
        }"#;

        let descriptors = descriptors_from_json(json).unwrap();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].name, "good");
    }

    #[test]
    fn test_mistyped_entries_are_skipped_alone() {
        let json = r#"{
            "lockfileVersion": 3,
            "packages": {
                "node_modules/numeric-version": { "version": 1, "resolved": "https://r/a.tgz", "integrity": "sha512-AA==" },
                "node_modules/object-resolved": { "version": "1.0.0", "resolved": { "url": "https://r/a.tgz" }, "integrity": "sha512-AA==" },
                "node_modules/null-integrity": { "version": "1.0.0", "resolved": "https://r/a.tgz", "integrity": null },
                "node_modules/not-an-object": "1.0.0",
                "node_modules/good": { "version": "2.0.0", "resolved": "https://r/good-2.0.0.tgz", "integrity": "sha512-BB==" }
            }
        }"#;

        let descriptors = descriptors_from_json(json).unwrap();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].id(), "good@2.0.0");
    }

    #[test]
    fn test_duplicate_name_version_emitted_once() {
        let json = r#"{
            "lockfileVersion": 3,
            "packages": {
                "node_modules/a/node_modules/ms": { "version": "2.1.3", "resolved": "https://r/ms-2.1.3.tgz", "integrity": "sha512-CC==" },
                "node_modules/b/node_modules/ms": { "version": "2.1.3", "resolved": "https://r/ms-2.1.3.tgz", "integrity": "sha512-CC==" },
                "node_modules/ms": { "version": "2.0.0", "resolved": "https://r/ms-2.0.0.tgz", "integrity": "sha512-DD==" }
            }
        }"#;

        let descriptors = descriptors_from_json(json).unwrap();
        assert_eq!(descriptors.len(), 2);
        let versions: Vec<&str> = descriptors.iter().map(|d| d.version.as_str()).collect();
        assert!(versions.contains(&"2.1.3"));
        assert!(versions.contains(&"2.0.0"));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = read_descriptors(&dir.path().join("package-lock.json")).unwrap_err();
        assert_eq!(err.code(), codes::PKG_LOCK_NOT_FOUND);
        assert!(parse(&dir.path().join("package-lock.json")).is_empty());
    }

    #[test]
    fn test_invalid_json() {
        let err = descriptors_from_json("{ not json").unwrap_err();
        assert_eq!(err.code(), codes::PKG_LOCK_INVALID_JSON);
    }

    #[test]
    fn test_missing_packages_field() {
        let err = descriptors_from_json(r#"{"lockfileVersion": 1, "dependencies": {}}"#)
            .unwrap_err();
        assert_eq!(err.code(), codes::PKG_LOCK_NO_PACKAGES);
        assert!(err.message().contains("lockfileVersion 1"));
    }

    #[test]
    fn test_empty_packages_field() {
        let err = descriptors_from_json(r#"{"lockfileVersion": 3, "packages": {}}"#).unwrap_err();
        assert_eq!(err.code(), codes::PKG_LOCK_NO_PACKAGES);
    }

    #[test]
    fn test_parse_reads_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("package-lock.json");
        fs::write(&path, SCOPED_LOCK).unwrap();

        let descriptors = parse(&path);
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].id(), "@scope/pkg@1.2.3");
    }
}
