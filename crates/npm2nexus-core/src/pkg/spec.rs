//! Package descriptors and npm name handling.
//!
//! npm names are either bare (`react`) or scoped (`@types/node`). Scoped
//! names map onto Nexus as group `types` and name `node`, and onto the
//! registry tarball layout as `@types/node/-/node-<version>.tgz`.

/// A package version to migrate, as pinned by the lockfile.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageDescriptor {
    /// Full package name (e.g., "@scope/name" or "name").
    pub name: String,
    /// Exact resolved version.
    pub version: String,
    /// Tarball URL recorded by npm.
    pub resolved: String,
    /// Base64 SHA-512 digest from the `integrity` field.
    pub sha512: String,
}

impl PackageDescriptor {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        resolved: impl Into<String>,
        sha512: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            resolved: resolved.into(),
            sha512: sha512.into(),
        }
    }

    /// `name@version`, used to identify the package in diagnostics.
    #[must_use]
    pub fn id(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

/// Split a package name into its group (scope without `@`) and local name.
///
/// Unscoped names have an empty group.
#[must_use]
pub fn split_scope(name: &str) -> (&str, &str) {
    match name.split_once('/') {
        Some((scope, local)) => (scope.trim_start_matches('@'), local),
        None => ("", name),
    }
}

/// The unscoped tail of a package name, used in tarball file names.
#[must_use]
pub fn tarball_basename(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// Registry tarball file name: `node-20.1.0.tgz` for `@types/node@20.1.0`.
#[must_use]
pub fn tarball_file_name(name: &str, version: &str) -> String {
    format!("{}-{version}.tgz", tarball_basename(name))
}

/// Name flattened into a single path segment: the scope marker is dropped
/// and path separators become `#` (`@scope/pkg` -> `scope#pkg`).
#[must_use]
pub fn normalized_name(name: &str) -> String {
    name.trim_start_matches('@').replace(['/', '\\'], "#")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_scope_scoped() {
        assert_eq!(split_scope("@types/node"), ("types", "node"));
    }

    #[test]
    fn test_split_scope_unscoped() {
        assert_eq!(split_scope("react"), ("", "react"));
    }

    #[test]
    fn test_split_scope_only_first_separator() {
        assert_eq!(split_scope("@scope/a/b"), ("scope", "a/b"));
    }

    #[test]
    fn test_tarball_file_name() {
        assert_eq!(tarball_file_name("@types/node", "20.1.0"), "node-20.1.0.tgz");
        assert_eq!(tarball_file_name("react", "18.2.0"), "react-18.2.0.tgz");
    }

    #[test]
    fn test_normalized_name() {
        assert_eq!(normalized_name("@scope/pkg"), "scope#pkg");
        assert_eq!(normalized_name("weird\\name"), "weird#name");
        assert_eq!(normalized_name("lodash"), "lodash");
    }

    #[test]
    fn test_descriptor_id() {
        let d = PackageDescriptor::new("@scope/pkg", "1.2.3", "https://r/x.tgz", "abc");
        assert_eq!(d.id(), "@scope/pkg@1.2.3");
    }
}
