//! Local archive cache.
//!
//! Downloaded tarballs live flat in one directory, one file per package
//! version, named `<normalized-name>-<version>.tgz`. A file that is present
//! is trusted and re-hashed instead of downloaded again.

use super::error::PkgError;
use super::spec::normalized_name;
use npm2nexus_util::hash::{sha512_file, Sha512Digest};
use std::fs;
use std::path::{Path, PathBuf};

/// Archive file extension.
pub const ARCHIVE_EXT: &str = "tgz";

/// Local archive cache manager.
#[derive(Debug, Clone)]
pub struct PackageCache {
    /// Directory holding the archives (absolute).
    root: PathBuf,
}

impl PackageCache {
    /// Create a cache rooted at `root`. Relative roots are resolved against
    /// the process working directory so recorded paths are absolute.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = if root.is_absolute() {
            root
        } else {
            std::env::current_dir().map_or(root.clone(), |cwd| cwd.join(&root))
        };
        Self { root }
    }

    /// Get the cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File name for a package version: `scope#pkg-1.2.3.tgz`.
    #[must_use]
    pub fn archive_file_name(name: &str, version: &str) -> String {
        format!("{}-{version}.{ARCHIVE_EXT}", normalized_name(name))
    }

    /// Path of the archive for a package version.
    #[must_use]
    pub fn archive_path(&self, name: &str, version: &str) -> PathBuf {
        self.root.join(Self::archive_file_name(name, version))
    }

    /// Check if a package version is already cached.
    #[must_use]
    pub fn is_cached(&self, name: &str, version: &str) -> bool {
        self.archive_path(name, version).is_file()
    }

    /// Ensure the cache directory exists.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn ensure_dirs(&self) -> Result<(), PkgError> {
        fs::create_dir_all(&self.root).map_err(|e| {
            PkgError::cache_error(format!(
                "Failed to create download directory {}: {e}",
                self.root.display()
            ))
        })
    }

    /// Hash a cached archive off the async runtime.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read.
    pub async fn hash_archive(&self, path: &Path) -> Result<Sha512Digest, PkgError> {
        let owned = path.to_path_buf();
        tokio::task::spawn_blocking(move || sha512_file(&owned))
            .await
            .map_err(|e| PkgError::cache_error(format!("Hashing task failed: {e}")))?
            .map_err(|e| {
                PkgError::cache_error(format!("Failed to read {}: {e}", path.display()))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use npm2nexus_util::hash::sha512_bytes;
    use tempfile::tempdir;

    #[test]
    fn test_archive_path_scoped() {
        let dir = tempdir().unwrap();
        let cache = PackageCache::new(dir.path());
        assert_eq!(
            cache.archive_path("@scope/pkg", "1.2.3"),
            dir.path().join("scope#pkg-1.2.3.tgz")
        );
    }

    #[test]
    fn test_archive_path_unscoped() {
        let dir = tempdir().unwrap();
        let cache = PackageCache::new(dir.path());
        assert_eq!(
            cache.archive_path("react", "18.2.0"),
            dir.path().join("react-18.2.0.tgz")
        );
    }

    #[test]
    fn test_relative_root_becomes_absolute() {
        let cache = PackageCache::new("npm_tgz");
        assert!(cache.root().is_absolute());
    }

    #[test]
    fn test_ensure_dirs_and_is_cached() {
        let dir = tempdir().unwrap();
        let cache = PackageCache::new(dir.path().join("npm_tgz"));
        assert!(!cache.is_cached("react", "18.2.0"));

        cache.ensure_dirs().unwrap();
        fs::write(cache.archive_path("react", "18.2.0"), b"tgz").unwrap();
        assert!(cache.is_cached("react", "18.2.0"));
    }

    #[tokio::test]
    async fn test_hash_archive() {
        let dir = tempdir().unwrap();
        let cache = PackageCache::new(dir.path());
        let path = cache.archive_path("ms", "2.1.3");
        fs::write(&path, b"hello world").unwrap();

        let digest = cache.hash_archive(&path).await.unwrap();
        assert_eq!(digest, sha512_bytes(b"hello world"));
    }
}
