//! Per-package error types shared by both phases.

use std::fmt;
use std::io;

/// Package error codes.
pub mod codes {
    pub const PKG_DOWNLOAD_FAILED: &str = "PKG_DOWNLOAD_FAILED";
    pub const PKG_INTEGRITY_MISMATCH: &str = "PKG_INTEGRITY_MISMATCH";
    pub const PKG_CACHE_ERROR: &str = "PKG_CACHE_ERROR";
    pub const PKG_URL_INVALID: &str = "PKG_URL_INVALID";
    pub const PKG_LOCAL_FILE_MISSING: &str = "PKG_LOCAL_FILE_MISSING";

    pub const NEXUS_REQUEST_FAILED: &str = "NEXUS_REQUEST_FAILED";
    pub const NEXUS_NOT_UNIQUE: &str = "NEXUS_NOT_UNIQUE";
    pub const NEXUS_DELETE_FAILED: &str = "NEXUS_DELETE_FAILED";
    pub const NEXUS_UPLOAD_FAILED: &str = "NEXUS_UPLOAD_FAILED";
}

/// Error for a single package in either phase.
#[derive(Debug)]
pub struct PkgError {
    code: &'static str,
    message: String,
}

impl PkgError {
    /// Create a new error with the given code and message.
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

    pub fn download_failed(msg: impl Into<String>) -> Self {
        Self::new(codes::PKG_DOWNLOAD_FAILED, msg)
    }

    /// The computed digest differs from the one declared in the lockfile.
    #[must_use]
    pub fn integrity_mismatch(id: &str, expected: &str, actual: &str) -> Self {
        Self::new(
            codes::PKG_INTEGRITY_MISMATCH,
            format!("SHA-512 mismatch for {id}: expected {expected}, got {actual}"),
        )
    }

    pub fn cache_error(msg: impl Into<String>) -> Self {
        Self::new(codes::PKG_CACHE_ERROR, msg)
    }

    pub fn url_invalid(msg: impl Into<String>) -> Self {
        Self::new(codes::PKG_URL_INVALID, msg)
    }

    #[must_use]
    pub fn local_file_missing(path: &std::path::Path) -> Self {
        Self::new(
            codes::PKG_LOCAL_FILE_MISSING,
            format!("Local archive not found: {}", path.display()),
        )
    }

    pub fn nexus(msg: impl Into<String>) -> Self {
        Self::new(codes::NEXUS_REQUEST_FAILED, msg)
    }

    /// A search for a unique group/name/version returned several components.
    #[must_use]
    pub fn not_unique(repository: &str, id: &str, count: usize) -> Self {
        Self::new(
            codes::NEXUS_NOT_UNIQUE,
            format!("Search in '{repository}' returned {count} components for {id}, expected at most 1"),
        )
    }

    pub fn delete_failed(msg: impl Into<String>) -> Self {
        Self::new(codes::NEXUS_DELETE_FAILED, msg)
    }

    pub fn upload_failed(msg: impl Into<String>) -> Self {
        Self::new(codes::NEXUS_UPLOAD_FAILED, msg)
    }

    /// Whether this error is an integrity failure.
    #[must_use]
    pub fn is_integrity_mismatch(&self) -> bool {
        self.code == codes::PKG_INTEGRITY_MISMATCH
    }
}

impl fmt::Display for PkgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PkgError {}

impl From<io::Error> for PkgError {
    fn from(e: io::Error) -> Self {
        Self::new(codes::PKG_CACHE_ERROR, e.to_string())
    }
}

impl From<reqwest::Error> for PkgError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::new(codes::NEXUS_REQUEST_FAILED, format!("Request timed out: {e}"))
        } else if e.is_connect() {
            Self::new(codes::NEXUS_REQUEST_FAILED, format!("Connection failed: {e}"))
        } else {
            Self::new(codes::NEXUS_REQUEST_FAILED, e.to_string())
        }
    }
}

impl From<serde_json::Error> for PkgError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(codes::NEXUS_REQUEST_FAILED, format!("Invalid JSON: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_format() {
        let err = PkgError::integrity_mismatch("left-pad@1.3.0", "aaa", "bbb");
        assert_eq!(err.code(), codes::PKG_INTEGRITY_MISMATCH);
        assert!(err.is_integrity_mismatch());
        let rendered = err.to_string();
        assert!(rendered.contains(codes::PKG_INTEGRITY_MISMATCH));
        assert!(rendered.contains("left-pad@1.3.0"));
        assert!(rendered.contains("aaa") && rendered.contains("bbb"));
    }

    #[test]
    fn test_error_codes_uppercase() {
        let all_codes = [
            codes::PKG_DOWNLOAD_FAILED,
            codes::PKG_INTEGRITY_MISMATCH,
            codes::PKG_CACHE_ERROR,
            codes::PKG_URL_INVALID,
            codes::PKG_LOCAL_FILE_MISSING,
            codes::NEXUS_REQUEST_FAILED,
            codes::NEXUS_NOT_UNIQUE,
            codes::NEXUS_DELETE_FAILED,
            codes::NEXUS_UPLOAD_FAILED,
        ];

        for code in all_codes {
            assert!(
                code.chars().all(|c| c.is_uppercase() || c == '_'),
                "Error code '{code}' should be SCREAMING_SNAKE_CASE"
            );
        }
    }

    #[test]
    fn test_io_error_maps_to_cache_error() {
        let err: PkgError = io::Error::new(io::ErrorKind::PermissionDenied, "denied").into();
        assert_eq!(err.code(), codes::PKG_CACHE_ERROR);
    }
}
