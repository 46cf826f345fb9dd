//! Download source selection.

use super::error::PkgError;
use super::spec::{tarball_file_name, PackageDescriptor};
use crate::version::USER_AGENT;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Connect timeout for registry requests.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Longest silence allowed between two reads of a response. Large tarballs
/// may take longer than this overall as long as data keeps arriving.
const READ_TIMEOUT_SECS: u64 = 60;

/// Registry client: the HTTP client used for tarball downloads plus the
/// optional mirror that replaces the lockfile's `resolved` URLs.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    mirror: Option<Url>,
    http: Client,
}

impl RegistryClient {
    /// Create a client. With `mirror` set, every tarball URL is rebuilt
    /// against it; otherwise the lockfile's `resolved` URL is used verbatim.
    ///
    /// # Errors
    /// Returns an error if the mirror URL is invalid or the HTTP client
    /// cannot be created.
    pub fn new(mirror: Option<&str>) -> Result<Self, PkgError> {
        Self::with_timeouts(
            mirror,
            Duration::from_secs(CONNECT_TIMEOUT_SECS),
            Duration::from_secs(READ_TIMEOUT_SECS),
        )
    }

    /// Create a client with explicit connect and read timeouts.
    ///
    /// # Errors
    /// Returns an error if the mirror URL is invalid or the HTTP client
    /// cannot be created.
    pub fn with_timeouts(
        mirror: Option<&str>,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self, PkgError> {
        let mirror = mirror.map(parse_base_url).transpose()?;

        let http = Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| PkgError::download_failed(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { mirror, http })
    }

    /// Get the mirror, if one is forced.
    #[must_use]
    pub fn mirror(&self) -> Option<&Url> {
        self.mirror.as_ref()
    }

    /// Get the HTTP client (for reuse in tarball downloads).
    #[must_use]
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// The URL to download a descriptor from.
    ///
    /// # Errors
    /// Returns an error if the mirror URL cannot be joined with the package path.
    pub fn download_url(&self, descriptor: &PackageDescriptor) -> Result<String, PkgError> {
        match &self.mirror {
            Some(mirror) => Ok(tarball_url(mirror, &descriptor.name, &descriptor.version)?.into()),
            None => Ok(descriptor.resolved.clone()),
        }
    }
}

/// Standard registry tarball URL: `<registry>/<name>/-/<basename>-<version>.tgz`.
///
/// # Errors
/// Returns an error if the joined URL is invalid.
pub fn tarball_url(registry: &Url, name: &str, version: &str) -> Result<Url, PkgError> {
    let path = format!("{name}/-/{}", tarball_file_name(name, version));
    registry
        .join(&path)
        .map_err(|e| PkgError::url_invalid(format!("Failed to build URL for '{name}@{version}': {e}")))
}

/// Parse a base URL, adding the trailing slash `Url::join` needs to keep the
/// last path segment.
///
/// # Errors
/// Returns an error if the URL is invalid.
pub fn parse_base_url(raw: &str) -> Result<Url, PkgError> {
    let raw = raw.trim();
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&with_slash).map_err(|e| PkgError::url_invalid(format!("Invalid URL '{raw}': {e}")))
}
