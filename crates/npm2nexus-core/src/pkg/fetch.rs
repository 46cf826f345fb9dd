//! Download phase: fetch every lockfile package concurrently and write the
//! manifest.

use super::cache::PackageCache;
use super::error::PkgError;
use super::lockfile;
use super::manifest::{write_manifest, FetchResult, ManifestError};
use super::registry::RegistryClient;
use super::spec::PackageDescriptor;
use super::tarball::fetch_package;
use crate::config::{DownloaderConfig, DEFAULT_MAX_WORKERS};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info};

/// Options for the fetch orchestrator.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Directory holding the archives.
    pub download_dir: PathBuf,
    /// Mirror that replaces the lockfile's resolved URLs.
    pub mirror: Option<String>,
    /// Maximum concurrent downloads.
    pub max_workers: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("npm_tgz"),
            mirror: None,
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

impl From<&DownloaderConfig> for FetchOptions {
    fn from(config: &DownloaderConfig) -> Self {
        Self {
            download_dir: config.download_dir.clone(),
            mirror: config.forced_mirror().map(String::from),
            max_workers: config.max_workers,
        }
    }
}

/// A package that could not be fetched.
#[derive(Debug, Clone, Serialize)]
pub struct FetchFailure {
    pub name: String,
    pub version: String,
    pub code: String,
    pub message: String,
}

/// Outcome of fetching a batch of descriptors.
#[derive(Debug, Default)]
pub struct FetchSummary {
    /// Verified archives, in completion order.
    pub results: Vec<FetchResult>,
    /// Archives that came from the local cache.
    pub cached: usize,
    pub failures: Vec<FetchFailure>,
}

impl FetchSummary {
    /// Number of archives downloaded during this run.
    #[must_use]
    pub fn downloaded(&self) -> usize {
        self.results.len() - self.cached
    }
}

/// Outcome of the whole download phase.
#[derive(Debug, Serialize)]
pub struct DownloadReport {
    pub total_packages: usize,
    pub succeeded: usize,
    pub downloaded: usize,
    pub cached: usize,
    pub failed: usize,
    pub manifest: PathBuf,
    pub download_dir: PathBuf,
    pub failures: Vec<FetchFailure>,
}

/// Fetch all descriptors with at most `max_workers` in flight.
///
/// Failures are logged and collected; they never stop the batch.
///
/// # Errors
/// Returns an error only if the registry client cannot be created.
pub async fn fetch_all(
    descriptors: &[PackageDescriptor],
    options: &FetchOptions,
) -> Result<FetchSummary, PkgError> {
    let registry = RegistryClient::new(options.mirror.as_deref())?;
    let cache = PackageCache::new(&options.download_dir);
    let workers = options.max_workers.max(1);

    info!(
        packages = descriptors.len(),
        workers,
        dir = %cache.root().display(),
        mirror = registry.mirror().map_or("<resolved>", url::Url::as_str),
        "Fetching packages"
    );

    let outcomes: Vec<(&PackageDescriptor, Result<(FetchResult, bool), PkgError>)> =
        stream::iter(descriptors)
            .map(|descriptor| {
                let registry = &registry;
                let cache = &cache;
                async move { (descriptor, fetch_package(descriptor, registry, cache).await) }
            })
            .buffer_unordered(workers)
            .collect()
            .await;

    let mut summary = FetchSummary::default();
    for (descriptor, outcome) in outcomes {
        match outcome {
            Ok((result, from_cache)) => {
                if from_cache {
                    summary.cached += 1;
                }
                summary.results.push(result);
            }
            Err(e) => {
                error!(
                    name = %descriptor.name,
                    version = %descriptor.version,
                    code = e.code(),
                    "Failed to fetch package: {}",
                    e.message()
                );
                summary.failures.push(FetchFailure {
                    name: descriptor.name.clone(),
                    version: descriptor.version.clone(),
                    code: e.code().to_string(),
                    message: e.message().to_string(),
                });
            }
        }
    }

    Ok(summary)
}

/// Download phase error.
#[derive(Debug)]
pub enum DownloadError {
    /// The HTTP client could not be set up.
    Setup(PkgError),
    /// The manifest could not be written; the phase is incomplete.
    Manifest(ManifestError),
}

impl DownloadError {
    /// Get the error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Setup(e) => e.code(),
            Self::Manifest(e) => e.code(),
        }
    }
}

impl std::fmt::Display for DownloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Setup(e) => e.fmt(f),
            Self::Manifest(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for DownloadError {}

/// Run the download phase: parse the lockfile, fetch everything, persist
/// the manifest.
///
/// Returns `Ok(None)` when the lockfile yields nothing to download.
///
/// # Errors
/// Returns an error if the client cannot be created or the manifest cannot
/// be written.
pub async fn download(config: &DownloaderConfig) -> Result<Option<DownloadReport>, DownloadError> {
    let descriptors = lockfile::parse(&config.lockfile);
    if descriptors.is_empty() {
        info!("No packages to download");
        return Ok(None);
    }

    let options = FetchOptions::from(config);
    let summary = fetch_all(&descriptors, &options)
        .await
        .map_err(DownloadError::Setup)?;

    write_manifest(&config.meta_file, &summary.results).map_err(DownloadError::Manifest)?;

    info!(
        succeeded = summary.results.len(),
        total = descriptors.len(),
        manifest = %config.meta_file.display(),
        "Download phase complete"
    );

    Ok(Some(DownloadReport {
        total_packages: descriptors.len(),
        succeeded: summary.results.len(),
        downloaded: summary.downloaded(),
        cached: summary.cached,
        failed: summary.failures.len(),
        manifest: config.meta_file.clone(),
        download_dir: options.download_dir,
        failures: summary.failures,
    }))
}
