//! Verified tarball fetching.

use super::cache::PackageCache;
use super::error::PkgError;
use super::manifest::FetchResult;
use super::registry::RegistryClient;
use super::spec::PackageDescriptor;
use futures::StreamExt;
use npm2nexus_util::fs::remove_file_if_exists;
use npm2nexus_util::hash::{Sha512Digest, Sha512Stream};
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Suffix of an archive that is still being downloaded.
const PARTIAL_SUFFIX: &str = ".part";

/// Stream a tarball from `url` into `dest`, hashing every chunk as it is
/// written.
///
/// On error `dest` may hold a partial file; the caller removes it.
///
/// # Errors
/// Returns an error on transport failure, a non-success status, or a write
/// failure.
pub async fn download_tarball(
    client: &Client,
    url: &str,
    dest: &Path,
) -> Result<Sha512Digest, PkgError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| PkgError::download_failed(format!("Failed to download '{url}': {e}")))?;

    if !response.status().is_success() {
        return Err(PkgError::download_failed(format!(
            "Download failed with status {} for '{url}'",
            response.status()
        )));
    }

    let mut file = tokio::fs::File::create(dest).await.map_err(|e| {
        PkgError::cache_error(format!("Failed to create {}: {e}", dest.display()))
    })?;
    let mut hasher = Sha512Stream::new();
    let mut body = response.bytes_stream();

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| {
            PkgError::download_failed(format!("Failed to read response body from '{url}': {e}"))
        })?;
        file.write_all(&chunk).await?;
        hasher.update(&chunk);
    }
    file.flush().await?;

    Ok(hasher.finalize())
}

/// Fetch one package: hash the cached archive if present, otherwise
/// download it, then verify against the lockfile digest.
///
/// Returns the result and whether it was served from the cache. An archive
/// that fails verification is deleted.
///
/// # Errors
/// Returns an error on download, filesystem, or integrity failure.
pub async fn fetch_package(
    descriptor: &PackageDescriptor,
    registry: &RegistryClient,
    cache: &PackageCache,
) -> Result<(FetchResult, bool), PkgError> {
    let id = descriptor.id();
    let url = registry.download_url(descriptor)?;
    let archive = cache.archive_path(&descriptor.name, &descriptor.version);
    let from_cache = cache.is_cached(&descriptor.name, &descriptor.version);

    let (digest, written) = if from_cache {
        debug!(package = %id, path = %archive.display(), "Using cached archive");
        (cache.hash_archive(&archive).await?, archive.clone())
    } else {
        cache.ensure_dirs()?;
        let partial = partial_path(&archive);
        debug!(package = %id, url = %url, "Downloading tarball");
        match download_tarball(registry.http(), &url, &partial).await {
            Ok(digest) => (digest, partial),
            Err(e) => {
                discard(&partial);
                return Err(e);
            }
        }
    };

    if Sha512Digest::from_base64(&descriptor.sha512) != Some(digest) {
        discard(&written);
        return Err(PkgError::integrity_mismatch(
            &id,
            &descriptor.sha512,
            &digest.to_base64(),
        ));
    }

    if !from_cache {
        if let Err(e) = tokio::fs::rename(&written, &archive).await {
            discard(&written);
            return Err(PkgError::cache_error(format!(
                "Failed to move archive into {}: {e}",
                archive.display()
            )));
        }
    }

    Ok((FetchResult::verified(descriptor, url, archive, &digest), from_cache))
}

fn partial_path(archive: &Path) -> PathBuf {
    let mut name = archive.as_os_str().to_os_string();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

fn discard(path: &Path) {
    if let Err(e) = remove_file_if_exists(path) {
        warn!(path = %path.display(), error = %e, "Failed to remove rejected archive");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_path() {
        let p = partial_path(Path::new("/cache/scope#pkg-1.2.3.tgz"));
        assert_eq!(p, PathBuf::from("/cache/scope#pkg-1.2.3.tgz.part"));
    }
}
