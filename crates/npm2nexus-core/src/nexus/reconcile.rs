//! Per-package reconciliation against Nexus.
//!
//! For every manifest entry the check repositories are searched in order.
//! The first match is compared by SHA-512 with the local archive:
//!
//! | found in            | digest   | action                      |
//! |---------------------|----------|-----------------------------|
//! | nowhere             | -        | upload                      |
//! | any repository      | equal    | skip                        |
//! | upload repository   | differs  | delete, then upload         |
//! | another repository  | differs  | upload (warn: duplicate)    |
//!
//! The decision is a pure function ([`decide`]); the side effects run
//! through a [`ComponentStore`].

use super::client::NexusClient;
use super::types::{extract_digest, RemoteComponent};
use crate::config::NexusConfig;
use crate::pkg::error::{codes, PkgError};
use crate::pkg::manifest::{codes as manifest_codes, read_manifest, FetchResult};
use npm2nexus_util::hash::Sha512Digest;
use serde::Serialize;
use std::path::Path;
use tracing::{error, info, warn};

/// The operations reconciliation needs from a repository manager.
#[allow(async_fn_in_trait)]
pub trait ComponentStore {
    /// Repository new archives are uploaded to.
    fn upload_repository(&self) -> &str;

    /// Repositories searched before uploading, in order.
    fn check_repositories(&self) -> &[String];

    /// Find the single component matching group/name/version in `repository`.
    async fn find(
        &self,
        repository: &str,
        group: &str,
        name: &str,
        version: &str,
    ) -> Result<Option<RemoteComponent>, PkgError>;

    async fn delete(&self, component_id: &str) -> Result<(), PkgError>;

    async fn upload(&self, result: &FetchResult) -> Result<(), PkgError>;
}

/// What to do with one manifest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// An identical archive already exists.
    Skip { repository: String },
    /// The upload repository holds a different archive for this version.
    ReplaceThenUpload {
        component_id: String,
        repository: String,
    },
    /// Upload. `conflicting_repository` names a repository outside the
    /// upload repository holding a different archive, which is left alone.
    Upload {
        conflicting_repository: Option<String>,
    },
}

/// Decide the action for a local archive given the component found (if any).
///
/// Digests compare case-insensitively. A component without a readable
/// archive digest counts as different.
#[must_use]
pub fn decide(
    found: Option<&RemoteComponent>,
    local_hex: &str,
    upload_repository: &str,
) -> Decision {
    let Some(component) = found else {
        return Decision::Upload {
            conflicting_repository: None,
        };
    };

    let matches = extract_digest(component).is_some_and(|remote| same_digest(&remote, local_hex));

    if matches {
        Decision::Skip {
            repository: component.repository.clone(),
        }
    } else if component.repository == upload_repository {
        Decision::ReplaceThenUpload {
            component_id: component.id.clone(),
            repository: component.repository.clone(),
        }
    } else {
        Decision::Upload {
            conflicting_repository: Some(component.repository.clone()),
        }
    }
}

fn same_digest(remote: &str, local: &str) -> bool {
    match (Sha512Digest::from_hex(remote), Sha512Digest::from_hex(local)) {
        (Some(remote), Some(local)) => remote == local,
        _ => remote.trim().eq_ignore_ascii_case(local.trim()),
    }
}

/// What reconciliation did for one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileAction {
    Skipped { repository: String },
    Uploaded,
    /// The old component was deleted (or the delete failed and was logged)
    /// and the new archive uploaded.
    Replaced { deleted: bool },
}

/// A manifest entry that could not be reconciled.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileFailure {
    pub package: String,
    pub code: String,
    pub message: String,
}

/// Outcome of a reconciliation pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileSummary {
    pub total: usize,
    pub skipped: usize,
    pub uploaded: usize,
    pub replaced: usize,
    pub failed: usize,
    pub failures: Vec<ReconcileFailure>,
}

/// Outcome of the upload phase.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UploadOutcome {
    /// No manifest at the configured path.
    ManifestMissing { message: String },
    /// The manifest exists but could not be read.
    ManifestInvalid { message: String },
    /// The manifest lists no packages.
    Empty,
    Reconciled(ReconcileSummary),
}

async fn locate<S: ComponentStore>(
    store: &S,
    result: &FetchResult,
) -> Result<Option<RemoteComponent>, PkgError> {
    for repository in store.check_repositories() {
        match store
            .find(repository, &result.group, &result.name, &result.version)
            .await
        {
            Ok(Some(component)) => {
                info!(
                    package = %result.id(),
                    repository = %repository,
                    "Found existing component"
                );
                return Ok(Some(component));
            }
            Ok(None) => {}
            Err(e) if e.code() == codes::NEXUS_NOT_UNIQUE => return Err(e),
            Err(e) => {
                warn!(
                    package = %result.id(),
                    repository = %repository,
                    "Search failed, treating repository as not containing the package: {e}"
                );
            }
        }
    }
    Ok(None)
}

/// Reconcile one manifest entry.
///
/// # Errors
/// Returns an error if the search is ambiguous or the upload fails. A
/// failed delete is logged and does not prevent the upload.
pub async fn reconcile<S: ComponentStore>(
    store: &S,
    result: &FetchResult,
) -> Result<ReconcileAction, PkgError> {
    let id = result.id();
    let found = locate(store, result).await?;

    match decide(found.as_ref(), &result.sha512_hex, store.upload_repository()) {
        Decision::Skip { repository } => {
            info!(package = %id, repository = %repository, "Identical archive exists, skipping");
            Ok(ReconcileAction::Skipped { repository })
        }
        Decision::ReplaceThenUpload {
            component_id,
            repository,
        } => {
            warn!(
                package = %id,
                repository = %repository,
                remote = ?found.as_ref().and_then(extract_digest),
                local = %result.sha512_hex,
                "SHA-512 differs from the stored archive, replacing"
            );
            let deleted = match store.delete(&component_id).await {
                Ok(()) => {
                    info!(package = %id, component_id = %component_id, "Deleted old component");
                    true
                }
                Err(e) => {
                    error!(package = %id, component_id = %component_id, "Delete failed, uploading anyway: {e}");
                    false
                }
            };
            store.upload(result).await?;
            info!(package = %id, repository = store.upload_repository(), "Uploaded");
            Ok(ReconcileAction::Replaced { deleted })
        }
        Decision::Upload {
            conflicting_repository,
        } => {
            if let Some(repository) = conflicting_repository {
                warn!(
                    package = %id,
                    repository = %repository,
                    upload_repository = store.upload_repository(),
                    "A different archive exists in another repository; uploading a second copy"
                );
            }
            store.upload(result).await?;
            info!(package = %id, repository = store.upload_repository(), "Uploaded");
            Ok(ReconcileAction::Uploaded)
        }
    }
}

/// Reconcile every entry in order. Failures are logged and counted; the
/// pass always runs to the end.
pub async fn reconcile_all<S: ComponentStore>(
    store: &S,
    results: &[FetchResult],
) -> ReconcileSummary {
    let mut summary = ReconcileSummary {
        total: results.len(),
        ..ReconcileSummary::default()
    };

    for result in results {
        match reconcile(store, result).await {
            Ok(ReconcileAction::Skipped { .. }) => summary.skipped += 1,
            Ok(ReconcileAction::Uploaded) => summary.uploaded += 1,
            Ok(ReconcileAction::Replaced { .. }) => summary.replaced += 1,
            Err(e) => {
                error!(package = %result.id(), code = e.code(), "Failed to reconcile: {}", e.message());
                summary.failed += 1;
                summary.failures.push(ReconcileFailure {
                    package: result.id(),
                    code: e.code().to_string(),
                    message: e.message().to_string(),
                });
            }
        }
    }

    info!(
        total = summary.total,
        skipped = summary.skipped,
        uploaded = summary.uploaded,
        replaced = summary.replaced,
        failed = summary.failed,
        "Upload phase complete"
    );
    summary
}

/// Run the upload phase: read the manifest and reconcile every entry.
///
/// A missing, unreadable, or empty manifest is logged and reported as a
/// no-op outcome.
///
/// # Errors
/// Returns an error if the Nexus client cannot be created.
pub async fn upload(manifest_path: &Path, config: &NexusConfig) -> Result<UploadOutcome, PkgError> {
    let results = match read_manifest(manifest_path) {
        Ok(results) => results,
        Err(e) if e.code() == manifest_codes::MANIFEST_NOT_FOUND => {
            error!("{e}");
            return Ok(UploadOutcome::ManifestMissing {
                message: e.message().to_string(),
            });
        }
        Err(e) => {
            error!("{e}");
            return Ok(UploadOutcome::ManifestInvalid {
                message: e.message().to_string(),
            });
        }
    };

    if results.is_empty() {
        info!(manifest = %manifest_path.display(), "Manifest is empty, nothing to upload");
        return Ok(UploadOutcome::Empty);
    }

    let client = NexusClient::new(config)?;
    info!(
        packages = results.len(),
        nexus = %client.base_url(),
        upload_repository = ComponentStore::upload_repository(&client),
        check_repositories = ?ComponentStore::check_repositories(&client),
        "Reconciling with Nexus"
    );

    Ok(UploadOutcome::Reconciled(reconcile_all(&client, &results).await))
}
