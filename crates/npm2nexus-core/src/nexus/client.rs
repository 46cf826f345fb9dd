//! Nexus REST v1 client.

use super::reconcile::ComponentStore;
use super::types::{RemoteComponent, SearchResponse};
use crate::config::NexusConfig;
use crate::pkg::error::PkgError;
use crate::pkg::manifest::FetchResult;
use crate::pkg::registry::parse_base_url;
use crate::version::USER_AGENT;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Timeout for search and delete requests.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Timeout for uploads.
pub const UPLOAD_TIMEOUT_SECS: u64 = 300;

/// Group value Nexus matches against components without a scope.
pub const UNSCOPED_GROUP: &str = "\"\"";

/// Multipart field carrying an npm archive.
pub const NPM_ASSET_FIELD: &str = "npm.asset";

const ARCHIVE_MIME: &str = "application/x-gzip";
const SEARCH_PATH: &str = "service/rest/v1/search";
const COMPONENTS_PATH: &str = "service/rest/v1/components";

/// Client for one Nexus instance, bound to an upload repository and the
/// ordered list of repositories searched before uploading.
#[derive(Debug, Clone)]
pub struct NexusClient {
    base_url: Url,
    username: String,
    password: String,
    upload_repository: String,
    check_repositories: Vec<String>,
    http: Client,
}

impl NexusClient {
    /// Create a client from the configuration.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client
    /// cannot be created.
    pub fn new(config: &NexusConfig) -> Result<Self, PkgError> {
        let base_url = parse_base_url(&config.base_url)?;

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| PkgError::nexus(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            username: config.username.clone(),
            password: config.password.clone(),
            upload_repository: config.upload_repository.trim().to_string(),
            check_repositories: config.check_repositories(),
            http,
        })
    }

    /// Get the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, PkgError> {
        self.base_url
            .join(path)
            .map_err(|e| PkgError::url_invalid(format!("Failed to build Nexus URL '{path}': {e}")))
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        if self.username.is_empty() {
            request
        } else {
            request.basic_auth(&self.username, Some(&self.password))
        }
    }

    /// Search one repository for an exact group/name/version.
    ///
    /// An empty `group` searches for unscoped components. A 404 or an empty
    /// result is `Ok(None)`.
    ///
    /// # Errors
    /// Returns `NEXUS_NOT_UNIQUE` when more than one component matches, and
    /// `NEXUS_REQUEST_FAILED` on transport or status failures.
    pub async fn search(
        &self,
        repository: &str,
        group: &str,
        name: &str,
        version: &str,
    ) -> Result<Option<RemoteComponent>, PkgError> {
        let url = self.endpoint(SEARCH_PATH)?;
        let group_param = if group.is_empty() { UNSCOPED_GROUP } else { group };

        debug!(repository, group = group_param, name, version, "Searching Nexus");

        let request = self
            .http
            .get(url)
            .query(&[
                ("repository", repository),
                ("group", group_param),
                ("name", name),
                ("version", version),
            ])
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS));
        let response = self.authed(request).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(PkgError::nexus(format!(
                "Search in '{repository}' returned status {} for {name}@{version}",
                response.status()
            )));
        }

        let page: SearchResponse = response.json().await?;
        let count = page.items.len();
        if count > 1 {
            let id = if group.is_empty() {
                format!("{name}@{version}")
            } else {
                format!("@{group}/{name}@{version}")
            };
            return Err(PkgError::not_unique(repository, &id, count));
        }

        Ok(page.items.into_iter().next().map(|mut component| {
            if component.repository.is_empty() {
                component.repository = repository.to_string();
            }
            component
        }))
    }

    /// Delete a component by id.
    ///
    /// # Errors
    /// Returns `NEXUS_DELETE_FAILED` on a non-success status.
    pub async fn delete_component(&self, component_id: &str) -> Result<(), PkgError> {
        let url = self.endpoint(&format!("{COMPONENTS_PATH}/{component_id}"))?;

        let request = self
            .http
            .delete(url)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS));
        let response = self.authed(request).send().await?;

        if !response.status().is_success() {
            return Err(PkgError::delete_failed(format!(
                "Deleting component '{component_id}' returned status {}",
                response.status()
            )));
        }

        Ok(())
    }

    /// Upload a verified archive to the upload repository as `npm.asset`.
    ///
    /// The archive is streamed from disk.
    ///
    /// # Errors
    /// Returns `PKG_LOCAL_FILE_MISSING` without contacting the server when the
    /// archive is gone, and `NEXUS_UPLOAD_FAILED` on a non-success status.
    pub async fn upload_component(&self, result: &FetchResult) -> Result<(), PkgError> {
        let path = &result.local_path;
        let file = match tokio::fs::File::open(path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PkgError::local_file_missing(path));
            }
            Err(e) => {
                return Err(PkgError::upload_failed(format!(
                    "Failed to open {}: {e}",
                    path.display()
                )))
            }
        };
        let length = file.metadata().await?.len();

        let file_name = path
            .file_name()
            .map_or_else(|| result.search_key.clone(), |n| n.to_string_lossy().into_owned());
        let part = Part::stream_with_length(reqwest::Body::from(file), length)
            .file_name(file_name)
            .mime_str(ARCHIVE_MIME)?;
        // Archive names contain '#', which must reach Nexus unescaped.
        let form = Form::new()
            .percent_encode_noop()
            .part(NPM_ASSET_FIELD, part);

        let mut url = self.endpoint(COMPONENTS_PATH)?;
        url.query_pairs_mut()
            .append_pair("repository", &self.upload_repository);

        debug!(package = %result.id(), bytes = length, "Uploading archive");

        let request = self
            .http
            .post(url)
            .multipart(form)
            .timeout(Duration::from_secs(UPLOAD_TIMEOUT_SECS));
        let response = self.authed(request).send().await.map_err(|e| {
            PkgError::upload_failed(format!(
                "Upload of {} to '{}' failed: {e}",
                result.id(),
                self.upload_repository
            ))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PkgError::upload_failed(format!(
                "Upload of {} to '{}' returned status {status}: {}",
                result.id(),
                self.upload_repository,
                body.trim()
            )));
        }

        Ok(())
    }
}

impl ComponentStore for NexusClient {
    fn upload_repository(&self) -> &str {
        &self.upload_repository
    }

    fn check_repositories(&self) -> &[String] {
        &self.check_repositories
    }

    async fn find(
        &self,
        repository: &str,
        group: &str,
        name: &str,
        version: &str,
    ) -> Result<Option<RemoteComponent>, PkgError> {
        self.search(repository, group, name, version).await
    }

    async fn delete(&self, component_id: &str) -> Result<(), PkgError> {
        self.delete_component(component_id).await
    }

    async fn upload(&self, result: &FetchResult) -> Result<(), PkgError> {
        self.upload_component(result).await
    }
}
