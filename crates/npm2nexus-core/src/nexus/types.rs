//! Nexus REST API v1 response types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Extension of the npm archive asset.
pub const ARCHIVE_ASSET_SUFFIX: &str = ".tgz";

/// `GET /service/rest/v1/search` response page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Vec<RemoteComponent>,
    #[serde(default, rename = "continuationToken")]
    pub continuation_token: Option<String>,
}

/// A component stored in a Nexus repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteComponent {
    pub id: String,
    /// Repository holding the component. Filled with the searched
    /// repository when the server omits it.
    #[serde(default)]
    pub repository: String,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub assets: Vec<RemoteAsset>,
}

/// A file belonging to a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAsset {
    #[serde(default)]
    pub path: String,
    #[serde(default, rename = "downloadUrl")]
    pub download_url: Option<String>,
    /// Algorithm name -> hex digest.
    #[serde(default)]
    pub checksum: BTreeMap<String, Value>,
}

impl RemoteComponent {
    /// The archive asset, if the component has one.
    #[must_use]
    pub fn archive_asset(&self) -> Option<&RemoteAsset> {
        self.assets
            .iter()
            .find(|asset| asset.path.ends_with(ARCHIVE_ASSET_SUFFIX))
    }
}

/// Hex SHA-512 Nexus reports for the component's archive asset.
#[must_use]
pub fn extract_digest(component: &RemoteComponent) -> Option<String> {
    component
        .archive_asset()?
        .checksum
        .get("sha512")?
        .as_str()
        .map(String::from)
}
