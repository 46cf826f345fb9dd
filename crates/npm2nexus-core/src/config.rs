//! Runtime and migration configuration.
//!
//! The migration settings live in a JSON file (`npm2nexus.json` by default):
//!
//! ```json
//! {
//!   "downloader": {
//!     "lockfile": "package-lock.json",
//!     "download_dir": "npm_tgz",
//!     "use_resolved_url": true,
//!     "mirror_registry": null,
//!     "max_workers": 10,
//!     "meta_file": "meta-info.json"
//!   },
//!   "nexus": {
//!     "base_url": "http://nexus.internal:8081",
//!     "username": "deployer",
//!     "password": "secret",
//!     "upload_repository": "npm-hosted",
//!     "check_repositories": "npm-hosted,npm-proxy"
//!   }
//! }
//! ```
//!
//! The file is loaded once at startup and passed by reference to both phases.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "npm2nexus.json";

/// Environment variable overriding the configuration file path.
pub const CONFIG_ENV: &str = "NPM2NEXUS_CONFIG";

/// Environment variable overriding `nexus.username`.
pub const NEXUS_USERNAME_ENV: &str = "NPM2NEXUS_NEXUS_USERNAME";

/// Environment variable overriding `nexus.password`.
pub const NEXUS_PASSWORD_ENV: &str = "NPM2NEXUS_NEXUS_PASSWORD";

/// Default number of concurrent downloads.
pub const DEFAULT_MAX_WORKERS: usize = 10;

/// Runtime configuration for the CLI process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Current working directory.
    pub cwd: PathBuf,

    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            json_logs: false,
            verbosity: 0,
        }
    }
}

impl Config {
    /// Create a new config with the given working directory.
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            ..Default::default()
        }
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }
}

/// Settings for the download phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloaderConfig {
    /// npm lockfile to read (v2/v3 `package-lock.json`).
    pub lockfile: PathBuf,
    /// Directory holding the downloaded `.tgz` files.
    pub download_dir: PathBuf,
    /// Download from the lockfile's `resolved` URL. When false and a mirror
    /// is configured, the URL is rebuilt against the mirror.
    pub use_resolved_url: bool,
    /// Registry base URL used when `use_resolved_url` is false.
    pub mirror_registry: Option<String>,
    /// Maximum concurrent downloads.
    pub max_workers: usize,
    /// Manifest written after the download phase and read by the upload phase.
    pub meta_file: PathBuf,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            lockfile: PathBuf::from("package-lock.json"),
            download_dir: PathBuf::from("npm_tgz"),
            use_resolved_url: true,
            mirror_registry: None,
            max_workers: DEFAULT_MAX_WORKERS,
            meta_file: PathBuf::from("meta-info.json"),
        }
    }
}

impl DownloaderConfig {
    /// The mirror to download from, if the configuration forces one.
    #[must_use]
    pub fn forced_mirror(&self) -> Option<&str> {
        if self.use_resolved_url {
            return None;
        }
        self.mirror_registry
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }
}

/// Connection settings for the Nexus repository manager.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NexusConfig {
    /// Nexus base URL, e.g. `http://nexus.internal:8081`.
    pub base_url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Repository artifacts are uploaded to.
    pub upload_repository: String,
    /// Comma-separated repositories searched before uploading.
    /// Defaults to the upload repository.
    #[serde(default)]
    pub check_repositories: Option<String>,
}

impl NexusConfig {
    /// Repositories to search, in order.
    #[must_use]
    pub fn check_repositories(&self) -> Vec<String> {
        let raw = self
            .check_repositories
            .as_deref()
            .unwrap_or(&self.upload_repository);

        let repos: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(String::from)
            .collect();

        if repos.is_empty() {
            vec![self.upload_repository.clone()]
        } else {
            repos
        }
    }
}

impl fmt::Debug for NexusConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NexusConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("upload_repository", &self.upload_repository)
            .field("check_repositories", &self.check_repositories)
            .finish()
    }
}

/// The complete migration configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrateConfig {
    #[serde(default)]
    pub downloader: DownloaderConfig,
    /// Required for the upload phase only.
    #[serde(default)]
    pub nexus: Option<NexusConfig>,
}

impl MigrateConfig {
    /// Load, apply environment overrides, resolve relative paths against
    /// `cwd`, and validate.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn load(path: &Path, cwd: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config: Self =
            serde_json::from_str(&content).map_err(|source| Error::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;

        config.apply_overrides(|key| std::env::var(key).ok());
        config.resolve_paths(cwd);
        config.validate()?;
        Ok(config)
    }

    /// Locate the configuration file: explicit path, then `NPM2NEXUS_CONFIG`,
    /// then `npm2nexus.json` in `cwd`.
    #[must_use]
    pub fn locate(explicit: Option<&Path>, cwd: &Path) -> PathBuf {
        let chosen = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
        absolutize(&chosen, cwd)
    }

    /// Override credentials from the given variable lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(nexus) = self.nexus.as_mut() {
            if let Some(user) = lookup(NEXUS_USERNAME_ENV) {
                nexus.username = user;
            }
            if let Some(password) = lookup(NEXUS_PASSWORD_ENV) {
                nexus.password = password;
            }
        }
    }

    /// Make every relative path absolute with respect to `cwd`.
    pub fn resolve_paths(&mut self, cwd: &Path) {
        let d = &mut self.downloader;
        d.lockfile = absolutize(&d.lockfile, cwd);
        d.download_dir = absolutize(&d.download_dir, cwd);
        d.meta_file = absolutize(&d.meta_file, cwd);
    }

    /// # Errors
    /// Returns `ConfigInvalid` describing the first problem found.
    pub fn validate(&self) -> Result<(), Error> {
        if self.downloader.max_workers == 0 {
            return Err(Error::invalid("downloader.max_workers must be at least 1"));
        }

        if !self.downloader.use_resolved_url && self.downloader.forced_mirror().is_none() {
            tracing::warn!(
                "downloader.use_resolved_url is false but no mirror_registry is set; using resolved URLs"
            );
        }

        if let Some(nexus) = &self.nexus {
            if nexus.base_url.trim().is_empty() {
                return Err(Error::invalid("nexus.base_url must not be empty"));
            }
            if nexus.upload_repository.trim().is_empty() {
                return Err(Error::invalid("nexus.upload_repository must not be empty"));
            }
        }

        Ok(())
    }

    /// The Nexus section, required by the upload phase.
    ///
    /// # Errors
    /// Returns `ConfigInvalid` if the section is missing.
    pub fn nexus(&self) -> Result<&NexusConfig, Error> {
        self.nexus
            .as_ref()
            .ok_or_else(|| Error::invalid("missing \"nexus\" section (required for upload)"))
    }
}

fn absolutize(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn nexus_section() -> NexusConfig {
        NexusConfig {
            base_url: "http://nexus:8081".to_string(),
            username: "admin".to_string(),
            password: "admin123".to_string(),
            upload_repository: "npm-hosted".to_string(),
            check_repositories: None,
        }
    }

    #[test]
    fn test_downloader_defaults() {
        let config: MigrateConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.downloader, DownloaderConfig::default());
        assert_eq!(config.downloader.max_workers, DEFAULT_MAX_WORKERS);
        assert!(config.downloader.use_resolved_url);
        assert!(config.nexus.is_none());
    }

    #[test]
    fn test_partial_downloader_section() {
        let config: MigrateConfig =
            serde_json::from_str(r#"{"downloader": {"max_workers": 4}}"#).unwrap();
        assert_eq!(config.downloader.max_workers, 4);
        assert_eq!(config.downloader.download_dir, PathBuf::from("npm_tgz"));
    }

    #[test]
    fn test_check_repositories_default_to_upload() {
        let nexus = nexus_section();
        assert_eq!(nexus.check_repositories(), vec!["npm-hosted"]);
    }

    #[test]
    fn test_check_repositories_split_and_trimmed() {
        let mut nexus = nexus_section();
        nexus.check_repositories = Some(" npm-hosted , npm-group,,".to_string());
        assert_eq!(nexus.check_repositories(), vec!["npm-hosted", "npm-group"]);
    }

    #[test]
    fn test_forced_mirror() {
        let mut d = DownloaderConfig::default();
        d.mirror_registry = Some("https://registry.npmmirror.com".to_string());
        assert_eq!(d.forced_mirror(), None);

        d.use_resolved_url = false;
        assert_eq!(d.forced_mirror(), Some("https://registry.npmmirror.com"));

        d.mirror_registry = Some("  ".to_string());
        assert_eq!(d.forced_mirror(), None);
    }

    #[test]
    fn test_overrides_replace_credentials() {
        let mut config = MigrateConfig {
            nexus: Some(nexus_section()),
            ..Default::default()
        };
        config.apply_overrides(|key| match key {
            NEXUS_PASSWORD_ENV => Some("from-env".to_string()),
            _ => None,
        });

        let nexus = config.nexus().unwrap();
        assert_eq!(nexus.password, "from-env");
        assert_eq!(nexus.username, "admin");
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", nexus_section());
        assert!(!rendered.contains("admin123"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, r#"{"downloader": {"download_dir": "cache/tgz"}}"#).unwrap();

        let config = MigrateConfig::load(&path, dir.path()).unwrap();
        assert_eq!(config.downloader.download_dir, dir.path().join("cache/tgz"));
        assert_eq!(config.downloader.meta_file, dir.path().join("meta-info.json"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let err = MigrateConfig::load(&dir.path().join("nope.json"), dir.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigRead { .. }));
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "downloader = 1").unwrap();

        let err = MigrateConfig::load(&path, dir.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let mut config = MigrateConfig::default();
        config.downloader.max_workers = 0;
        assert!(matches!(config.validate(), Err(Error::ConfigInvalid(_))));
    }

    #[test]
    fn test_nexus_section_required_for_upload() {
        let config = MigrateConfig::default();
        assert!(config.nexus().is_err());
    }
}
