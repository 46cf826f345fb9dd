//! Download side of the migration.
//!
//! Provides utilities for:
//! - Reading package descriptors from an npm lockfile (v2/v3)
//! - Choosing the download source (resolved URL or a forced mirror)
//! - Streaming tarballs to disk while hashing them
//! - Verifying archives against the lockfile's SHA-512 integrity
//! - Writing the manifest consumed by the upload phase

pub mod cache;
pub mod error;
pub mod fetch;
pub mod lockfile;
pub mod manifest;
pub mod registry;
pub mod spec;
pub mod tarball;

pub use cache::PackageCache;
pub use error::{codes, PkgError};
pub use fetch::{
    download, fetch_all, DownloadError, DownloadReport, FetchFailure, FetchOptions, FetchSummary,
};
pub use lockfile::{
    codes as lockfile_codes, descriptors_from_json, parse, read_descriptors, LockfileError,
};
pub use manifest::{
    codes as manifest_codes, read_manifest, write_manifest, FetchResult, ManifestError,
};
pub use registry::RegistryClient;
pub use spec::{normalized_name, split_scope, PackageDescriptor};
pub use tarball::{download_tarball, fetch_package};
