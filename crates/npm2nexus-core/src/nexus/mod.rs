//! Upload side of the migration: the Nexus REST client and the
//! reconciliation that decides, per package, whether to skip, replace, or
//! upload.

pub mod client;
pub mod reconcile;
pub mod types;

pub use client::NexusClient;
pub use reconcile::{
    decide, reconcile, reconcile_all, upload, ComponentStore, Decision, ReconcileAction,
    ReconcileFailure, ReconcileSummary, UploadOutcome,
};
pub use types::{extract_digest, RemoteAsset, RemoteComponent, SearchResponse};
