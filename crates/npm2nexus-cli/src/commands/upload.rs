//! `npm2nexus upload`: reconcile the manifest with Nexus.

use super::{abort, print_json, runtime, CONFIG_ERROR};
use miette::Result;
use npm2nexus_core::config::MigrateConfig;
use npm2nexus_core::nexus::{upload, UploadOutcome};
use serde::Serialize;

#[derive(Serialize)]
struct UploadOutput {
    ok: bool,
    upload: UploadOutcome,
}

pub fn run(config: &MigrateConfig, json: bool) -> Result<()> {
    let nexus = match config.nexus() {
        Ok(nexus) => nexus,
        Err(e) => return abort(json, CONFIG_ERROR, e),
    };
    let runtime = runtime()?;

    match runtime.block_on(upload(&config.downloader.meta_file, nexus)) {
        Ok(outcome) if json => print_json(&UploadOutput {
            ok: true,
            upload: outcome,
        }),
        Ok(outcome) => {
            print_human(&outcome);
            Ok(())
        }
        Err(e) => abort(json, e.code(), e),
    }
}

pub fn print_human(outcome: &UploadOutcome) {
    match outcome {
        UploadOutcome::ManifestMissing { message } | UploadOutcome::ManifestInvalid { message } => {
            println!("Nothing to upload: {message}");
        }
        UploadOutcome::Empty => println!("Nothing to upload: the manifest is empty"),
        UploadOutcome::Reconciled(summary) => {
            println!(
                "Reconciled {} packages ({} uploaded, {} replaced, {} skipped, {} failed)",
                summary.total, summary.uploaded, summary.replaced, summary.skipped, summary.failed
            );
            for failure in &summary.failures {
                println!(
                    "  failed {}: {} {}",
                    failure.package, failure.code, failure.message
                );
            }
        }
    }
}
