//! `npm2nexus migrate`: download, then upload.

use super::{abort, download, print_json, runtime, upload, CONFIG_ERROR};
use miette::Result;
use npm2nexus_core::config::MigrateConfig;
use npm2nexus_core::nexus::UploadOutcome;
use npm2nexus_core::pkg::DownloadReport;
use serde::Serialize;

#[derive(Serialize)]
struct MigrateOutput {
    ok: bool,
    download: Option<DownloadReport>,
    upload: UploadOutcome,
}

pub fn run(config: &MigrateConfig, json: bool) -> Result<()> {
    // Fail before downloading anything if the upload cannot run.
    let nexus = match config.nexus() {
        Ok(nexus) => nexus,
        Err(e) => return abort(json, CONFIG_ERROR, e),
    };
    let runtime = runtime()?;

    let report = match runtime.block_on(npm2nexus_core::pkg::download(&config.downloader)) {
        Ok(report) => report,
        Err(e) => return abort(json, e.code(), e),
    };
    if !json {
        download::print_human(report.as_ref());
    }

    let outcome = match runtime.block_on(npm2nexus_core::nexus::upload(
        &config.downloader.meta_file,
        nexus,
    )) {
        Ok(outcome) => outcome,
        Err(e) => return abort(json, e.code(), e),
    };

    if json {
        print_json(&MigrateOutput {
            ok: true,
            download: report,
            upload: outcome,
        })
    } else {
        upload::print_human(&outcome);
        Ok(())
    }
}
