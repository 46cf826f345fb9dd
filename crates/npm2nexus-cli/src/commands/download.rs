//! `npm2nexus download`: fetch and verify every lockfile package.

use super::{abort, print_json, runtime};
use miette::Result;
use npm2nexus_core::config::MigrateConfig;
use npm2nexus_core::pkg::{download, DownloadReport};
use serde::Serialize;

#[derive(Serialize)]
struct DownloadOutput {
    ok: bool,
    /// `null` when the lockfile yielded nothing to download.
    download: Option<DownloadReport>,
}

pub fn run(config: &MigrateConfig, json: bool) -> Result<()> {
    let runtime = runtime()?;

    match runtime.block_on(download(&config.downloader)) {
        Ok(report) if json => print_json(&DownloadOutput {
            ok: true,
            download: report,
        }),
        Ok(report) => {
            print_human(report.as_ref());
            Ok(())
        }
        Err(e) => abort(json, e.code(), e),
    }
}

pub fn print_human(report: Option<&DownloadReport>) {
    let Some(report) = report else {
        println!("Nothing to download: the lockfile has no usable packages");
        return;
    };

    println!(
        "Downloaded {}/{} packages ({} fetched, {} cached, {} failed)",
        report.succeeded, report.total_packages, report.downloaded, report.cached, report.failed
    );
    println!("  archives: {}", report.download_dir.display());
    println!("  manifest: {}", report.manifest.display());
    for failure in &report.failures {
        println!(
            "  failed {}@{}: {} {}",
            failure.name, failure.version, failure.code, failure.message
        );
    }
}
