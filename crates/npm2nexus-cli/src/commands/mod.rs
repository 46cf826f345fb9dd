pub mod download;
pub mod migrate;
pub mod upload;
pub mod version;

use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::fmt::Display;

/// Exit code when a phase cannot complete.
pub const EXIT_ERROR: i32 = 1;

/// Error code reported when the configuration cannot be loaded.
pub const CONFIG_ERROR: &str = "CONFIG_ERROR";

#[derive(Serialize)]
struct ErrorOutput<'a> {
    ok: bool,
    error: ErrorInfo<'a>,
}

#[derive(Serialize)]
struct ErrorInfo<'a> {
    code: &'a str,
    message: String,
}

/// Print a value as one pretty JSON object on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).into_diagnostic()?;
    println!("{json}");
    Ok(())
}

/// Abort a command. With `--json` the error is printed as an `ok: false`
/// object and the process exits; otherwise it is returned for miette to
/// report.
pub fn abort(json: bool, code: &str, message: impl Display) -> Result<()> {
    if json {
        let output = ErrorOutput {
            ok: false,
            error: ErrorInfo {
                code,
                message: message.to_string(),
            },
        };
        if let Ok(rendered) = serde_json::to_string_pretty(&output) {
            println!("{rendered}");
        }
        std::process::exit(EXIT_ERROR);
    }
    Err(miette::miette!("{message}"))
}

/// Runtime for the network phases.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().into_diagnostic()
}
