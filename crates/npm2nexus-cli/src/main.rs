#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::needless_pass_by_value)]

mod commands;
mod logging;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use npm2nexus_core::config::MigrateConfig;
use npm2nexus_core::Config;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "npm2nexus")]
#[command(author, version, about = "Migrate npm lockfile dependencies into a Sonatype Nexus repository", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (one object on stdout, JSON logs on stderr)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    /// Configuration file (default: npm2nexus.json in the working directory)
    #[arg(long, global = true, value_name = "PATH", env = "NPM2NEXUS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Download and verify every package in the lockfile, then write the manifest
    Download,

    /// Reconcile the manifest's archives with Nexus and upload what is missing
    Upload,

    /// Run download, then upload
    Migrate,
}

fn load_config(explicit: Option<&Path>, cwd: &Path) -> Result<MigrateConfig> {
    let path = MigrateConfig::locate(explicit, cwd);
    MigrateConfig::load(&path, cwd).into_diagnostic()
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let config = Config::new(cwd.clone())
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json);

    let command = match cli.command {
        Some(Commands::Version) | None => return commands::version::run(),
        Some(command) => command,
    };

    logging::init(config.verbosity, config.json_logs);

    let settings = match load_config(cli.config.as_deref(), &config.cwd) {
        Ok(settings) => settings,
        Err(e) => return commands::abort(cli.json, commands::CONFIG_ERROR, e),
    };

    match command {
        Commands::Download => commands::download::run(&settings, cli.json),
        Commands::Upload => commands::upload::run(&settings, cli.json),
        Commands::Migrate => commands::migrate::run(&settings, cli.json),
        Commands::Version => commands::version::run(),
    }
}
