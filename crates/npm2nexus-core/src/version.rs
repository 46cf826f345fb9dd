use std::fmt::Write;

/// The current version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// User agent sent with every registry and Nexus request.
pub const USER_AGENT: &str = concat!("npm2nexus/", env!("CARGO_PKG_VERSION"));

/// Returns a formatted version string including build metadata if available.
#[must_use]
pub fn version_string() -> String {
    let mut s = format!("npm2nexus {VERSION}");

    if let Some(hash) = option_env!("NPM2NEXUS_BUILD_GIT_HASH") {
        let _ = write!(s, " ({hash})");
    }

    s
}
