//! Logging setup.
//!
//! `RUST_LOG` takes precedence. Otherwise `--verbose` or a truthy
//! `GH_INSTALL_DEBUG` selects debug output for this tool, and info is the
//! default. Everything is written to stderr.

use tracing_subscriber::EnvFilter;

/// Environment variable enabling debug output.
pub const DEBUG_ENV: &str = "GH_INSTALL_DEBUG";

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Whether debug output was requested.
pub fn debug_requested(verbose: bool) -> bool {
    verbose
        || std::env::var(DEBUG_ENV)
            .map(|v| is_truthy(&v))
            .unwrap_or(false)
}

fn default_directive(debug: bool) -> String {
    let level = if debug { "debug" } else { "info" };
    format!("warn,ghinstall={0},gh_install={0}", level)
}

/// Install the global tracing subscriber.
pub fn init(verbose: bool) {
    let debug = debug_requested(verbose);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    // Ignore the error if a subscriber is already installed.
    let _ = if debug {
        builder.with_target(true).try_init()
    } else {
        builder.without_time().with_target(false).compact().try_init()
    };
}
