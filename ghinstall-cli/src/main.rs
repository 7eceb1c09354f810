//! gh-install CLI - install binaries from GitHub releases
//!
//! Downloads the release asset matching the current OS and architecture and
//! verifies it against the release's checksum file.

mod commands;
mod error;
mod logging;
mod progress;

use std::path::PathBuf;
use std::process;

use clap::Parser;
use console::style;
use ghinstall::platform::HostPlatform;
use tokio_util::sync::CancellationToken;

use commands::install::InstallArgs;
use error::CliError;

#[derive(Parser, Debug)]
#[command(name = "gh-install")]
#[command(about = "Install binaries from GitHub releases with checksum verification", long_about = None)]
#[command(disable_version_flag = true)]
struct Cli {
    /// Repository as owner/repo or owner/repo@version
    #[arg(required_unless_present = "version")]
    repository: Option<String>,

    /// Name to save the binary as
    #[arg(short = 'b', long = "binName")]
    bin_name: Option<String>,

    /// Directory to save the binary to ("." for the current directory)
    #[arg(short, long)]
    path: Option<PathBuf>,

    /// Checksum algorithm to verify with (e.g. sha256, sha512, blake2b)
    #[arg(short, long)]
    sha: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Print version and build information
    #[arg(short = 'V', long)]
    version: bool,
}

/// Exit code after a second Ctrl-C, as for a process killed by SIGINT.
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Handle one Ctrl-C. Returns `true` when the process should exit at once.
///
/// The first interrupt cancels the token so an in-flight download can stop
/// and clean up. A second one aborts even when a blocking call never returns.
fn on_interrupt(cancel: &CancellationToken) -> bool {
    eprintln!();
    if cancel.is_cancelled() {
        eprintln!("Received second interrupt, aborting");
        return true;
    }
    eprintln!("Received interrupt, cancelling download (press Ctrl-C again to abort)...");
    cancel.cancel();
    false
}

fn install_interrupt_handler(cancel: CancellationToken) -> Result<(), CliError> {
    ctrlc::set_handler(move || {
        if on_interrupt(&cancel) {
            process::exit(INTERRUPTED_EXIT_CODE);
        }
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))
}

fn build_info() -> String {
    format!(
        "gh-install {} ({})",
        ghinstall::VERSION,
        HostPlatform::current()
    )
}

fn print_error(err: &CliError) {
    if err.is_integrity_failure() {
        eprintln!(
            "{} {}",
            style("INTEGRITY FAILURE:").red().bold(),
            style(err).red()
        );
    } else {
        eprintln!("{} {}", style("Error:").red(), err);
    }
}

fn main() {
    let cli = Cli::parse();

    if cli.version {
        println!("{}", build_info());
        return;
    }

    logging::init(cli.verbose);

    let Some(repository) = cli.repository else {
        return;
    };

    let args = InstallArgs {
        repository,
        bin_name: cli.bin_name,
        path: cli.path,
        sha: cli.sha,
        verbose: cli.verbose,
    };

    let cancel = CancellationToken::new();
    let result = install_interrupt_handler(cancel.clone())
        .and_then(|()| commands::install::run(args, cancel));

    if let Err(e) = result {
        print_error(&e);
        process::exit(e.exit_code());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_flags() {
        let cli = Cli::parse_from([
            "gh-install",
            "cli/cli@v2.40.0",
            "--binName",
            "gh",
            "-p",
            ".",
            "-s",
            "sha512",
            "-v",
        ]);
        assert_eq!(cli.repository.as_deref(), Some("cli/cli@v2.40.0"));
        assert_eq!(cli.bin_name.as_deref(), Some("gh"));
        assert_eq!(cli.path, Some(PathBuf::from(".")));
        assert_eq!(cli.sha.as_deref(), Some("sha512"));
        assert!(cli.verbose);
    }

    #[test]
    fn test_repository_required_without_version() {
        assert!(Cli::try_parse_from(["gh-install"]).is_err());
        assert!(Cli::try_parse_from(["gh-install", "--version"]).is_ok());
    }

    #[test]
    fn test_second_interrupt_aborts() {
        let cancel = CancellationToken::new();

        assert!(!on_interrupt(&cancel));
        assert!(cancel.is_cancelled());
        assert!(on_interrupt(&cancel));
    }

    #[test]
    fn test_build_info() {
        let info = build_info();
        assert!(info.starts_with("gh-install "));
        assert!(info.contains(ghinstall::VERSION));
    }
}
