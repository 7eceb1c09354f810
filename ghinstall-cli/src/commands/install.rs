//! The install command.

use std::path::PathBuf;

use chrono::Utc;
use console::style;
use ghinstall::config::{manifest_file_path, ConfigFile, InstalledBinary, InstalledManifest};
use ghinstall::install::{
    InstallOptions, InstallStage, InstalledAsset, Installer, StageCallback, Verification,
};
use ghinstall::reference::{self, RepositoryReference};
use ghinstall::release::GitHubClient;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::CliError;
use crate::progress::DownloadBar;

/// Arguments for an install run.
#[derive(Debug, Clone)]
pub struct InstallArgs {
    pub repository: String,
    pub bin_name: Option<String>,
    pub path: Option<PathBuf>,
    pub sha: Option<String>,
    pub verbose: bool,
}

/// Install the requested release asset.
pub fn run(args: InstallArgs, cancel: CancellationToken) -> Result<(), CliError> {
    let reference = reference::parse(&args.repository)?;
    let config = ConfigFile::load()?;

    let client = GitHubClient::new(config.github_config())?;
    let installer = Installer::new(client, config.installer_config())
        .with_progress(Box::new(DownloadBar::new(!args.verbose)))
        .with_cancellation(cancel);

    let options = InstallOptions {
        bin_name: args.bin_name,
        install_dir: args.path,
        algorithm: args.sha,
    };

    let on_stage: StageCallback = Box::new(|stage: InstallStage, message: &str| {
        if stage != InstallStage::Complete {
            eprintln!("{} {}", style(format!("{}:", stage.name())).cyan().bold(), message);
        }
    });

    let installed = installer.install(&reference, &options, Some(on_stage))?;

    print_summary(&installed);
    if installed.system_package.is_none() {
        record_install(&reference, &installed);
    }
    Ok(())
}

fn print_summary(installed: &InstalledAsset) {
    match &installed.verification {
        Verification::Verified { algorithm, .. } => println!(
            "{} {} {} installed to {} ({} verified)",
            style("✔").green(),
            installed.name,
            installed.tag,
            installed.path.display(),
            algorithm
        ),
        Verification::Unverified { reason } => {
            println!(
                "{} {} {} installed to {}",
                style("⚠").yellow(),
                installed.name,
                installed.tag,
                installed.path.display()
            );
            eprintln!(
                "{}",
                style(format!("Integrity NOT confirmed: {}", reason)).yellow()
            );
        }
        Verification::NoManifest => {
            println!(
                "{} {} {} installed to {}",
                style("⚠").yellow(),
                installed.name,
                installed.tag,
                installed.path.display()
            );
            eprintln!(
                "{}",
                style("No checksum file published, integrity NOT confirmed").yellow()
            );
        }
    }

    if let Some(family) = installed.system_package {
        println!(
            "{} package saved to {}. Install it with your system package manager.",
            family,
            installed.path.display()
        );
    }
}

/// Record the binary in the installed manifest. Failures are only logged.
fn record_install(reference: &RepositoryReference, installed: &InstalledAsset) {
    let Some(path) = manifest_file_path() else {
        debug!("No data directory on this platform, not recording install");
        return;
    };

    let result = InstalledManifest::load(&path).and_then(|mut manifest| {
        manifest.record(InstalledBinary {
            key: reference.slug(),
            name: installed
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| installed.name.clone()),
            version: installed.tag.clone(),
            path: installed.path.clone(),
            installed_at: Utc::now(),
        });
        manifest.save()
    });

    if let Err(e) = result {
        warn!(error = %e, path = %path.display(), "Failed to record install");
    }
}
