//! Terminal progress bar for asset downloads.

use std::sync::Mutex;

use ghinstall::download::DownloadProgress;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const BAR_TEMPLATE: &str =
    "{spinner:.green} {msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";

/// Download progress rendered with indicatif on stderr.
pub struct DownloadBar {
    bar: Mutex<Option<ProgressBar>>,
    enabled: bool,
}

impl DownloadBar {
    /// Create a progress reporter. A disabled one draws nothing.
    pub fn new(enabled: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            enabled,
        }
    }

    fn create_bar(name: &str, total: u64) -> ProgressBar {
        let pb = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stderr());
        pb.set_style(
            ProgressStyle::default_bar()
                .template(BAR_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        pb.set_message(name.to_string());
        pb
    }
}

impl DownloadProgress for DownloadBar {
    fn start(&self, name: &str, total_bytes: u64) {
        if !self.enabled {
            return;
        }
        if let Ok(mut guard) = self.bar.lock() {
            *guard = Some(Self::create_bar(name, total_bytes));
        }
    }

    fn advance(&self, bytes: u64) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(ref pb) = *guard {
                pb.inc(bytes);
            }
        }
    }

    fn finish(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }
}
