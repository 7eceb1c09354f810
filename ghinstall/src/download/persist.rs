//! Streaming a release asset to a local file.

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::progress::{DownloadProgress, NoProgress, ProgressWriter};
use crate::error::{InstallError, InstallResult};
use crate::release::{AssetStream, ReleaseAsset, ReleaseSource};

/// Buffer size for reading/writing during downloads (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// An asset whose bytes are fully flushed to local storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    /// Asset name as published in the release.
    pub original_name: String,
    /// Where the bytes were written.
    pub local_path: PathBuf,
    /// Number of bytes written.
    pub size_bytes: u64,
}

/// Downloads assets of one repository to caller-chosen paths.
pub struct AssetDownloader<'a, S: ReleaseSource + ?Sized> {
    source: &'a S,
    owner: &'a str,
    repo: &'a str,
    progress: &'a dyn DownloadProgress,
    cancel: CancellationToken,
}

impl<'a, S: ReleaseSource + ?Sized> AssetDownloader<'a, S> {
    /// Create a downloader for `owner/repo` without progress reporting.
    pub fn new(source: &'a S, owner: &'a str, repo: &'a str) -> Self {
        Self {
            source,
            owner,
            repo,
            progress: &NoProgress,
            cancel: CancellationToken::new(),
        }
    }

    /// Report written bytes to `progress`.
    pub fn with_progress(mut self, progress: &'a dyn DownloadProgress) -> Self {
        self.progress = progress;
        self
    }

    /// Abort in-flight downloads when `cancel` is triggered.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Download `asset` and save it at exactly `target`.
    ///
    /// On a failed or cancelled copy the partially written file is removed.
    ///
    /// # Errors
    ///
    /// - [`InstallError::MalformedAsset`] if name, id or size is missing
    /// - [`InstallError::UnexpectedRedirect`] if the source returns no byte stream
    /// - [`InstallError::DownloadIncomplete`] if the copy fails partway
    /// - [`InstallError::Cancelled`] if cancellation was requested
    pub fn download_and_save(
        &self,
        asset: &ReleaseAsset,
        target: &Path,
    ) -> InstallResult<DownloadedFile> {
        let (name, id, size) = match (asset.name.as_deref(), asset.id, asset.size_bytes) {
            (Some(name), Some(id), Some(size)) if !name.is_empty() => (name, id, size),
            _ => {
                return Err(InstallError::MalformedAsset {
                    reason: format!("asset has missing information (name, id, or size): {:?}", asset),
                })
            }
        };

        debug!(
            asset = name,
            id,
            size,
            target = %target.display(),
            "Initiating asset download"
        );

        let reader = match self.source.download_asset(self.owner, self.repo, id)? {
            AssetStream::Bytes(reader) => reader,
            AssetStream::Redirect(location) => {
                warn!(asset = name, location = %location, "Download returned a redirect but no data");
                return Err(InstallError::UnexpectedRedirect {
                    asset: name.to_string(),
                    location,
                });
            }
        };

        let written = self.save(reader, name, size, target)?;
        info!(asset = name, path = %target.display(), bytes = written, "Downloaded asset");

        Ok(DownloadedFile {
            original_name: name.to_string(),
            local_path: target.to_path_buf(),
            size_bytes: written,
        })
    }

    /// Copy `reader` into a new file at `target`.
    fn save(
        &self,
        mut reader: Box<dyn Read + Send>,
        name: &str,
        size: u64,
        target: &Path,
    ) -> InstallResult<u64> {
        let file = File::create(target).map_err(|e| InstallError::WriteFailed {
            path: target.to_path_buf(),
            source: e,
        })?;

        self.progress.start(name, size);
        let mut writer = ProgressWriter::new(BufWriter::new(file), self.progress);
        let copied = self.copy(&mut reader, &mut writer);
        self.progress.finish();

        if let Err(e) = copied {
            drop(writer);
            remove_partial(target);
            if self.cancel.is_cancelled() {
                warn!(asset = name, "Download cancelled");
                return Err(InstallError::Cancelled {
                    asset: name.to_string(),
                });
            }
            error!(asset = name, path = %target.display(), error = %e, "Download failed");
            return Err(InstallError::DownloadIncomplete {
                asset: name.to_string(),
                path: target.to_path_buf(),
                source: e,
            });
        }

        let written = writer.written();
        match writer.into_inner().into_inner() {
            Ok(file) => {
                // The bytes are flushed; a failed sync is not fatal.
                if let Err(e) = file.sync_all() {
                    warn!(path = %target.display(), error = %e, "Failed to sync file after download");
                }
            }
            Err(e) => {
                remove_partial(target);
                return Err(InstallError::DownloadIncomplete {
                    asset: name.to_string(),
                    path: target.to_path_buf(),
                    source: e.into_error(),
                });
            }
        }

        Ok(written)
    }

    fn copy<R: Read + ?Sized, W: Write>(&self, reader: &mut R, writer: &mut W) -> io::Result<()> {
        let mut buffer = vec![0u8; BUFFER_SIZE];
        loop {
            if self.cancel.is_cancelled() {
                return Err(io::Error::new(io::ErrorKind::Interrupted, "download cancelled"));
            }

            let n = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            writer.write_all(&buffer[..n])?;
        }
        writer.flush()
    }
}

fn remove_partial(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Removed partial download"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove partial download"),
    }
}
