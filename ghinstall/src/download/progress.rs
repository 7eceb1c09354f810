//! Progress reporting for asset downloads.

use std::io::{self, Write};

/// Observer notified while asset bytes are written to disk.
pub trait DownloadProgress {
    /// A download of `total_bytes` (as declared by the release) is starting.
    fn start(&self, name: &str, total_bytes: u64);

    /// `bytes` more bytes were written.
    fn advance(&self, bytes: u64);

    /// The download ended, successfully or not.
    fn finish(&self);
}

/// Progress observer that ignores all updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl DownloadProgress for NoProgress {
    fn start(&self, _name: &str, _total_bytes: u64) {}
    fn advance(&self, _bytes: u64) {}
    fn finish(&self) {}
}

/// Writer that forwards to an inner writer and reports each write to a progress observer.
pub(crate) struct ProgressWriter<'a, W> {
    inner: W,
    progress: &'a dyn DownloadProgress,
    written: u64,
}

impl<'a, W: Write> ProgressWriter<'a, W> {
    pub(crate) fn new(inner: W, progress: &'a dyn DownloadProgress) -> Self {
        Self {
            inner,
            progress,
            written: 0,
        }
    }

    /// Total bytes accepted so far.
    pub(crate) fn written(&self) -> u64 {
        self.written
    }

    pub(crate) fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for ProgressWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        self.progress.advance(n as u64);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
