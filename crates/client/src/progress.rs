//! Upload progress reporting.
//!
//! The uploader wraps the archive in a [`ProgressReader`] which calls the
//! reporter with cumulative bytes after every chunk handed to the HTTP client.

use std::io::{self, Read};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};

/// Receives `(bytes sent so far, total bytes)` during an upload.
pub trait ProgressReporter: Send + Sync {
    fn on_progress(&self, sent: u64, total: u64);

    /// Called once the upload request has completed (successfully or not).
    fn finish(&self) {}
}

impl<F> ProgressReporter for F
where
    F: Fn(u64, u64) + Send + Sync,
{
    fn on_progress(&self, sent: u64, total: u64) {
        self(sent, total)
    }
}

/// Reports nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl ProgressReporter for Silent {
    fn on_progress(&self, _sent: u64, _total: u64) {}
}

/// Terminal progress bar on stderr.
pub struct ProgressBarReporter {
    bar: ProgressBar,
}

impl ProgressBarReporter {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template("[{bar:54}] {percent:>3}% {bytes}/{total_bytes}")
            .map(|s| s.progress_chars("=> "))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        Self { bar }
    }
}

impl Default for ProgressBarReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for ProgressBarReporter {
    fn on_progress(&self, sent: u64, total: u64) {
        if self.bar.length() != Some(total) {
            self.bar.set_length(total);
        }
        self.bar.set_position(sent);
    }

    fn finish(&self) {
        self.bar.finish();
    }
}

/// `Read` adapter that reports cumulative progress.
pub(crate) struct ProgressReader<R> {
    inner: R,
    sent: u64,
    total: u64,
    reporter: Arc<dyn ProgressReporter>,
}

impl<R: Read> ProgressReader<R> {
    pub(crate) fn new(inner: R, total: u64, reporter: Arc<dyn ProgressReporter>) -> Self {
        Self { inner, sent: 0, total, reporter }
    }
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.sent += n as u64;
            self.reporter.on_progress(self.sent, self.total);
        }
        Ok(n)
    }
}
