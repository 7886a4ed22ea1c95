//! File-backed document with a single, scope-bound close sequence.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::Format;

/// A rendered artifact backed by one open file.
///
/// The handle is opened at most once per instance and closed exactly once:
/// either explicitly through [`Document::close`], which reports errors, or on
/// drop, which logs them. When `delete_on_close` is set, the backing file is
/// unlinked after the handle has been closed, never before.
///
/// `Document` implements [`Read`] and [`Seek`], so it can be handed to
/// anything that consumes a byte stream.
#[derive(Debug)]
pub struct Document {
    /// `None` once the close sequence has run.
    file: Option<File>,
    path: PathBuf,
    format: Format,
    delete_on_close: bool,
}

impl Document {
    /// Open `path` for binary reading.
    pub fn open(path: impl Into<PathBuf>, format: Format) -> io::Result<Self> {
        let mut options = OpenOptions::new();
        options.read(true);
        Self::open_with(path, format, &options)
    }

    /// Open `path` with caller-specified options.
    pub fn open_with(
        path: impl Into<PathBuf>,
        format: Format,
        options: &OpenOptions,
    ) -> io::Result<Self> {
        let path = path.into();
        let file = options.open(&path)?;
        Ok(Self::from_file(file, path, format))
    }

    /// Wrap an already-open handle.
    ///
    /// `path` is the name the handle was opened under; it is used to unlink the
    /// file when `delete_on_close` is set.
    #[must_use]
    pub fn from_file(file: File, path: impl Into<PathBuf>, format: Format) -> Self {
        Self {
            file: Some(file),
            path: path.into(),
            format,
            delete_on_close: false,
        }
    }

    /// Set whether the backing file is removed once the document is closed.
    #[must_use]
    pub fn with_delete_on_close(mut self, delete_on_close: bool) -> Self {
        self.delete_on_close = delete_on_close;
        self
    }

    /// Document format.
    #[must_use]
    pub fn format(&self) -> Format {
        self.format
    }

    /// MIME type of the document.
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }

    /// Last-known path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the backing file is removed on close.
    #[must_use]
    pub fn delete_on_close(&self) -> bool {
        self.delete_on_close
    }

    /// Read the full content, leaving the cursor at the start.
    pub fn read_all(&mut self) -> io::Result<Vec<u8>> {
        self.rewind()?;
        let mut data = Vec::new();
        self.read_to_end(&mut data)?;
        self.rewind()?;
        Ok(data)
    }

    /// Read the full content as UTF-8 text.
    pub fn read_text(&mut self) -> io::Result<String> {
        let data = self.read_all()?;
        String::from_utf8(data).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Close the document, surfacing any error from the close sequence.
    pub fn close(mut self) -> io::Result<()> {
        self.finish()
    }

    fn handle(&mut self) -> io::Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::other("document already closed"))
    }

    /// Run the close sequence if it has not run yet.
    fn finish(&mut self) -> io::Result<()> {
        let Some(file) = self.file.take() else {
            return Ok(());
        };
        drop(file);

        if self.delete_on_close {
            remove_backing_file(&self.path)?;
        }
        Ok(())
    }
}

/// Unlink `path`, tolerating a file that is already gone.
fn remove_backing_file(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "backing file already removed");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

impl Read for Document {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.handle()?.read(buf)
    }
}

impl Seek for Document {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.handle()?.seek(pos)
    }
}

impl Drop for Document {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            tracing::warn!(path = %self.path.display(), "failed to close document: {e}");
        }
    }
}
