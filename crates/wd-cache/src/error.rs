//! Cache error type.

use std::io;
use std::path::PathBuf;

/// Error returned by cache operations.
///
/// A cache miss is not an error, and neither is deleting an absent entry.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The cache directory or an entry could not be created, written or removed.
    #[error("Cache storage error at {}: {source}", .path.display())]
    Storage {
        /// Path the operation failed on.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The source or converted document could not be read.
    #[error("Failed to read document: {0}")]
    Read(#[source] io::Error),
}

impl CacheError {
    pub(crate) fn storage(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Storage { path, source }
    }
}
