//! File-based content-addressed cache.
//!
//! Directory layout:
//! ```text
//! {root}/
//! +-- 3f786850e387550fdab836ed7e6dc881de23001b.pdf   # cache entry
//! +-- 89e6c98d92887913cadf06b2adb97f26cde4849b.doc
//! +-- .staging/                                      # in-progress writes
//! ```

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use wd_document::{Document, Format};

use crate::CacheError;
use crate::flight::KeyLocks;
use crate::key::key_for;

/// Subdirectory of the cache root holding entries still being written.
pub const STAGING_DIR: &str = ".staging";

/// Cache construction parameters.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory entries are stored in.
    pub root: PathBuf,
    /// Namespace value mixed into every key. Not used for authentication.
    pub secret: String,
}

impl CacheConfig {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, secret: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            secret: secret.into(),
        }
    }
}

/// Produces a converted document from a source document.
///
/// Implemented for any `Fn(&mut Document, Format) -> Result<Document, E>`.
pub trait Converter {
    type Error: From<CacheError>;

    /// Convert `source` to `format`.
    fn convert(&self, source: &mut Document, format: Format) -> Result<Document, Self::Error>;
}

impl<F, E> Converter for F
where
    F: Fn(&mut Document, Format) -> Result<Document, E>,
    E: From<CacheError>,
{
    type Error = E;

    fn convert(&self, source: &mut Document, format: Format) -> Result<Document, E> {
        self(source, format)
    }
}

/// Content-addressed store of converted documents.
#[derive(Debug)]
pub struct CacheManager {
    root: PathBuf,
    staging: PathBuf,
    secret: String,
    locks: KeyLocks,
}

impl CacheManager {
    /// Create a cache over `config.root`, creating the directory if needed.
    pub fn new(config: CacheConfig) -> Result<Self, CacheError> {
        let staging = config.root.join(STAGING_DIR);
        let cache = Self {
            root: config.root,
            staging,
            secret: config.secret,
            locks: KeyLocks::default(),
        };
        cache.ensure_storage()?;
        Ok(cache)
    }

    /// Create the cache directories if absent. Idempotent.
    pub fn ensure_storage(&self) -> Result<(), CacheError> {
        fs::create_dir_all(&self.staging).map_err(CacheError::storage(&self.staging))
    }

    /// Cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Key of `document` converted to `format`.
    pub fn key(&self, document: &mut Document, format: Format) -> Result<String, CacheError> {
        let data = document.read_all().map_err(CacheError::Read)?;
        Ok(key_for(&data, format, &self.secret))
    }

    /// Path of the entry with `key` in `format`.
    #[must_use]
    pub fn entry_path(&self, key: &str, format: Format) -> PathBuf {
        self.root.join(format!("{key}.{}", format.extension()))
    }

    /// Look up the cached conversion of `document` to `format`.
    ///
    /// Returns `Ok(None)` on a miss. A hit is opened read-only and is never
    /// deleted when closed.
    pub fn get(
        &self,
        document: &mut Document,
        format: Format,
    ) -> Result<Option<Document>, CacheError> {
        let key = self.key(document, format)?;
        let entry = open_entry(&self.entry_path(&key, format), format)?;
        tracing::debug!(key, %format, hit = entry.is_some(), "cache lookup");
        Ok(entry)
    }

    /// Store `converted` as the conversion of `document` to `format`.
    ///
    /// Replaces an existing entry with the same key. Returns the entry path.
    pub fn set(
        &self,
        document: &mut Document,
        format: Format,
        converted: &mut Document,
    ) -> Result<PathBuf, CacheError> {
        let key = self.key(document, format)?;
        let data = converted.read_all().map_err(CacheError::Read)?;
        let path = self.entry_path(&key, format);
        self.write_entry(&path, &data)?;
        tracing::debug!(key, %format, bytes = data.len(), "cache entry stored");
        Ok(path)
    }

    /// Remove the cached conversion of `document` to `format`.
    ///
    /// Returns `false` if there was no entry.
    pub fn delete(&self, document: &mut Document, format: Format) -> Result<bool, CacheError> {
        let key = self.key(document, format)?;
        let path = self.entry_path(&key, format);
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(key, %format, "cache entry deleted");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::storage(path)(e)),
        }
    }

    /// Remove every regular file directly under the cache root.
    ///
    /// Subdirectories and their contents are left untouched. Returns the
    /// number of files removed.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(CacheError::storage(&self.root)(e)),
        };

        let mut removed = 0;
        for entry in entries {
            let entry = entry.map_err(CacheError::storage(&self.root))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(CacheError::storage(&path))?;
            if !file_type.is_file() {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(CacheError::storage(path)(e)),
            }
        }

        tracing::info!(removed, root = %self.root.display(), "cache cleared");
        Ok(removed)
    }

    /// Return the cached conversion of `document`, converting on a miss.
    ///
    /// At most one conversion per key runs at a time: concurrent callers for
    /// the same key block until the running conversion has been stored, then
    /// receive the stored entry. If a conversion fails, its caller gets the
    /// error and the next waiter attempts the conversion itself.
    pub fn get_or_convert<C: Converter>(
        &self,
        document: &mut Document,
        format: Format,
        converter: &C,
    ) -> Result<Document, C::Error> {
        let key = self.key(document, format)?;
        let path = self.entry_path(&key, format);

        if let Some(hit) = open_entry(&path, format)? {
            tracing::debug!(key, %format, "cache hit");
            return Ok(hit);
        }

        let _guard = self.locks.lock(&key);
        if let Some(hit) = open_entry(&path, format)? {
            tracing::debug!(key, %format, "cache filled by concurrent conversion");
            return Ok(hit);
        }

        tracing::debug!(key, %format, "cache miss, converting");
        let mut converted = converter.convert(document, format)?;
        let data = converted.read_all().map_err(CacheError::Read)?;
        self.write_entry(&path, &data)?;

        // A concurrent `clear` may remove the entry before it is reopened.
        Ok(open_entry(&path, format)?.unwrap_or(converted))
    }

    /// Write `data` to `path` atomically through the staging directory.
    fn write_entry(&self, path: &Path, data: &[u8]) -> Result<(), CacheError> {
        self.ensure_storage()?;
        let mut staged =
            NamedTempFile::new_in(&self.staging).map_err(CacheError::storage(&self.staging))?;
        staged
            .write_all(data)
            .map_err(CacheError::storage(staged.path().to_path_buf()))?;
        staged
            .persist(path)
            .map_err(|e| CacheError::storage(path)(e.error))?;
        Ok(())
    }
}

/// Open the entry at `path` if it is a regular file.
fn open_entry(path: &Path, format: Format) -> Result<Option<Document>, CacheError> {
    if !path.is_file() {
        return Ok(None);
    }
    match Document::open(path, format) {
        Ok(document) => Ok(Some(document.with_delete_on_close(false))),
        // Removed between the check and the open.
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CacheError::storage(path)(e)),
    }
}
