//! Access to the members of an ODF package.
//!
//! A package is either packed (a ZIP archive on disk) or unpacked (a
//! directory tree with the archive's layout). Both expose the same
//! [`Package`] capability set.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;
use wd_document::Document;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::TemplateError;

const CONTENT_XML: &str = "content.xml";
const META_XML: &str = "meta.xml";
const STYLES_XML: &str = "styles.xml";

/// Uniform read and unpack access to an ODF package.
pub trait Package: Send + Sync {
    /// Read the raw content of member `path`.
    ///
    /// Returns [`TemplateError::MissingMember`] if the member does not exist.
    fn get_file(&self, path: &str) -> Result<Vec<u8>, TemplateError>;

    /// Materialize the whole package as a directory tree at `dest`.
    fn unpack(&self, dest: &Path) -> Result<(), TemplateError>;

    /// Read `content.xml`.
    fn get_content_xml(&self) -> Result<Vec<u8>, TemplateError> {
        self.get_file(CONTENT_XML)
    }

    /// Read `meta.xml`.
    fn get_meta_xml(&self) -> Result<Vec<u8>, TemplateError> {
        self.get_file(META_XML)
    }

    /// Read `styles.xml`.
    fn get_styles_xml(&self) -> Result<Vec<u8>, TemplateError> {
        self.get_file(STYLES_XML)
    }
}

/// Package stored as a ZIP archive.
///
/// Members are read on demand; nothing is extracted until [`Package::unpack`].
#[derive(Debug, Clone)]
pub struct PackedPackage {
    path: PathBuf,
}

impl PackedPackage {
    /// Create a packed package over the archive at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Open the archive backing a rendered document.
    #[must_use]
    pub fn from_document(document: &Document) -> Self {
        Self::new(document.path())
    }

    /// Path of the archive.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names of all archive members, in archive order.
    pub fn member_names(&self) -> Result<Vec<String>, TemplateError> {
        let archive = self.open()?;
        Ok(archive.file_names().map(str::to_owned).collect())
    }

    fn open(&self) -> Result<ZipArchive<File>, TemplateError> {
        let file = File::open(&self.path)?;
        Ok(ZipArchive::new(file)?)
    }
}

impl Package for PackedPackage {
    fn get_file(&self, path: &str) -> Result<Vec<u8>, TemplateError> {
        check_member_path(path)?;
        let mut archive = self.open()?;
        let mut member = match archive.by_name(path) {
            Ok(member) => member,
            Err(ZipError::FileNotFound) => {
                return Err(TemplateError::MissingMember(path.to_owned()));
            }
            Err(e) => return Err(e.into()),
        };
        let mut data = Vec::new();
        member.read_to_end(&mut data)?;
        Ok(data)
    }

    fn unpack(&self, dest: &Path) -> Result<(), TemplateError> {
        fs::create_dir_all(dest)?;
        self.open()?.extract(dest)?;
        Ok(())
    }
}

/// Package stored as a plain directory tree.
#[derive(Debug, Clone)]
pub struct UnpackedPackage {
    dir: PathBuf,
}

impl UnpackedPackage {
    /// Create an unpacked package rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory of the package.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Package for UnpackedPackage {
    fn get_file(&self, path: &str) -> Result<Vec<u8>, TemplateError> {
        check_member_path(path)?;
        match fs::read(self.dir.join(path)) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(TemplateError::MissingMember(path.to_owned()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Copy the directory tree to `dest`, which must not exist yet.
    fn unpack(&self, dest: &Path) -> Result<(), TemplateError> {
        copy_tree(&self.dir, dest)?;
        Ok(())
    }
}

/// Recursively copy `src` into the new directory `dest`.
///
/// Fails with [`io::ErrorKind::AlreadyExists`] if `dest` exists.
fn copy_tree(src: &Path, dest: &Path) -> io::Result<()> {
    fs::create_dir(dest)?;

    for entry in WalkDir::new(src).min_depth(1).follow_links(true) {
        let entry = entry?;
        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir(&target)?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Reject member paths that could escape the package root.
fn check_member_path(path: &str) -> Result<(), TemplateError> {
    let escapes = Path::new(path)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if path.is_empty() || escapes {
        return Err(TemplateError::MissingMember(path.to_owned()));
    }
    Ok(())
}
